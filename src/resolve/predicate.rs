use std::collections::{BTreeMap, BTreeSet};

use smallvec::SmallVec;

use crate::config::FilterMode;
use crate::error::{Error, Result};
use crate::resolve::{attr_key, fold, ValueResolver};
use crate::table::{number_key, Table, Value};

/// A value a criterion accepts: a raw code, or a description string.
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionValue {
    Number(f64),
    Text(String),
}

impl From<f64> for CriterionValue { fn from(n: f64) -> Self { CriterionValue::Number(n) } }
impl From<i64> for CriterionValue { fn from(n: i64) -> Self { CriterionValue::Number(n as f64) } }
impl From<i32> for CriterionValue { fn from(n: i32) -> Self { CriterionValue::Number(n.into()) } }
impl From<&str> for CriterionValue { fn from(s: &str) -> Self { CriterionValue::Text(s.to_string()) } }
impl From<String> for CriterionValue { fn from(s: String) -> Self { CriterionValue::Text(s) } }

impl std::fmt::Display for CriterionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriterionValue::Number(n) => write!(f, "{n}"),
            CriterionValue::Text(s) => f.write_str(s),
        }
    }
}

/// `attribute` equals any of `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub attribute: String,
    pub values: SmallVec<[CriterionValue; 2]>,
}

impl Criterion {
    pub fn new(attribute: impl Into<String>, value: impl Into<CriterionValue>) -> Self {
        Self { attribute: attribute.into(), values: smallvec::smallvec![value.into()] }
    }

    pub fn any_of<V: Into<CriterionValue>>(attribute: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self { attribute: attribute.into(), values: values.into_iter().map(Into::into).collect() }
    }
}

/// Resolved comparison targets of one criterion.
#[derive(Default)]
struct Targets {
    numbers: Vec<f64>,
    texts: Vec<String>, // folded
}

impl Targets {
    fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Number(n) => self.numbers.contains(n),
            Value::Text(s) => {
                let s = fold(s);
                self.texts.iter().any(|t| *t == s)
            }
            Value::Null | Value::Coords(_) => false,
        }
    }
}

impl ValueResolver {
    /// Select the rows of `table` among `candidates` that satisfy `criteria`.
    ///
    /// Each criterion matches rows whose attribute equals any of its values.
    /// Criterion values that are description strings are translated to codes
    /// through the description tables first. The per-criterion sets are
    /// combined according to `mode`. An empty criteria list keeps every
    /// candidate.
    pub fn match_predicate(
        &self,
        table: &Table,
        candidates: &[i64],
        criteria: &[Criterion],
        mode: FilterMode,
    ) -> Result<BTreeSet<i64>> {
        if criteria.is_empty() {
            return Ok(candidates.iter().copied().collect());
        }

        let mut result: Option<BTreeSet<i64>> = None;
        for criterion in criteria {
            let matched = self.match_criterion(table, candidates, criterion)?;
            result = Some(match (result, mode) {
                (None, _) => matched,
                (Some(acc), FilterMode::Union) => &acc | &matched,
                (Some(acc), FilterMode::Intersection) => &acc & &matched,
            });
        }
        Ok(result.unwrap_or_default())
    }

    fn match_criterion(&self, table: &Table, candidates: &[i64], criterion: &Criterion) -> Result<BTreeSet<i64>> {
        let column = table.column(&criterion.attribute).ok_or_else(|| Error::UnknownAttribute {
            table: table.name().to_string(),
            attribute: criterion.attribute.clone(),
            valid: table.column_names(),
        })?;
        let attribute = table.columns()[column].name.as_str();

        let mut targets = Targets::default();
        for value in &criterion.values {
            self.resolve_target(table.name(), attribute, value, &mut targets)?;
        }

        Ok(candidates.iter()
            .copied()
            .filter(|&id| table.row(id).is_some_and(|row| targets.matches(row.at(column))))
            .collect())
    }

    /// Translate one criterion value into the codes it stands for.
    fn resolve_target(&self, table: &str, attribute: &str, value: &CriterionValue, targets: &mut Targets) -> Result<()> {
        let key = attr_key(table, attribute);
        let unknown = |valid: Vec<String>| Error::UnknownValue {
            table: table.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            valid,
        };

        match value {
            CriterionValue::Number(n) => {
                if let Some(codes) = self.numeric.get(&key) {
                    if number_key(*n).is_none_or(|code| !codes.contains_key(&code)) {
                        return Err(unknown(Self::numeric_choices(codes)));
                    }
                    targets.numbers.push(*n);
                } else if let Some(codes) = self.text.get(&key) {
                    // Text codes may be digits; compare the number as a code.
                    let hits = text_hits(codes, &fold(&n.to_string()));
                    if hits.is_empty() {
                        return Err(unknown(Self::text_choices(codes)));
                    }
                    targets.texts.extend(hits);
                } else {
                    targets.numbers.push(*n);
                }
            }
            CriterionValue::Text(s) => {
                let wanted = fold(s);
                if let Some(codes) = self.numeric.get(&key) {
                    let hits: Vec<f64> = codes.iter()
                        .filter(|(code, desc)| fold(desc) == wanted || code.to_string() == wanted)
                        .map(|(code, _)| *code as f64)
                        .collect();
                    if hits.is_empty() {
                        return Err(unknown(Self::numeric_choices(codes)));
                    }
                    targets.numbers.extend(hits);
                } else if let Some(codes) = self.text.get(&key) {
                    let hits = text_hits(codes, &wanted);
                    if hits.is_empty() {
                        return Err(unknown(Self::text_choices(codes)));
                    }
                    targets.texts.extend(hits);
                } else {
                    // Uncoded attribute: compare the raw value.
                    if let Ok(n) = wanted.parse::<f64>() {
                        targets.numbers.push(n);
                    }
                    targets.texts.push(wanted);
                }
            }
        }
        Ok(())
    }
}

/// Folded text codes whose code or description equals `wanted`.
fn text_hits(codes: &BTreeMap<String, (String, String)>, wanted: &str) -> Vec<String> {
    codes.iter()
        .filter(|(folded, (_, desc))| folded.as_str() == wanted || fold(desc) == wanted)
        .map(|(folded, _)| folded.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::resolver;

    fn roads() -> Table {
        Table::from_rows("roadl.lft", &["id", "f_code", "med", "nam"], [
            vec![Value::from(1), "AP030".into(), 1.into(), "Main St".into()],
            vec![Value::from(2), "AP030".into(), 2.into(), "High St".into()],
            vec![Value::from(3), "AQ040".into(), 1.into(), "Bridge Rd".into()],
            vec![Value::from(4), "ap030".into(), 2.into(), Value::Null],
        ]).unwrap()
    }

    fn all(table: &Table) -> Vec<i64> { table.rows().map(|r| r.id()).collect() }

    fn set(ids: &[i64]) -> BTreeSet<i64> { ids.iter().copied().collect() }

    #[test]
    fn raw_codes_and_descriptions_select_the_same_rows() {
        let (r, t) = (resolver(), roads());
        let by_code = r.match_predicate(&t, &all(&t), &[Criterion::new("med", 2)], FilterMode::Union).unwrap();
        let by_desc = r.match_predicate(&t, &all(&t), &[Criterion::new("MED", "with median")], FilterMode::Union).unwrap();
        assert_eq!(by_code, set(&[2, 4]));
        assert_eq!(by_code, by_desc);
    }

    #[test]
    fn text_codes_match_case_insensitively_by_code_or_description() {
        let (r, t) = (resolver(), roads());
        let by_code = r.match_predicate(&t, &all(&t), &[Criterion::new("f_code", "AP030")], FilterMode::Union).unwrap();
        let by_desc = r.match_predicate(&t, &all(&t), &[Criterion::new("f_code", "ROAD")], FilterMode::Union).unwrap();
        assert_eq!(by_code, set(&[1, 2, 4]));
        assert_eq!(by_code, by_desc);
    }

    #[test]
    fn value_list_is_the_union_of_single_values() {
        let (r, t) = (resolver(), roads());
        let ids = all(&t);
        let one = r.match_predicate(&t, &ids, &[Criterion::new("nam", "main st")], FilterMode::Union).unwrap();
        let two = r.match_predicate(&t, &ids, &[Criterion::new("nam", "Bridge Rd")], FilterMode::Union).unwrap();
        let both = r.match_predicate(&t, &ids, &[Criterion::any_of("nam", ["Main St", "Bridge Rd"])], FilterMode::Union).unwrap();
        assert_eq!(both, &one | &two);
        assert_eq!(both, set(&[1, 3]));
    }

    #[test]
    fn repeating_a_criterion_is_idempotent() {
        let (r, t) = (resolver(), roads());
        let c = Criterion::any_of("med", [1, 2]);
        for mode in [FilterMode::Union, FilterMode::Intersection] {
            let once = r.match_predicate(&t, &all(&t), std::slice::from_ref(&c), mode).unwrap();
            let twice = r.match_predicate(&t, &all(&t), &[c.clone(), c.clone()], mode).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn criteria_combine_by_union_or_intersection() {
        let (r, t) = (resolver(), roads());
        let criteria = [Criterion::new("f_code", "AP030"), Criterion::new("med", 1)];
        let union = r.match_predicate(&t, &all(&t), &criteria, FilterMode::Union).unwrap();
        let strict = r.match_predicate(&t, &all(&t), &criteria, FilterMode::Intersection).unwrap();
        assert_eq!(union, set(&[1, 2, 3, 4]));
        assert_eq!(strict, set(&[1]));
    }

    #[test]
    fn empty_criteria_keep_all_candidates() {
        let (r, t) = (resolver(), roads());
        let kept = r.match_predicate(&t, &[2, 3], &[], FilterMode::Union).unwrap();
        assert_eq!(kept, set(&[2, 3]));
    }

    #[test]
    fn only_candidates_are_considered() {
        let (r, t) = (resolver(), roads());
        let kept = r.match_predicate(&t, &[1, 3], &[Criterion::new("med", 2)], FilterMode::Union).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn unknown_attribute_lists_table_columns() {
        let (r, t) = (resolver(), roads());
        let err = r.match_predicate(&t, &all(&t), &[Criterion::new("surface", 1)], FilterMode::Union).unwrap_err();
        match err {
            Error::UnknownAttribute { attribute, valid, .. } => {
                assert_eq!(attribute, "surface");
                assert_eq!(valid, vec!["id", "f_code", "med", "nam"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_value_lists_described_codes() {
        let (r, t) = (resolver(), roads());
        for value in [CriterionValue::from(7), CriterionValue::from("Divided")] {
            let err = r.match_predicate(&t, &all(&t), &[Criterion::new("med", value)], FilterMode::Union).unwrap_err();
            match err {
                Error::UnknownValue { valid, .. } => {
                    assert_eq!(valid, vec!["1 (Without Median)", "2 (With Median)"]);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        let err = r.match_predicate(&t, &all(&t), &[Criterion::new("f_code", "Railway")], FilterMode::Union).unwrap_err();
        assert!(matches!(err, Error::UnknownValue { .. }));
    }

    #[test]
    fn numbers_on_text_coded_attributes_resolve_through_the_text_codes() {
        let mut r = ValueResolver::new();
        r.insert_text("t.lft", "cat", "1", "One").insert_text("t.lft", "cat", "2", "Two");
        let t = Table::from_rows("t.lft", &["id", "cat"], [
            vec![Value::from(1), "1".into()],
            vec![Value::from(2), "2".into()],
        ]).unwrap();

        let kept = r.match_predicate(&t, &all(&t), &[Criterion::new("cat", 1)], FilterMode::Union).unwrap();
        assert_eq!(kept, set(&[1]));

        let err = r.match_predicate(&t, &all(&t), &[Criterion::new("cat", 7)], FilterMode::Union).unwrap_err();
        match err {
            Error::UnknownValue { value, valid, .. } => {
                assert_eq!(value, "7");
                assert_eq!(valid.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
