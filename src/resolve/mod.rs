//! Value description tables.
//!
//! Stored attribute values are compact codes. Each theme carries two
//! indirection tables that map `(table, attribute, code)` to a readable
//! description: `int.vdt` for numeric codes and `char.vdt` for text codes.

mod predicate;

use std::collections::BTreeMap;

use ahash::AHashMap;
use tracing::debug;

use crate::table::{number_key, Table, Value};

pub use predicate::{Criterion, CriterionValue};

/// (table, attribute), both lowercase.
type AttrKey = (String, String);

#[inline]
fn attr_key(table: &str, attribute: &str) -> AttrKey {
    (table.trim().to_lowercase(), attribute.trim().to_lowercase())
}

/// Case-folded form used for all text comparisons.
#[inline]
pub(crate) fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Resolves coded attribute values of one theme to descriptions.
#[derive(Debug, Clone, Default)]
pub struct ValueResolver {
    numeric: AHashMap<AttrKey, BTreeMap<i64, String>>,
    // folded code -> (code as stored, description)
    text: AHashMap<AttrKey, BTreeMap<String, (String, String)>>,
}

impl ValueResolver {
    /// File name of the numeric value description table.
    pub const NUMERIC_TABLE: &'static str = "int.vdt";
    /// File name of the text value description table.
    pub const TEXT_TABLE: &'static str = "char.vdt";

    pub fn new() -> Self { Self::default() }

    /// Build from the theme's description tables. Both use the columns
    /// `table`, `attribute`, `value` and `description`; rows missing any of
    /// them are ignored.
    pub fn from_tables(numeric: Option<&Table>, text: Option<&Table>) -> Self {
        let mut resolver = Self::new();

        for row in numeric.into_iter().flat_map(Table::rows) {
            match (row.text("table"), row.text("attribute"), row.key("value")) {
                (Some(table), Some(attribute), Some(code)) => {
                    resolver.insert_numeric(table, attribute, code, row.text("description").unwrap_or_default());
                }
                _ => debug!("skipping incomplete {} record {}", Self::NUMERIC_TABLE, row.id()),
            }
        }

        for row in text.into_iter().flat_map(Table::rows) {
            let code = match row.get("value") {
                Some(Value::Text(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            match (row.text("table"), row.text("attribute"), code) {
                (Some(table), Some(attribute), Some(code)) => {
                    resolver.insert_text(table, attribute, &code, row.text("description").unwrap_or_default());
                }
                _ => debug!("skipping incomplete {} record {}", Self::TEXT_TABLE, row.id()),
            }
        }

        resolver
    }

    pub fn insert_numeric(&mut self, table: &str, attribute: &str, code: i64, description: &str) -> &mut Self {
        self.numeric.entry(attr_key(table, attribute))
            .or_default()
            .insert(code, description.trim().to_string());
        self
    }

    pub fn insert_text(&mut self, table: &str, attribute: &str, code: &str, description: &str) -> &mut Self {
        self.text.entry(attr_key(table, attribute))
            .or_default()
            .insert(fold(code), (code.trim().to_string(), description.trim().to_string()));
        self
    }

    #[inline] pub fn is_empty(&self) -> bool { self.numeric.is_empty() && self.text.is_empty() }

    /// True if `attribute` of `table` has numeric code descriptions.
    #[inline]
    pub fn is_numeric_coded(&self, table: &str, attribute: &str) -> bool {
        self.numeric.contains_key(&attr_key(table, attribute))
    }

    /// True if `attribute` of `table` has text code descriptions.
    #[inline]
    pub fn is_text_coded(&self, table: &str, attribute: &str) -> bool {
        self.text.contains_key(&attr_key(table, attribute))
    }

    pub fn numeric_description(&self, table: &str, attribute: &str, code: i64) -> Option<&str> {
        self.numeric.get(&attr_key(table, attribute))?.get(&code).map(String::as_str)
    }

    pub fn text_description(&self, table: &str, attribute: &str, code: &str) -> Option<&str> {
        self.text.get(&attr_key(table, attribute))?.get(&fold(code)).map(|(_, d)| d.as_str())
    }

    /// Describe `value` of `attribute` in `table`.
    ///
    /// Numbers need an exact code match and otherwise read
    /// `"<attribute>: Unknown"`; text is looked up case-insensitively and
    /// otherwise returned as is.
    pub fn describe(&self, table: &str, attribute: &str, value: &Value) -> String {
        self.describe_as(table, attribute, attribute, value)
    }

    /// Like [`describe`](Self::describe), but names an unknown numeric value
    /// after the column description of `table`.
    pub fn describe_field(&self, table: &Table, attribute: &str, value: &Value) -> String {
        self.describe_as(table.name(), attribute, &table.label(attribute), value)
    }

    fn describe_as(&self, table: &str, attribute: &str, label: &str, value: &Value) -> String {
        match value {
            Value::Number(n) => number_key(*n)
                .and_then(|code| self.numeric_description(table, attribute, code))
                .map(str::to_string)
                .unwrap_or_else(|| format!("{label}: Unknown")),
            Value::Text(s) => self.text_description(table, attribute, s)
                .map(str::to_string)
                .unwrap_or_else(|| s.trim().to_string()),
            Value::Null => format!("{label}: Unknown"),
            Value::Coords(_) => label.to_string(),
        }
    }

    /// `"code (description)"` for every code of a numeric attribute.
    fn numeric_choices(codes: &BTreeMap<i64, String>) -> Vec<String> {
        codes.iter().map(|(code, desc)| format!("{code} ({desc})")).collect()
    }

    /// `"code (description)"` for every code of a text attribute.
    fn text_choices(codes: &BTreeMap<String, (String, String)>) -> Vec<String> {
        codes.values().map(|(code, desc)| format!("{code} ({desc})")).collect()
    }
}
