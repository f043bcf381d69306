//! Feature row attributes: tags, signatures and text symbols.

use ahash::AHashMap;
use geo::Coord;

use crate::feature::{is_link_column, RenderHints, Signature, SignatureValue};
use crate::resolve::ValueResolver;
use crate::table::{Row, Table, Value};

/// Symbol attribute table of a theme with text features.
pub const SYMBOL_TABLE: &str = "symbol.rat";

/// The descriptive attributes of `row`, in column order.
pub(super) fn signature(row: &Row<'_>) -> Signature {
    Signature(
        row.fields()
            .filter(|(column, _)| !is_link_column(&column.name))
            .filter_map(|(_, value)| SignatureValue::from_value(value))
            .collect(),
    )
}

/// Human-readable tag of `row`: descriptions of coded numeric fields, then
/// text fields, then uncoded numeric fields as `"<label>: <value>"`.
pub(super) fn tag(resolver: &ValueResolver, table: &Table, row: &Row<'_>, separator: &str) -> String {
    let mut coded = Vec::new();
    let mut texts = Vec::new();
    let mut raw = Vec::new();

    for (column, value) in row.fields() {
        if is_link_column(&column.name) {
            continue;
        }
        match value {
            Value::Number(_) if resolver.is_numeric_coded(table.name(), &column.name) => {
                coded.push(resolver.describe_field(table, &column.name, value));
            }
            Value::Number(n) => raw.push(format!("{}: {n}", table.label(&column.name))),
            Value::Text(s) if !s.trim().is_empty() => {
                texts.push(resolver.describe_field(table, &column.name, value));
            }
            _ => {}
        }
    }

    coded.into_iter().chain(texts).chain(raw).collect::<Vec<_>>().join(separator)
}

/// `symbol_id -> (size, color)` from a theme's `symbol.rat`.
pub(super) fn symbols(table: &Table) -> AHashMap<i64, (Option<f64>, Option<i64>)> {
    table.rows()
        .map(|row| (row.key("symbol_id").unwrap_or(row.id()), (row.number("size"), row.key("col"))))
        .collect()
}

/// Render hints of a text feature with symbol `symbol` and `anchors`.
pub(super) fn render_hints(
    symbols: &AHashMap<i64, (Option<f64>, Option<i64>)>,
    symbol: Option<i64>,
    anchors: &[Coord<f64>],
) -> RenderHints {
    let (size, color) = symbol.and_then(|s| symbols.get(&s).copied()).unwrap_or_default();
    let rotation_degrees = match anchors {
        [a, b, ..] => (b.y - a.y).atan2(b.x - a.x).to_degrees(),
        _ => 0.0,
    };
    RenderHints { size, color, rotation_degrees }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn roads() -> Table {
        let mut table = Table::new("roadl.lft", [
            Column::new("id", "Row Identifier"),
            Column::new("nam", "Name"),
            Column::new("lanes", "Number of Lanes"),
            Column::new("f_code", "FACC Feature Code"),
            Column::new("med", "Median Category"),
            Column::new("edg_id", "Edge Primitive"),
            Column::new("tile_id", "Tile Reference"),
        ]);
        table.insert(vec![1.into(), "Main St".into(), 2.into(), "AP030".into(), 2.into(), 7.into(), 1.into()]).unwrap();
        table.insert(vec![2.into(), Value::Null, 4.into(), "AP030".into(), 9.into(), 8.into(), 1.into()]).unwrap();
        table
    }

    fn resolver() -> ValueResolver {
        let mut r = ValueResolver::new();
        r.insert_numeric("roadl.lft", "med", 2, "With Median")
            .insert_text("roadl.lft", "f_code", "AP030", "Road");
        r
    }

    #[test]
    fn tag_orders_coded_text_then_raw() {
        let table = roads();
        let tag = tag(&resolver(), &table, &table.row(1).unwrap(), "; ");
        assert_eq!(tag, "With Median; Main St; Road; Number of Lanes: 2");
    }

    #[test]
    fn unknown_code_uses_column_label() {
        let table = roads();
        let tag = tag(&resolver(), &table, &table.row(2).unwrap(), " | ");
        assert_eq!(tag, "Median Category: Unknown | Road | Number of Lanes: 4");
    }

    #[test]
    fn signature_skips_link_columns() {
        let table = roads();
        let sig = signature(&table.row(1).unwrap());
        assert_eq!(sig.0.len(), 4);
        assert_eq!(sig.0[0], SignatureValue::Text("Main St".into()));
    }

    #[test]
    fn rotation_follows_first_two_anchors() {
        let c = |x, y| Coord { x, y };
        let symbols = AHashMap::from_iter([(3, (Some(12.0), Some(5)))]);

        let hints = render_hints(&symbols, Some(3), &[c(0.0, 0.0), c(1.0, 1.0), c(5.0, 0.0)]);
        assert_eq!(hints.size, Some(12.0));
        assert_eq!(hints.color, Some(5));
        assert!((hints.rotation_degrees - 45.0).abs() < 1e-9);

        let hints = render_hints(&symbols, Some(4), &[c(0.0, 0.0)]);
        assert_eq!(hints, RenderHints { size: None, color: None, rotation_degrees: 0.0 });
    }
}
