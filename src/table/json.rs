use std::{fs::File, io::{BufReader, ErrorKind}, path::{Path, PathBuf}};

use anyhow::{anyhow, bail, Context};
use geo::Coord;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::table::{Column, Table, TableReader, Value};

/// Reads tables from JSON dumps laid out like the library itself:
/// `<root>/<path>/<table>.json`, e.g. `vmaplv0/trans/int.vdt.json`.
///
/// Each dump holds the column list and the rows as arrays aligned to it:
///
/// ```json
/// {
///   "columns": [{ "name": "id", "description": "Row Identifier" }, "f_code"],
///   "rows": [[1, "AP030"], [2, "AN010"]]
/// }
/// ```
///
/// `null`, numbers and strings map to the matching [`Value`]; a `[x, y]`
/// pair or an array of pairs maps to [`Value::Coords`].
#[derive(Debug, Clone)]
pub struct JsonReader {
    root: PathBuf,
}

#[derive(Deserialize)]
struct TableDump {
    columns: Vec<ColumnDump>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnDump {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        description: String,
    },
}

impl From<ColumnDump> for Column {
    fn from(c: ColumnDump) -> Self {
        match c {
            ColumnDump::Name(name) => Column::new(name, ""),
            ColumnDump::Full { name, description } => Column::new(name, description),
        }
    }
}

impl JsonReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    fn file_path(&self, path: &Path, table: &str) -> PathBuf {
        self.root.join(path).join(format!("{table}.json"))
    }
}

impl TableReader for JsonReader {
    fn read_table(&self, path: &Path, table: &str) -> Result<Table> {
        let file_path = self.file_path(path, table);
        let file = match File::open(&file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::MissingTable { path: path.to_path_buf(), table: table.to_string() });
            }
            Err(e) => {
                let source = anyhow::Error::new(e).context(format!("Failed to open {}", file_path.display()));
                return Err(Error::io(path, table, source));
            }
        };

        parse_dump(table, BufReader::new(file))
            .with_context(|| format!("Failed to read JSON table: {}", file_path.display()))
            .map_err(|source| Error::io(path, table, source))
    }
}

fn parse_dump(name: &str, reader: impl std::io::Read) -> anyhow::Result<Table> {
    let dump: TableDump = serde_json::from_reader(reader)?;
    let mut table = Table::new(name, dump.columns.into_iter().map(Column::from));

    for (i, row) in dump.rows.into_iter().enumerate() {
        let values = row.into_iter()
            .map(to_value)
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("row {i}"))?;
        table.insert(values)?;
    }
    Ok(table)
}

fn to_value(value: serde_json::Value) -> anyhow::Result<Value> {
    use serde_json::Value as Json;

    Ok(match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Number(if b { 1.0 } else { 0.0 }),
        Json::Number(n) => Value::Number(n.as_f64().ok_or_else(|| anyhow!("unrepresentable number {n}"))?),
        Json::String(s) => Value::Text(s),
        Json::Array(items) => {
            if let Some(coord) = to_coord(&items) {
                Value::Coords(vec![coord])
            } else {
                let coords = items.iter()
                    .map(|item| item.as_array().and_then(|pair| to_coord(pair)))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| anyhow!("array is not a coordinate chain"))?;
                Value::Coords(coords)
            }
        }
        Json::Object(_) => bail!("objects are not valid field values"),
    })
}

/// `[x, y]` or `[x, y, z]` (z dropped).
fn to_coord(items: &[serde_json::Value]) -> Option<Coord<f64>> {
    match items {
        [x, y] | [x, y, _] => Some(Coord { x: x.as_f64()?, y: y.as_f64()? }),
        _ => None,
    }
}
