//! Decoded tables, as handed over by a [`TableReader`].
//!
//! A table is an ordered list of columns and a set of rows keyed by the
//! value of their `id` column. Row values are aligned with the columns, so
//! each row reads as an ordered `attribute -> Value` map whatever schema the
//! theme uses.

mod json;
mod reader;
mod session;

use std::{collections::BTreeMap, fmt};

use ahash::AHashMap;
use anyhow::{bail, Result};
use geo::Coord;

pub use json::JsonReader;
pub use reader::{MemoryReader, TableReader};
pub use session::Session;

/// One decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
    Coords(Vec<Coord<f64>>),
}

impl Value {
    #[inline] pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self { Value::Number(n) => Some(*n), _ => None }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self { Value::Text(s) => Some(s), _ => None }
    }

    #[inline]
    pub fn as_coords(&self) -> Option<&[Coord<f64>]> {
        match self { Value::Coords(c) => Some(c), _ => None }
    }

    /// Integral numbers as an `i64` record or code key.
    pub fn as_key(&self) -> Option<i64> {
        self.as_f64().and_then(number_key)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Coords(c) => write!(f, "<{} coordinates>", c.len()),
        }
    }
}

impl From<f64> for Value { fn from(n: f64) -> Self { Value::Number(n) } }
impl From<i64> for Value { fn from(n: i64) -> Self { Value::Number(n as f64) } }
impl From<i32> for Value { fn from(n: i32) -> Self { Value::Number(n.into()) } }
impl From<&str> for Value { fn from(s: &str) -> Self { Value::Text(s.to_string()) } }
impl From<String> for Value { fn from(s: String) -> Self { Value::Text(s) } }
impl From<Vec<Coord<f64>>> for Value { fn from(c: Vec<Coord<f64>>) -> Self { Value::Coords(c) } }

/// `n` as an integer key, if it is finite and integral.
pub(crate) fn number_key(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15).then_some(n as i64)
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Column name with its human-readable description (may be empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub description: String,
}

impl Column {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}

/// A decoded table. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    lookup: AHashMap<String, usize>, // lowercase column name -> index
    id_column: Option<usize>,
    rows: BTreeMap<i64, Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = Column>) -> Self {
        let columns: Vec<Column> = columns.into_iter().collect();
        let lookup: AHashMap<String, usize> = columns.iter().enumerate()
            .map(|(i, c)| (c.name.to_ascii_lowercase(), i))
            .collect();
        let id_column = lookup.get("id").copied();

        Self { name: name.into(), columns, lookup, id_column, rows: BTreeMap::new() }
    }

    /// Build a table from column names (no descriptions) and rows.
    pub fn from_rows<I, V>(name: &str, columns: &[&str], rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: IntoIterator<Item = Value>,
    {
        let mut table = Table::new(name, columns.iter().map(|c| Column::new(*c, "")));
        for row in rows {
            table.insert(row.into_iter().collect())?;
        }
        Ok(table)
    }

    /// Add a row and return its record id. Without an `id` column, rows are
    /// numbered from 1 in insertion order.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<i64> {
        if values.len() != self.columns.len() {
            bail!("{}: row has {} values but the table has {} columns", self.name, values.len(), self.columns.len());
        }

        let id = match self.id_column {
            Some(i) => match values[i].as_key() {
                Some(id) => id,
                None => bail!("{}: record id {:?} is not an integer", self.name, values[i]),
            },
            None => self.rows.len() as i64 + 1,
        };

        if self.rows.insert(id, values).is_some() {
            bail!("{}: duplicate record id {id}", self.name);
        }
        Ok(id)
    }

    #[inline] pub fn name(&self) -> &str { &self.name }
    #[inline] pub fn columns(&self) -> &[Column] { &self.columns }
    #[inline] pub fn len(&self) -> usize { self.rows.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Index of a column, matched case-insensitively.
    #[inline]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.lookup.get(&name.to_ascii_lowercase()).copied()
    }

    /// Column description, falling back to the column name when empty.
    pub fn label(&self, name: &str) -> String {
        match self.column(name).map(|i| &self.columns[i]) {
            Some(c) if !c.description.trim().is_empty() => c.description.trim().to_string(),
            Some(c) => c.name.clone(),
            None => name.to_string(),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    #[inline]
    pub fn row(&self, id: i64) -> Option<Row<'_>> {
        self.rows.get(&id).map(|values| Row { table: self, id, values })
    }

    /// Rows in record-id order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |(&id, values)| Row { table: self, id, values })
    }
}

/// A borrowed row of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    id: i64,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    #[inline] pub fn id(&self) -> i64 { self.id }
    #[inline] pub fn values(&self) -> &'a [Value] { self.values }
    #[inline] pub fn at(&self, column: usize) -> &'a Value { &self.values[column] }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.table.column(name).map(|i| &self.values[i])
    }

    #[inline] pub fn number(&self, name: &str) -> Option<f64> { self.get(name).and_then(Value::as_f64) }
    #[inline] pub fn key(&self, name: &str) -> Option<i64> { self.get(name).and_then(Value::as_key) }
    #[inline] pub fn text(&self, name: &str) -> Option<&'a str> { self.get(name).and_then(Value::as_text) }
    #[inline] pub fn coords(&self, name: &str) -> Option<&'a [Coord<f64>]> { self.get(name).and_then(Value::as_coords) }

    /// Iterate over `(column, value)` pairs in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a Column, &'a Value)> + 'a {
        self.table.columns.iter().zip(self.values.iter())
    }
}
