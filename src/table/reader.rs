use std::path::{Path, PathBuf};

use ahash::AHashMap;

use crate::error::{Error, Result};
use crate::table::Table;

/// Source of decoded tables.
///
/// `path` is the directory of the table inside a library (library root,
/// theme directory, or tile directory) and `table` the file name, e.g.
/// `int.vdt` or `edg`. A table that does not exist must be reported as
/// [`Error::MissingTable`]; any other failure as [`Error::Io`].
pub trait TableReader: Send + Sync {
    fn read_table(&self, path: &Path, table: &str) -> Result<Table>;
}

impl<R: TableReader + ?Sized> TableReader for &R {
    fn read_table(&self, path: &Path, table: &str) -> Result<Table> {
        (**self).read_table(path, table)
    }
}

/// Tables held in memory, keyed by directory and lowercase table name.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    tables: AHashMap<(PathBuf, String), Table>,
}

impl MemoryReader {
    pub fn new() -> Self { Self::default() }

    /// Register `table` under `path`, replacing any table of the same name.
    pub fn insert(&mut self, path: impl Into<PathBuf>, table: Table) -> &mut Self {
        let key = (path.into(), table.name().to_ascii_lowercase());
        self.tables.insert(key, table);
        self
    }

    #[inline] pub fn len(&self) -> usize { self.tables.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.tables.is_empty() }
}

impl TableReader for MemoryReader {
    fn read_table(&self, path: &Path, table: &str) -> Result<Table> {
        self.tables
            .get(&(path.to_path_buf(), table.to_ascii_lowercase()))
            .cloned()
            .ok_or_else(|| Error::MissingTable { path: path.to_path_buf(), table: table.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn memory_reader_finds_tables_by_path_and_name() {
        let mut reader = MemoryReader::new();
        reader.insert("lib/trans", Table::from_rows("INT.VDT", &["id"], [[Value::from(1)]]).unwrap());

        let table = reader.read_table(Path::new("lib/trans"), "int.vdt").unwrap();
        assert_eq!(table.len(), 1);

        let err = reader.read_table(Path::new("lib/bnd"), "int.vdt").unwrap_err();
        assert!(err.is_missing());
    }
}
