use std::{
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use ahash::AHashMap;
use tracing::debug;

use crate::error::Result;
use crate::resolve::ValueResolver;
use crate::table::{Table, TableReader};

/// Caller-owned cache of loaded tables and value resolvers.
///
/// Tables are immutable once loaded, so one session can be shared by every
/// worker of a query (and by consecutive queries). Absent tables are cached
/// as absent; read failures are not cached.
pub struct Session<R> {
    reader: R,
    tables: RwLock<AHashMap<(PathBuf, String), Option<Arc<Table>>>>,
    resolvers: RwLock<AHashMap<PathBuf, Arc<ValueResolver>>>,
}

impl<R: TableReader> Session<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tables: RwLock::new(AHashMap::new()),
            resolvers: RwLock::new(AHashMap::new()),
        }
    }

    #[inline] pub fn reader(&self) -> &R { &self.reader }

    /// Load `table` from `path`, or `None` if it does not exist.
    pub fn try_table(&self, path: &Path, table: &str) -> Result<Option<Arc<Table>>> {
        let key = (path.to_path_buf(), table.to_ascii_lowercase());
        if let Some(cached) = self.tables.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(cached.clone());
        }

        let loaded = match self.reader.read_table(path, table) {
            Ok(t) => Some(Arc::new(t)),
            Err(e) if e.is_missing() => {
                debug!("table {table} not found in {}", path.display());
                None
            }
            Err(e) => return Err(e),
        };

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.entry(key).or_insert(loaded).clone())
    }

    /// Load `table` from `path`; an absent table is [`crate::Error::MissingTable`].
    pub fn table(&self, path: &Path, table: &str) -> Result<Arc<Table>> {
        self.try_table(path, table)?.ok_or_else(|| crate::Error::MissingTable {
            path: path.to_path_buf(),
            table: table.to_string(),
        })
    }

    /// The value resolver of the theme stored in `theme_dir`, built from its
    /// `int.vdt` and `char.vdt` tables (either may be absent).
    pub fn resolver(&self, theme_dir: &Path) -> Result<Arc<ValueResolver>> {
        if let Some(cached) = self.resolvers.read().unwrap_or_else(PoisonError::into_inner).get(theme_dir) {
            return Ok(cached.clone());
        }

        let numeric = self.try_table(theme_dir, ValueResolver::NUMERIC_TABLE)?;
        let text = self.try_table(theme_dir, ValueResolver::TEXT_TABLE)?;
        let resolver = Arc::new(ValueResolver::from_tables(numeric.as_deref(), text.as_deref()));

        let mut resolvers = self.resolvers.write().unwrap_or_else(PoisonError::into_inner);
        Ok(resolvers.entry(theme_dir.to_path_buf()).or_insert(resolver).clone())
    }

    /// Number of cached table lookups, present or absent.
    pub fn cached_tables(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every cached table and resolver.
    pub fn clear(&self) {
        self.tables.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.resolvers.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
