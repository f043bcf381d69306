//! Libraries, themes and the feature tables they hold.
//!
//! A library is a directory with one subdirectory per theme and, when it is
//! tiled, a `tileref` directory describing the tiles. Primitive tables of a
//! theme live in `<theme>/<tile path>`; feature tables, value description
//! tables and `symbol.rat` live in `<theme>` itself.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::feature::TopologyLevel;
use crate::table::{Session, TableReader};
use crate::tile::{Tile, TileIndex, FBR_TABLE, TILEREF_DIR, TILEREF_TABLE};

/// Feature class schema table of a theme.
pub const FCS_TABLE: &str = "fcs";

/// A feature table and the level it is built on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureClass {
    pub table: String,
    pub level: TopologyLevel,
    /// Foreign key column linking rows to entities, e.g. `edg_id`.
    pub key: String,
}

impl FeatureClass {
    /// Infer the level and key from the table's extension.
    pub fn from_table(table: &str) -> Option<Self> {
        let level = TopologyLevel::from_feature_table(table)?;
        Some(Self { table: table.trim().to_string(), level, key: level.key_field().to_string() })
    }
}

/// A named layer of a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    name: String,
    classes: Vec<FeatureClass>,
}

impl Theme {
    /// A theme with no known feature tables. The name must be a single
    /// directory name.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(Error::InvalidQuery(format!("`{name}` is not a usable theme name")));
        }
        Ok(Self { name: name.to_string(), classes: Vec::new() })
    }

    /// Read the theme's feature tables from its `fcs` table. A theme without
    /// one has no feature tables.
    pub fn discover<R: TableReader>(session: &Session<R>, library: &Library, name: &str) -> Result<Self> {
        let mut theme = Self::new(name)?;
        let dir = library.theme_dir(&theme);
        let Some(fcs) = session.try_table(&dir, FCS_TABLE)? else {
            debug!("theme {} has no {FCS_TABLE} table", theme.name);
            return Ok(theme);
        };

        for row in fcs.rows() {
            let Some(table) = row.text("table1") else { continue };
            let Some(mut class) = FeatureClass::from_table(table) else { continue };
            // Only the rows that link a feature table to its primitive.
            if row.text("table2").is_some_and(|t| !t.trim().eq_ignore_ascii_case(class.level.entity_table())) {
                continue;
            }
            if let Some(key) = row.text("table1_key").map(str::trim).filter(|k| !k.is_empty()) {
                class.key = key.to_ascii_lowercase();
            }
            theme.push(class);
        }
        Ok(theme)
    }

    fn push(&mut self, class: FeatureClass) {
        if !self.classes.iter().any(|c| c.table.eq_ignore_ascii_case(&class.table)) {
            self.classes.push(class);
        }
    }

    #[inline] pub fn name(&self) -> &str { &self.name }
    #[inline] pub fn feature_classes(&self) -> &[FeatureClass] { &self.classes }

    /// Feature tables at `level`, in discovery order.
    pub fn classes_at(&self, level: TopologyLevel) -> impl Iterator<Item = &FeatureClass> + '_ {
        self.classes.iter().filter(move |c| c.level == level)
    }

    pub fn feature_class(&self, table: &str) -> Option<&FeatureClass> {
        self.classes.iter().find(|c| c.table.eq_ignore_ascii_case(table.trim()))
    }
}

/// A library root and its tiles.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    tiles: TileIndex,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>, tiles: TileIndex) -> Self {
        Self { root: root.into(), tiles }
    }

    /// Open the library at `root`, reading its tile reference tables. A
    /// library without `tileref/tileref.aft` is untiled.
    pub fn open<R: TableReader>(session: &Session<R>, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let tileref_dir = root.join(TILEREF_DIR);

        let tiles = match session.try_table(&tileref_dir, TILEREF_TABLE)? {
            Some(tileref) => {
                let fbr = session.table(&tileref_dir, FBR_TABLE)?;
                TileIndex::from_tables(&tileref_dir, &tileref, &fbr)?
            }
            None => TileIndex::untiled(),
        };
        debug!("opened library {} with {} tile(s)", root.display(), tiles.len());

        Ok(Self { root, tiles })
    }

    #[inline] pub fn root(&self) -> &Path { &self.root }
    #[inline] pub fn tiles(&self) -> &TileIndex { &self.tiles }
    #[inline] pub fn is_tiled(&self) -> bool { self.tiles.is_tiled() }

    /// Directory of the theme's feature and description tables.
    pub fn theme_dir(&self, theme: &Theme) -> PathBuf {
        self.root.join(theme.name())
    }

    /// Directory of the theme's primitive tables for `tile`.
    pub fn primitive_dir(&self, theme: &Theme, tile: &Tile) -> PathBuf {
        let dir = self.theme_dir(theme);
        if tile.path.as_os_str().is_empty() { dir } else { dir.join(&tile.path) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{MemoryReader, Table, Value};

    fn fcs() -> Table {
        Table::from_rows("fcs", &["id", "feature_class", "table1", "table1_key", "table2", "table2_key"], [
            [Value::from(1), "ROADL".into(), "roadl.lft".into(), "edg_id".into(), "edg".into(), "id".into()],
            [Value::from(2), "ROADL".into(), "edg".into(), "id".into(), "roadl.lft".into(), "edg_id".into()],
            [Value::from(3), "ROADL".into(), "roadl.lft".into(), "edg_id".into(), "edg".into(), "id".into()],
            [Value::from(4), "BUILTUPA".into(), "builtupa.aft".into(), "FAC_ID".into(), "fac".into(), "id".into()],
            [Value::from(5), "RAILRDL".into(), "railrdl.lft".into(), "id".into(), "roadl.lft".into(), "id".into()],
        ]).unwrap()
    }

    #[test]
    fn theme_names_are_single_directories() {
        assert!(Theme::new("trans").is_ok());
        for bad in ["", " ", "..", "a/b", "a\\b"] {
            assert!(matches!(Theme::new(bad), Err(Error::InvalidQuery(_))), "{bad:?}");
        }
    }

    #[test]
    fn feature_class_follows_the_extension() {
        let class = FeatureClass::from_table("roadl.lft").unwrap();
        assert_eq!(class.level, TopologyLevel::Edge);
        assert_eq!(class.key, "edg_id");
        assert!(FeatureClass::from_table("roads").is_none());
    }

    #[test]
    fn discovers_feature_classes_from_fcs() {
        let mut reader = MemoryReader::new();
        reader.insert("lib/trans", fcs());
        let session = Session::new(reader);
        let library = Library::new("lib", TileIndex::untiled());

        let theme = Theme::discover(&session, &library, "trans").unwrap();
        let tables: Vec<_> = theme.feature_classes().iter().map(|c| c.table.as_str()).collect();
        assert_eq!(tables, vec!["roadl.lft", "builtupa.aft"]);
        assert_eq!(theme.classes_at(TopologyLevel::Face).next().unwrap().key, "fac_id");
        assert_eq!(theme.classes_at(TopologyLevel::Text).count(), 0);
    }

    #[test]
    fn opens_tiled_and_untiled_libraries() {
        let mut reader = MemoryReader::new();
        reader.insert("tiled/tileref", Table::from_rows("tileref.aft", &["id", "tile_name", "fac_id"], [
            [Value::from(1), "e\\f".into(), 2.into()],
        ]).unwrap());
        reader.insert("tiled/tileref", Table::from_rows("fbr", &["id", "xmin", "ymin", "xmax", "ymax"], [
            [Value::from(2), 0.0.into(), 0.0.into(), 15.0.into(), 15.0.into()],
        ]).unwrap());
        let session = Session::new(reader);

        let tiled = Library::open(&session, "tiled").unwrap();
        assert!(tiled.is_tiled());
        let theme = Theme::new("trans").unwrap();
        let tile = tiled.tiles().get(1).unwrap();
        assert_eq!(tiled.primitive_dir(&theme, tile), Path::new("tiled/trans/e/f"));

        let untiled = Library::open(&session, "flat").unwrap();
        assert!(!untiled.is_tiled());
        let tile = untiled.tiles().get(1).unwrap();
        assert_eq!(untiled.primitive_dir(&theme, tile), untiled.theme_dir(&theme));
    }
}
