//! Assembly of feature records for one (tile, theme, level) unit.
//!
//! Feature rows are linked to primitives through their key column. Rows
//! sharing an attribute signature are grouped into one multi-part record,
//! except at the text level where every row is a record of its own. Face
//! geometry comes from ring traversal, the other levels copy primitive
//! coordinates as they are.

mod primitives;
mod tag;

use std::{collections::BTreeSet, path::Path, sync::Arc};

use ahash::AHashMap;
use anyhow::anyhow;
use tracing::{debug, warn};
use wingedge::{traverse_face, EdgeId, FaceId, NodeId};

use crate::config::MosaicConfig;
use crate::error::{Error, Result};
use crate::feature::{FeatureRecord, Signature, TopologyLevel};
use crate::library::{FeatureClass, Library, Theme};
use crate::resolve::{Criterion, ValueResolver};
use crate::table::{Session, Table, TableReader};
use crate::tile::Tile;

use primitives::Primitives;
pub use tag::SYMBOL_TABLE;

/// Records of one unit plus the entities that had to be skipped.
#[derive(Debug, Default)]
pub struct Assembly {
    pub records: Vec<FeatureRecord>,
    /// Per-entity problems (malformed faces, dangling keys). The records
    /// above are complete without them.
    pub faults: Vec<Error>,
}

/// Feature rows of one feature table that survived filtering.
struct Selection {
    class: FeatureClass,
    table: Arc<Table>,
    rows: Vec<i64>,
}

/// Primitives and styling shared by every selection of one unit.
struct UnitData<'u> {
    dir: &'u Path,
    primitives: &'u Primitives,
    symbols: &'u AHashMap<i64, (Option<f64>, Option<i64>)>,
}

/// Builds feature records from the tables of one library.
pub struct FeatureAssembler<'a, R> {
    session: &'a Session<R>,
    library: &'a Library,
    config: &'a MosaicConfig,
}

impl<'a, R: TableReader> FeatureAssembler<'a, R> {
    pub fn new(session: &'a Session<R>, library: &'a Library, config: &'a MosaicConfig) -> Self {
        Self { session, library, config }
    }

    /// Assemble the features of `theme` at `level` in tile `tile_id`.
    ///
    /// Without `feature_table`, every feature table of the theme at `level`
    /// is assembled. An explicit table at another level yields nothing.
    /// `criteria` restrict the feature rows; an empty list restricts nothing.
    pub fn assemble(
        &self,
        tile_id: i64,
        theme: &Theme,
        level: TopologyLevel,
        feature_table: Option<&str>,
        criteria: Option<&[Criterion]>,
    ) -> Result<Assembly> {
        let tile = self.library.tiles().get(tile_id)
            .ok_or_else(|| Error::InvalidQuery(format!("library has no tile {tile_id}")))?;

        let classes: Vec<FeatureClass> = match feature_table {
            Some(name) => {
                let class = match theme.feature_class(name) {
                    Some(class) => class.clone(),
                    None => FeatureClass::from_table(name).ok_or_else(|| {
                        Error::InvalidQuery(format!("`{name}` is not a feature table"))
                    })?,
                };
                if class.level == level { vec![class] } else { Vec::new() }
            }
            None => theme.classes_at(level).cloned().collect(),
        };

        let resolver = self.session.resolver(&self.library.theme_dir(theme))?;
        let mut selections = Vec::with_capacity(classes.len());
        for class in classes {
            if let Some(selection) = self.select(tile, theme, class, &resolver, criteria)? {
                selections.push(selection);
            }
        }

        let mut assembly = Assembly::default();
        if selections.is_empty() {
            return Ok(assembly);
        }

        let dir = self.library.primitive_dir(theme, tile);
        let Some(primitives) = Primitives::load(self.session, &dir, level)? else {
            return Ok(assembly);
        };

        let symbols = match level {
            TopologyLevel::Text => self.session.try_table(&self.library.theme_dir(theme), SYMBOL_TABLE)?
                .map(|t| tag::symbols(&t))
                .unwrap_or_default(),
            _ => AHashMap::new(),
        };

        let unit = UnitData { dir: &dir, primitives: &primitives, symbols: &symbols };
        for selection in &selections {
            let before = assembly.records.len();
            self.build(tile, &resolver, selection, &unit, &mut assembly);
            debug!(
                "tile {}: {} {level} record(s) from {}",
                tile.id, assembly.records.len() - before, selection.class.table,
            );
        }
        Ok(assembly)
    }

    /// Feature rows of `class` linked to `tile` and matching `criteria`, or
    /// `None` when there are none.
    fn select(
        &self,
        tile: &Tile,
        theme: &Theme,
        class: FeatureClass,
        resolver: &ValueResolver,
        criteria: Option<&[Criterion]>,
    ) -> Result<Option<Selection>> {
        let Some(table) = self.session.try_table(&self.library.theme_dir(theme), &class.table)? else {
            return Ok(None);
        };

        let has_tile_column = self.library.is_tiled() && table.column("tile_id").is_some();
        let candidates: Vec<i64> = table.rows()
            .filter(|row| row.key(&class.key).is_some_and(|k| k > 0))
            .filter(|row| !has_tile_column || row.key("tile_id") == Some(tile.id))
            .map(|row| row.id())
            .collect();

        let rows = match criteria {
            Some(criteria) if !criteria.is_empty() => resolver
                .match_predicate(&table, &candidates, criteria, self.config.filter_mode)?
                .into_iter()
                .collect(),
            _ => candidates,
        };

        Ok((!rows.is_empty()).then_some(Selection { class, table, rows }))
    }

    /// Group the selected rows and build one record per group.
    fn build(
        &self,
        tile: &Tile,
        resolver: &ValueResolver,
        selection: &Selection,
        unit: &UnitData<'_>,
        assembly: &mut Assembly,
    ) {
        let Selection { class, table, rows } = selection;

        // Groups in order of their first row.
        let mut groups: Vec<(Signature, Vec<i64>)> = Vec::new();
        let mut index: AHashMap<Signature, usize> = AHashMap::new();
        for row in rows.iter().filter_map(|&id| table.row(id)) {
            let signature = tag::signature(&row);
            if class.level == TopologyLevel::Text {
                groups.push((signature, vec![row.id()]));
                continue;
            }
            match index.get(&signature) {
                Some(&i) => groups[i].1.push(row.id()),
                None => {
                    index.insert(signature.clone(), groups.len());
                    groups.push((signature, vec![row.id()]));
                }
            }
        }

        for (signature, members) in groups {
            let Some(first) = table.row(members[0]) else { continue };
            let mut record = FeatureRecord {
                level: class.level,
                feature_table: class.table.clone(),
                rings: Vec::new(),
                tag: tag::tag(resolver, table, &first, &self.config.tag_separator),
                label: None,
                render: None,
                signature,
                tiles: vec![tile.id],
                polygons: Vec::new(),
            };

            // Entity keys in row order; a key shared by rows counts once.
            let mut seen = BTreeSet::new();
            let keys: Vec<i64> = members.iter()
                .filter_map(|&id| table.row(id).and_then(|r| r.key(&class.key)))
                .filter(|&k| seen.insert(k))
                .collect();

            for key in keys {
                if let Err(fault) = add_entity(&mut record, unit, key, first.key("symbol_id")) {
                    warn!("tile {}: {} entity {key} skipped: {fault}", tile.id, class.table);
                    assembly.faults.push(fault);
                }
            }

            if !record.rings.is_empty() {
                assembly.records.push(record);
            }
        }
    }
}

/// Add the geometry of entity `key` to `record`.
fn add_entity(
    record: &mut FeatureRecord,
    unit: &UnitData<'_>,
    key: i64,
    symbol: Option<i64>,
) -> Result<()> {
    let dir = unit.dir;
    match unit.primitives {
        Primitives::Faces { edges, rings } => {
            let face = traverse_face(FaceId(key), rings, edges)?;
            if !face.is_empty() {
                record.polygons.push(face.len());
                record.rings.extend(face);
            }
        }
        Primitives::Edges(edges) => {
            let edge = edges.get(EdgeId(key)).ok_or_else(|| dangling(dir, &record.feature_table, "edg", key))?;
            record.rings.push(edge.coords.clone());
        }
        Primitives::Nodes(nodes) => {
            let node = nodes.get(&NodeId(key)).ok_or_else(|| dangling(dir, &record.feature_table, "end", key))?;
            record.rings.push(vec![node.coord]);
        }
        Primitives::Texts(texts) => {
            let text = texts.get(&key).ok_or_else(|| dangling(dir, &record.feature_table, "txt", key))?;
            record.label = Some(text.text.clone());
            record.render = Some(tag::render_hints(unit.symbols, symbol, &text.anchors));
            record.rings.push(text.anchors.clone());
        }
    }
    Ok(())
}

fn dangling(dir: &Path, feature_table: &str, table: &str, key: i64) -> Error {
    Error::io(dir, table, anyhow!("{feature_table} refers to missing {table} record {key}"))
}
