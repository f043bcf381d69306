//! Spatial tiles of a library and region selection over them.

mod bbox;

use std::{collections::BTreeSet, path::{Path, PathBuf}};

use anyhow::anyhow;
use rstar::RTree;

use crate::error::{Error, Result};
use crate::table::Table;

use bbox::{envelope, TileBox};
pub use bbox::TileBounds;

/// Library-relative directory of the tile reference tables.
pub const TILEREF_DIR: &str = "tileref";
/// Tile area feature table: `id`, `tile_name`, `fac_id`.
pub const TILEREF_TABLE: &str = "tileref.aft";
/// Face bounding rectangles: `id`, `xmin`, `ymin`, `xmax`, `ymax`.
pub const FBR_TABLE: &str = "fbr";

/// One spatial partition of a library.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: i64,
    /// Name as stored, e.g. `e\f`.
    pub name: String,
    /// Directory of the tile's primitives relative to a theme directory.
    pub path: PathBuf,
    pub bounds: TileBounds,
}

/// Tile bounding boxes in an R-tree.
#[derive(Debug, Clone)]
pub struct TileIndex {
    tiles: Vec<Tile>,
    rtree: RTree<TileBox>,
    tiled: bool,
}

impl TileIndex {
    /// Index `tiles`; selection results keep their order.
    pub fn new(tiles: impl IntoIterator<Item = Tile>) -> Self {
        let tiles: Vec<Tile> = tiles.into_iter().collect();
        let boxes = tiles.iter().enumerate()
            .flat_map(|(i, tile)| tile.bounds.rects().into_iter().map(move |rect| TileBox::new(i, rect)))
            .collect();

        Self { rtree: RTree::bulk_load(boxes), tiles, tiled: true }
    }

    /// A library without tiles: one whole-globe tile whose primitives live
    /// directly in the theme directory.
    pub fn untiled() -> Self {
        let tile = Tile { id: 1, name: String::new(), path: PathBuf::new(), bounds: TileBounds::GLOBE };
        Self { tiled: false, ..Self::new([tile]) }
    }

    /// Build the index from the library's `tileref.aft` and `fbr` tables.
    /// Each tile's box is the face bounding rectangle of its `fac_id`.
    pub fn from_tables(path: &Path, tileref: &Table, fbr: &Table) -> Result<Self> {
        let mut tiles = Vec::with_capacity(tileref.len());
        for row in tileref.rows() {
            let name = row.text("tile_name")
                .map(|n| n.trim().to_string())
                .ok_or_else(|| Error::io(path, tileref.name(), anyhow!("tile {} has no tile_name", row.id())))?;

            let face = row.key("fac_id").unwrap_or(row.id());
            let bounds = fbr.row(face)
                .and_then(|r| Some(TileBounds {
                    south: r.number("ymin")?,
                    north: r.number("ymax")?,
                    west:  r.number("xmin")?,
                    east:  r.number("xmax")?,
                }))
                .ok_or_else(|| Error::io(path, fbr.name(), anyhow!("no bounding rectangle for tile {} ({name})", row.id())))?;

            tiles.push(Tile { id: row.id(), path: tile_path(&name), name, bounds });
        }
        Ok(Self::new(tiles))
    }

    #[inline] pub fn len(&self) -> usize { self.tiles.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.tiles.is_empty() }
    #[inline] pub fn is_tiled(&self) -> bool { self.tiled }
    #[inline] pub fn tiles(&self) -> &[Tile] { &self.tiles }

    pub fn get(&self, id: i64) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    /// Ids of the tiles whose box intersects the query region, in insertion
    /// order. Boxes touching along an edge intersect. A `lonlim` with
    /// west > east crosses the antimeridian.
    pub fn select(&self, latlim: (f64, f64), lonlim: (f64, f64)) -> Vec<i64> {
        let query = TileBounds::new(latlim.0, latlim.1, lonlim.0, lonlim.1);
        let hits: BTreeSet<usize> = query.rects().iter()
            .flat_map(|rect| self.rtree.locate_in_envelope_intersecting(&envelope(rect)))
            .map(TileBox::idx)
            .collect();

        hits.into_iter().map(|i| self.tiles[i].id).collect()
    }
}

/// `e\f` -> `e/f`.
fn tile_path(name: &str) -> PathBuf {
    name.split(['\\', '/'])
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn tile(id: i64, west: f64, east: f64) -> Tile {
        Tile { id, name: format!("t{id}"), path: PathBuf::from(format!("t{id}")), bounds: TileBounds::new(0.0, 10.0, west, east) }
    }

    fn index() -> TileIndex {
        TileIndex::new([
            tile(1, -180.0, -170.0),
            tile(2, -170.0, -160.0),
            tile(3, 160.0, 170.0),
            tile(4, 170.0, 180.0),
            tile(5, 0.0, 10.0),
        ])
    }

    #[test]
    fn shared_edges_are_inclusive() {
        let index = index();
        assert_eq!(index.select((0.0, 5.0), (-172.0, -170.0)), vec![1, 2]);
        assert_eq!(index.select((10.0, 20.0), (5.0, 6.0)), vec![5]);
    }

    #[test]
    fn wrap_query_is_union_of_both_halves() {
        let index = index();
        let wrapped = index.select((0.0, 5.0), (170.0, -170.0));
        let mut halves = index.select((0.0, 5.0), (170.0, 180.0));
        halves.extend(index.select((0.0, 5.0), (-180.0, -170.0)));
        halves.sort();
        halves.dedup();
        assert_eq!(wrapped, halves);
        assert_eq!(wrapped, vec![1, 2, 3, 4]);
    }

    #[test]
    fn selection_is_deterministic_and_possibly_empty() {
        let index = index();
        let a = index.select((-5.0, 5.0), (-175.0, 175.0));
        assert_eq!(a, index.select((-5.0, 5.0), (-175.0, 175.0)));
        assert!(index.select((50.0, 60.0), (0.0, 10.0)).is_empty());
    }

    #[test]
    fn wrapping_tile_is_found_from_both_sides() {
        let index = TileIndex::new([
            Tile { id: 7, name: "w".into(), path: "w".into(), bounds: TileBounds::new(0.0, 10.0, 175.0, -175.0) },
        ]);
        assert_eq!(index.select((1.0, 2.0), (176.0, 177.0)), vec![7]);
        assert_eq!(index.select((1.0, 2.0), (-177.0, -176.0)), vec![7]);
        assert!(index.select((1.0, 2.0), (0.0, 1.0)).is_empty());
    }

    #[test]
    fn builds_from_tileref_tables() {
        let tileref = Table::from_rows("tileref.aft", &["id", "tile_name", "fac_id"], [
            [Value::from(1), "e\\f".into(), 2.into()],
            [Value::from(2), "e\\g".into(), 3.into()],
        ]).unwrap();
        let fbr = Table::from_rows("fbr", &["id", "xmin", "ymin", "xmax", "ymax"], [
            [Value::from(1), (-180.0).into(), (-90.0).into(), 180.0.into(), 90.0.into()],
            [Value::from(2), 0.0.into(), 0.0.into(), 15.0.into(), 15.0.into()],
            [Value::from(3), 15.0.into(), 0.0.into(), 30.0.into(), 15.0.into()],
        ]).unwrap();

        let index = TileIndex::from_tables(Path::new("lib/tileref"), &tileref, &fbr).unwrap();
        assert!(index.is_tiled());
        assert_eq!(index.get(1).unwrap().path, PathBuf::from("e").join("f"));
        assert_eq!(index.select((5.0, 6.0), (20.0, 21.0)), vec![2]);
        assert_eq!(index.select((5.0, 6.0), (10.0, 20.0)), vec![1, 2]);
    }

    #[test]
    fn missing_rectangle_is_an_io_failure() {
        let tileref = Table::from_rows("tileref.aft", &["id", "tile_name", "fac_id"], [
            [Value::from(1), "e\\f".into(), 9.into()],
        ]).unwrap();
        let fbr = Table::from_rows("fbr", &["id", "xmin", "ymin", "xmax", "ymax"], Vec::<Vec<Value>>::new()).unwrap();
        let err = TileIndex::from_tables(Path::new("lib/tileref"), &tileref, &fbr).unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "{err}");
    }

    #[test]
    fn untiled_covers_the_globe() {
        let index = TileIndex::untiled();
        assert!(!index.is_tiled());
        assert_eq!(index.select((10.0, 20.0), (170.0, -170.0)), vec![1]);
        assert_eq!(index.get(1).unwrap().path, PathBuf::new());
    }
}
