use geo::{coord, Rect};
use rstar::{RTreeObject, AABB};
use smallvec::{smallvec, SmallVec};

/// Geographic extent of a tile or query in degrees. `west > east` means the
/// box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl TileBounds {
    pub const GLOBE: TileBounds = TileBounds { south: -90.0, north: 90.0, west: -180.0, east: 180.0 };

    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self { south, north, west, east }
    }

    #[inline] pub fn wraps(&self) -> bool { self.west > self.east }

    /// The box as one or two non-wrapping rectangles.
    pub fn rects(&self) -> SmallVec<[Rect<f64>; 2]> {
        let rect = |w: f64, e: f64| Rect::new(coord! { x: w, y: self.south }, coord! { x: e, y: self.north });
        if self.wraps() {
            smallvec![rect(self.west, 180.0), rect(-180.0, self.east)]
        } else {
            smallvec![rect(self.west, self.east)]
        }
    }
}

/// One rectangle of a tile in the R-tree, associated with a tile by index.
#[derive(Debug, Clone)]
pub(super) struct TileBox {
    idx: usize, // Index of the tile in insertion order
    bbox: Rect<f64>,
}

impl TileBox {
    pub(super) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the corresponding tile.
    pub(super) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for TileBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope(&self.bbox)
    }
}

pub(super) fn envelope(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(rect.min().into(), rect.max().into())
}
