//! Winged-edge topology records.
//!
//! # Structure
//!
//! Unlike a DCEL, which splits every undirected edge into two half-edges,
//! a winged-edge record carries **both** directions of one edge:
//!
//! * `start_node` / `end_node` — the endpoints in stored chain order
//! * `right_face` / `left_face` — the faces on either side when walking
//!   the stored chain from start to end
//! * `right_edge` — the edge that continues the boundary of `right_face`
//!   after this edge's end node
//! * `left_edge`  — the edge that continues the boundary of `left_face`
//!   after this edge's start node
//!
//! Walking an edge in stored order keeps its right face on the right and
//! is called [`Orientation::Forward`]; walking it backwards keeps the left
//! face on the right and is [`Orientation::Reversed`].
//!
//! # Indexing
//!
//! Ids are the record ids found in the source tables (1-based, signed so
//! that negative or zero foreign keys can be represented and rejected).
//! Face id `1` is reserved for the unbounded universe face.

use std::fmt;

use ahash::AHashMap;
use geo::Coord;

// ---------------------------------------------------------------------------
// Index types
// ---------------------------------------------------------------------------

macro_rules! idx {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

idx!(NodeId);
idx!(EdgeId);
idx!(FaceId);
idx!(RingId);

/// The unbounded universe face — always `FaceId(1)`.
pub const UNIVERSE_FACE: FaceId = FaceId(1);

/// Direction in which an edge record is walked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Stored chain order; the right face stays on the right.
    Forward,
    /// Reverse chain order; the left face stays on the right.
    Reversed,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An entity or connected node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id:    NodeId,
    pub coord: Coord<f64>,
}

/// One winged-edge record.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id:         EdgeId,
    /// Coordinate chain from `start_node` to `end_node` (at least two points).
    pub coords:     Vec<Coord<f64>>,
    pub start_node: NodeId,
    pub end_node:   NodeId,
    pub left_face:  FaceId,
    pub right_face: FaceId,
    /// Continuation after the start node, walking with the left face on the right.
    pub left_edge:  EdgeId,
    /// Continuation after the end node, walking with the right face on the right.
    pub right_edge: EdgeId,
}

impl Edge {
    /// True when the same face lies on both sides (dangles and bridges).
    #[inline] pub fn is_spur(&self) -> bool { self.left_face == self.right_face }

    /// The node a walk in `orientation` leaves from.
    #[inline]
    pub fn tail(&self, orientation: Orientation) -> NodeId {
        match orientation {
            Orientation::Forward  => self.start_node,
            Orientation::Reversed => self.end_node,
        }
    }

    /// The node a walk in `orientation` arrives at.
    #[inline]
    pub fn head(&self, orientation: Orientation) -> NodeId {
        match orientation {
            Orientation::Forward  => self.end_node,
            Orientation::Reversed => self.start_node,
        }
    }

    /// The edge that follows this one when walked in `orientation`.
    #[inline]
    pub fn continuation(&self, orientation: Orientation) -> EdgeId {
        match orientation {
            Orientation::Forward  => self.right_edge,
            Orientation::Reversed => self.left_edge,
        }
    }

    /// Orientation that keeps `face` on the right, preferring `Forward`.
    pub fn side_of(&self, face: FaceId) -> Option<Orientation> {
        if self.right_face == face {
            Some(Orientation::Forward)
        } else if self.left_face == face {
            Some(Orientation::Reversed)
        } else {
            None
        }
    }

    /// Append the chain in `orientation` to `out`, skipping the first point
    /// when it repeats the last point already in `out`.
    pub fn extend_chain(&self, orientation: Orientation, out: &mut Vec<Coord<f64>>) {
        let mut push = |c: Coord<f64>| {
            if out.last() != Some(&c) { out.push(c); }
        };
        match orientation {
            Orientation::Forward  => self.coords.iter().copied().for_each(&mut push),
            Orientation::Reversed => self.coords.iter().rev().copied().for_each(&mut push),
        }
    }
}

/// Entry point into one boundary loop of a face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ring {
    pub id:         RingId,
    pub face:       FaceId,
    pub start_edge: EdgeId,
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// All edge records of one tile, addressed by id.
#[derive(Clone, Debug, Default)]
pub struct EdgeTable {
    edges: AHashMap<EdgeId, Edge>,
}

impl EdgeTable {
    pub fn new(edges: impl IntoIterator<Item = Edge>) -> Self {
        Self { edges: edges.into_iter().map(|e| (e.id, e)).collect() }
    }

    #[inline] pub fn len(&self) -> usize { self.edges.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.edges.is_empty() }
    #[inline] pub fn get(&self, id: EdgeId) -> Option<&Edge> { self.edges.get(&id) }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> + '_ { self.edges.values() }
}

/// All ring records of one tile, grouped by face in ring-id order.
#[derive(Clone, Debug, Default)]
pub struct RingTable {
    rings:   Vec<Ring>,
    by_face: AHashMap<FaceId, Vec<usize>>,
}

impl RingTable {
    pub fn new(rings: impl IntoIterator<Item = Ring>) -> Self {
        let mut rings: Vec<Ring> = rings.into_iter().collect();
        rings.sort_by_key(|r| r.id);

        let mut by_face: AHashMap<FaceId, Vec<usize>> = AHashMap::new();
        for (i, ring) in rings.iter().enumerate() {
            by_face.entry(ring.face).or_default().push(i);
        }

        Self { rings, by_face }
    }

    #[inline] pub fn len(&self) -> usize { self.rings.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.rings.is_empty() }

    /// Rings bounding `face`, in ring-id order.
    pub fn rings_of(&self, face: FaceId) -> impl Iterator<Item = &Ring> + '_ {
        self.by_face.get(&face)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rings[i])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> Edge {
        Edge {
            id: EdgeId(7),
            coords: vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }],
            start_node: NodeId(1),
            end_node: NodeId(2),
            left_face: FaceId(3),
            right_face: FaceId(4),
            left_edge: EdgeId(8),
            right_edge: EdgeId(9),
        }
    }

    #[test]
    fn orientation_accessors() {
        let e = edge();
        assert_eq!(e.tail(Orientation::Forward), NodeId(1));
        assert_eq!(e.head(Orientation::Forward), NodeId(2));
        assert_eq!(e.tail(Orientation::Reversed), NodeId(2));
        assert_eq!(e.head(Orientation::Reversed), NodeId(1));
        assert_eq!(e.continuation(Orientation::Forward), EdgeId(9));
        assert_eq!(e.continuation(Orientation::Reversed), EdgeId(8));
    }

    #[test]
    fn side_of_face() {
        let e = edge();
        assert_eq!(e.side_of(FaceId(4)), Some(Orientation::Forward));
        assert_eq!(e.side_of(FaceId(3)), Some(Orientation::Reversed));
        assert_eq!(e.side_of(FaceId(5)), None);
        assert!(!e.is_spur());
    }

    #[test]
    fn extend_chain_skips_shared_point() {
        let e = edge();
        let mut out = vec![Coord { x: 1.0, y: 1.0 }];
        e.extend_chain(Orientation::Reversed, &mut out);
        assert_eq!(out, vec![
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
    }

    #[test]
    fn rings_grouped_by_face_in_id_order() {
        let rings = RingTable::new([
            Ring { id: RingId(3), face: FaceId(2), start_edge: EdgeId(30) },
            Ring { id: RingId(1), face: FaceId(2), start_edge: EdgeId(10) },
            Ring { id: RingId(2), face: FaceId(5), start_edge: EdgeId(20) },
        ]);
        let ids: Vec<_> = rings.rings_of(FaceId(2)).map(|r| r.id).collect();
        assert_eq!(ids, vec![RingId(1), RingId(3)]);
        assert_eq!(rings.rings_of(FaceId(9)).count(), 0);
        assert_eq!(rings.len(), 3);
    }

    #[test]
    fn display_ids() {
        assert_eq!(EdgeId(12).to_string(), "EdgeId(12)");
        assert_eq!(UNIVERSE_FACE.to_string(), "FaceId(1)");
    }
}
