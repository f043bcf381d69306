//! Conversion of primitive tables into winged-edge records.
//!
//! A tile (or an untiled theme) stores its primitives in a handful of
//! tables: `edg` for edges, `rng` for face rings, `end` for entity nodes
//! and `txt` for text. Their schemas are fixed by the format, so unlike
//! feature tables they are decoded into typed records here.

use std::path::Path;

use ahash::AHashMap;
use anyhow::anyhow;
use geo::Coord;
use wingedge::{Edge, EdgeId, EdgeTable, FaceId, Node, NodeId, Ring, RingId, RingTable};

use crate::error::{Error, Result};
use crate::table::{Row, Table};

pub const EDGE_TABLE: &str = "edg";
pub const RING_TABLE: &str = "rng";
pub const NODE_TABLE: &str = "end";
pub const TEXT_TABLE: &str = "txt";

/// A text primitive: the string and its anchor points.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPrimitive {
    pub id: i64,
    pub text: String,
    pub anchors: Vec<Coord<f64>>,
}

fn required_key(row: &Row<'_>, field: &str) -> anyhow::Result<i64> {
    row.key(field).ok_or_else(|| anyhow!("record {}: `{field}` is missing or not an integer", row.id()))
}

fn required_coords(row: &Row<'_>, field: &str) -> anyhow::Result<Vec<Coord<f64>>> {
    match row.coords(field) {
        Some(c) if !c.is_empty() => Ok(c.to_vec()),
        _ => Err(anyhow!("record {}: `{field}` holds no coordinates", row.id())),
    }
}

fn decode<T>(path: &Path, table: &Table, f: impl Fn(&Row<'_>) -> anyhow::Result<T>) -> Result<Vec<T>> {
    table.rows()
        .map(|row| f(&row))
        .collect::<anyhow::Result<Vec<T>>>()
        .map_err(|source| Error::io(path, table.name(), source))
}

/// Decode an `edg` table.
pub fn edge_table(path: &Path, table: &Table) -> Result<EdgeTable> {
    let edges = decode(path, table, |row| {
        let coords = required_coords(row, "coordinates")?;
        if coords.len() < 2 {
            return Err(anyhow!("record {}: an edge needs at least two coordinates", row.id()));
        }
        Ok(Edge {
            id:         EdgeId(row.id()),
            coords,
            start_node: NodeId(required_key(row, "start_node")?),
            end_node:   NodeId(required_key(row, "end_node")?),
            left_face:  FaceId(required_key(row, "left_face")?),
            right_face: FaceId(required_key(row, "right_face")?),
            left_edge:  EdgeId(required_key(row, "left_edge")?),
            right_edge: EdgeId(required_key(row, "right_edge")?),
        })
    })?;
    Ok(EdgeTable::new(edges))
}

/// Decode a `rng` table.
pub fn ring_table(path: &Path, table: &Table) -> Result<RingTable> {
    let rings = decode(path, table, |row| {
        Ok(Ring {
            id:         RingId(row.id()),
            face:       FaceId(required_key(row, "face_id")?),
            start_edge: EdgeId(required_key(row, "start_edge")?),
        })
    })?;
    Ok(RingTable::new(rings))
}

/// Decode an `end` table. A node's `coordinate` field may hold a single
/// point or a one-point chain.
pub fn node_table(path: &Path, table: &Table) -> Result<AHashMap<NodeId, Node>> {
    let nodes = decode(path, table, |row| {
        let coord = required_coords(row, "coordinate")?[0];
        Ok(Node { id: NodeId(row.id()), coord })
    })?;
    Ok(nodes.into_iter().map(|n| (n.id, n)).collect())
}

/// Decode a `txt` table.
pub fn text_table(path: &Path, table: &Table) -> Result<AHashMap<i64, TextPrimitive>> {
    let texts = decode(path, table, |row| {
        Ok(TextPrimitive {
            id: row.id(),
            text: row.text("string").unwrap_or_default().trim().to_string(),
            anchors: required_coords(row, "shape_line")?,
        })
    })?;
    Ok(texts.into_iter().map(|t| (t.id, t)).collect())
}
