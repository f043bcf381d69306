use std::path::Path;

use ahash::AHashMap;
use tracing::debug;
use wingedge::{EdgeTable, Node, NodeId, RingTable};

use crate::error::Result;
use crate::feature::TopologyLevel;
use crate::table::{Session, TableReader};
use crate::topology::{self, TextPrimitive, EDGE_TABLE, NODE_TABLE, RING_TABLE, TEXT_TABLE};

/// Primitive records of one tile needed to build features at one level.
pub(super) enum Primitives {
    Faces { edges: EdgeTable, rings: RingTable },
    Edges(EdgeTable),
    Nodes(AHashMap<NodeId, Node>),
    Texts(AHashMap<i64, TextPrimitive>),
}

impl Primitives {
    /// Load the primitives of `level` from `dir`, or `None` when a table
    /// they need is absent.
    pub(super) fn load<R: TableReader>(session: &Session<R>, dir: &Path, level: TopologyLevel) -> Result<Option<Self>> {
        let load = |name: &str| -> Result<_> {
            let table = session.try_table(dir, name)?;
            if table.is_none() {
                debug!("no {name} table in {}; no {level} data", dir.display());
            }
            Ok(table)
        };

        Ok(match level {
            TopologyLevel::Face => {
                let (Some(edg), Some(rng)) = (load(EDGE_TABLE)?, load(RING_TABLE)?) else { return Ok(None) };
                Some(Primitives::Faces {
                    edges: topology::edge_table(dir, &edg)?,
                    rings: topology::ring_table(dir, &rng)?,
                })
            }
            TopologyLevel::Edge => match load(EDGE_TABLE)? {
                Some(edg) => Some(Primitives::Edges(topology::edge_table(dir, &edg)?)),
                None => None,
            },
            TopologyLevel::Point => match load(NODE_TABLE)? {
                Some(end) => Some(Primitives::Nodes(topology::node_table(dir, &end)?)),
                None => None,
            },
            TopologyLevel::Text => match load(TEXT_TABLE)? {
                Some(txt) => Some(Primitives::Texts(topology::text_table(dir, &txt)?)),
                None => None,
            },
        })
    }
}
