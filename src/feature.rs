//! Output records and the topology levels they are built at.

use std::fmt;

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::table::Value;

// ---------------------------------------------------------------------------
// Topology levels
// ---------------------------------------------------------------------------

/// Kind of primitive a feature table is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyLevel {
    Face,
    Edge,
    Point,
    Text,
}

impl TopologyLevel {
    pub const ALL: [TopologyLevel; 4] = [Self::Face, Self::Edge, Self::Point, Self::Text];

    /// Primitive table holding the entities of this level.
    pub fn entity_table(self) -> &'static str {
        match self {
            Self::Face  => "fac",
            Self::Edge  => "edg",
            Self::Point => "end",
            Self::Text  => "txt",
        }
    }

    /// Foreign key column linking feature rows to entities.
    pub fn key_field(self) -> &'static str {
        match self {
            Self::Face  => "fac_id",
            Self::Edge  => "edg_id",
            Self::Point => "end_id",
            Self::Text  => "txt_id",
        }
    }

    /// File extension of feature tables at this level.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Face  => "aft",
            Self::Edge  => "lft",
            Self::Point => "pft",
            Self::Text  => "tft",
        }
    }

    /// Level of a feature table, from its extension (`roadl.lft` -> Edge).
    pub fn from_feature_table(name: &str) -> Option<Self> {
        let (_, ext) = name.trim().rsplit_once('.')?;
        Self::ALL.into_iter().find(|level| ext.eq_ignore_ascii_case(level.extension()))
    }
}

impl fmt::Display for TopologyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Face  => "face",
            Self::Edge  => "edge",
            Self::Point => "point",
            Self::Text  => "text",
        })
    }
}

/// True for feature table columns that link rows rather than describe them.
pub(crate) fn is_link_column(name: &str) -> bool {
    let name = name.trim().to_ascii_lowercase();
    name == "id" || name == "tile_id" || TopologyLevel::ALL.iter().any(|l| l.key_field() == name)
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// One attribute value in a [`Signature`], comparable and hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureValue {
    Null,
    Number(u64), // normalized f64 bits
    Text(String),
}

impl SignatureValue {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Number(n) => Some(Self::Number(if *n == 0.0 { 0.0f64.to_bits() } else { n.to_bits() })),
            Value::Text(s) => Some(Self::Text(s.trim().to_string())),
            Value::Coords(_) => None,
        }
    }
}

/// The descriptive attribute values of a feature row, in column order.
/// Entities whose rows share a signature become one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(pub Vec<SignatureValue>);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Presentation of a text feature.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderHints {
    /// Symbol size from `symbol.rat`.
    pub size: Option<f64>,
    /// Symbol color code from `symbol.rat`.
    pub color: Option<i64>,
    /// Bearing of the text baseline, counter-clockwise from east.
    pub rotation_degrees: f64,
}

/// One assembled feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub level: TopologyLevel,
    pub feature_table: String,
    /// Parts, one coordinate list each. Face parts are closed rings.
    pub rings: Vec<Vec<Coord<f64>>>,
    pub tag: String,
    /// The text of a text feature.
    pub label: Option<String>,
    pub render: Option<RenderHints>,
    pub signature: Signature,
    /// Contributing tile ids, ascending.
    pub tiles: Vec<i64>,
    /// For faces: number of rings of each polygon, outer ring first.
    pub polygons: Vec<usize>,
}

impl FeatureRecord {
    #[inline] pub fn part_count(&self) -> usize { self.rings.len() }

    /// Total number of coordinates over all parts.
    pub fn coord_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    /// Merge the parts of `other`, a record of the same group from another tile.
    pub fn absorb(&mut self, other: FeatureRecord) {
        self.rings.extend(other.rings);
        self.polygons.extend(other.polygons);
        self.tiles.extend(other.tiles);
        self.tiles.sort_unstable();
        self.tiles.dedup();
    }

    /// All parts in one list, separated by a `(NaN, NaN)` break.
    pub fn flatten_with_breaks(&self) -> Vec<Coord<f64>> {
        let brk = Coord { x: f64::NAN, y: f64::NAN };
        let mut out = Vec::with_capacity(self.coord_count() + self.rings.len());
        for (i, ring) in self.rings.iter().enumerate() {
            if i > 0 { out.push(brk); }
            out.extend_from_slice(ring);
        }
        out
    }

    /// Convert to a `geo` geometry: faces to a MultiPolygon, edges to a
    /// MultiLineString, points and text anchors to a MultiPoint.
    pub fn to_geometry(&self) -> Geometry<f64> {
        match self.level {
            TopologyLevel::Face => {
                let mut rings = self.rings.iter().cloned().map(LineString::new);
                let mut polygons = Vec::with_capacity(self.polygons.len());
                for &count in &self.polygons {
                    let Some(exterior) = rings.next() else { break };
                    let interiors: Vec<_> = rings.by_ref().take(count.saturating_sub(1)).collect();
                    polygons.push(Polygon::new(exterior, interiors));
                }
                Geometry::MultiPolygon(MultiPolygon::new(polygons))
            }
            TopologyLevel::Edge => Geometry::MultiLineString(MultiLineString::new(
                self.rings.iter().cloned().map(LineString::new).collect(),
            )),
            TopologyLevel::Point | TopologyLevel::Text => Geometry::MultiPoint(MultiPoint::from(
                self.rings.iter().flatten().copied().collect::<Vec<_>>(),
            )),
        }
    }
}
