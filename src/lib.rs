#![doc = "Feature reconstruction from tiled winged-edge vector libraries"]
mod assemble;
mod config;
mod error;
mod feature;
mod library;
mod mosaic;
mod resolve;
mod table;
mod tile;
mod topology;

pub use wingedge;

#[doc(inline)]
pub use assemble::{Assembly, FeatureAssembler, SYMBOL_TABLE};

#[doc(inline)]
pub use config::{FilterMode, MosaicConfig, StitchMode};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use feature::{FeatureRecord, RenderHints, Signature, SignatureValue, TopologyLevel};

#[doc(inline)]
pub use library::{FeatureClass, Library, Theme, FCS_TABLE};

#[doc(inline)]
pub use mosaic::{CancelToken, MosaicResult, MosaicStitcher, Query, Unit, UnitFailure};

#[doc(inline)]
pub use resolve::{Criterion, CriterionValue, ValueResolver};

#[doc(inline)]
pub use table::{Column, JsonReader, MemoryReader, Row, Session, Table, TableReader, Value};

#[doc(inline)]
pub use tile::{Tile, TileBounds, TileIndex, FBR_TABLE, TILEREF_DIR, TILEREF_TABLE};

#[doc(inline)]
pub use topology::{edge_table, node_table, ring_table, text_table, TextPrimitive};
