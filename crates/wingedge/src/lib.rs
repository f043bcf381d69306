pub mod error;
pub mod walk;
pub mod winged;

pub use error::TopologyError;
pub use walk::{resolve_orientation, traverse_face, traverse_ring, RingWalk, Step};
pub use winged::{Edge, EdgeId, EdgeTable, FaceId, Node, NodeId, Orientation, Ring, RingId, RingTable, UNIVERSE_FACE};
