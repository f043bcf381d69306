use thiserror::Error;

use crate::winged::{EdgeId, FaceId};

/// Errors raised while tracing a face boundary.
///
/// Every variant names the face being traced and the edge at which the walk
/// stopped, so a caller can skip the face and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The ring's start edge has the face on neither side.
    #[error("start {edge} does not bound {face}")]
    NotOnFace { face: FaceId, edge: EdgeId },

    /// No rule of the orientation cascade applied to a continuing edge.
    #[error("cannot orient {edge} while tracing {face}")]
    Unresolved { face: FaceId, edge: EdgeId },

    /// The walk did not return to its start edge within the step guard.
    #[error("ring of {face} did not close after {steps} steps (last {edge})")]
    StepLimit { face: FaceId, edge: EdgeId, steps: usize },

    /// A continuation pointer names an edge absent from the table.
    #[error("{edge} referenced while tracing {face} is missing")]
    MissingEdge { face: FaceId, edge: EdgeId },
}

impl TopologyError {
    pub fn face(&self) -> FaceId {
        match self {
            Self::NotOnFace { face, .. }
            | Self::Unresolved { face, .. }
            | Self::StepLimit { face, .. }
            | Self::MissingEdge { face, .. } => *face,
        }
    }

    pub fn edge(&self) -> EdgeId {
        match self {
            Self::NotOnFace { edge, .. }
            | Self::Unresolved { edge, .. }
            | Self::StepLimit { edge, .. }
            | Self::MissingEdge { edge, .. } => *edge,
        }
    }
}
