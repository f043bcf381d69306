//! Ring and face boundary tracing.
//!
//! A walk starts on a ring's start edge, appends each edge's chain in the
//! direction that keeps the face on the right, and follows the continuation
//! pointers until it is back on the start edge in its start orientation.
//! A well-formed ring uses each edge at most once per orientation, so a walk
//! is cut off after twice the size of the edge table; corrupt pointers end in
//! [`TopologyError::StepLimit`] instead of looping.

use geo::Coord;

use crate::error::TopologyError;
use crate::winged::{Edge, EdgeId, EdgeTable, FaceId, NodeId, Orientation, RingTable, UNIVERSE_FACE};

/// One edge visited by a [`RingWalk`], with the direction it was walked in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub edge:        EdgeId,
    pub orientation: Orientation,
}

/// Decide the orientation of `edge`, reached from `previous` whose walk
/// ended at `trailing`, while tracing `face`.
///
/// Rules are tried in order:
/// 1. a spur entered from another edge uses its self-referencing
///    continuation: `right_edge == edge` means the dangle is at the end
///    node (Forward), `left_edge == edge` means it is at the start node
///    (Reversed);
/// 2. the endpoint that matches `trailing` becomes the tail;
/// 3. the side on which `face` lies (right before left);
/// 4. otherwise the edge cannot be oriented.
pub fn resolve_orientation(
    edge:     &Edge,
    face:     FaceId,
    previous: EdgeId,
    trailing: NodeId,
) -> Result<Orientation, TopologyError> {
    if edge.is_spur() && edge.id != previous {
        match (edge.right_edge == edge.id, edge.left_edge == edge.id) {
            (true, false) => return Ok(Orientation::Forward),
            (false, true) => return Ok(Orientation::Reversed),
            _ => {}
        }
    }

    match (edge.tail(Orientation::Forward) == trailing, edge.tail(Orientation::Reversed) == trailing) {
        (true, false) => return Ok(Orientation::Forward),
        (false, true) => return Ok(Orientation::Reversed),
        _ => {}
    }

    edge.side_of(face).ok_or(TopologyError::Unresolved { face, edge: edge.id })
}

// ---------------------------------------------------------------------------
// Iterator
// ---------------------------------------------------------------------------

/// Iterator over the steps of one ring, ending just before the start step
/// would repeat. Yields at most one error, after which it is exhausted.
pub struct RingWalk<'a> {
    edges:   &'a EdgeTable,
    face:    FaceId,
    start:   Step,
    next:    Option<Result<Step, TopologyError>>,
    visited: usize,
}

impl<'a> RingWalk<'a> {
    pub fn new(edges: &'a EdgeTable, start: EdgeId, face: FaceId) -> Result<Self, TopologyError> {
        let edge = edges.get(start)
            .ok_or(TopologyError::MissingEdge { face, edge: start })?;
        let orientation = edge.side_of(face)
            .ok_or(TopologyError::NotOnFace { face, edge: start })?;
        let start = Step { edge: start, orientation };

        Ok(Self { edges, face, start, next: Some(Ok(start)), visited: 0 })
    }

    /// Work out the step after `step`, or the error that ends the walk.
    fn follow(&self, step: Step) -> Option<Result<Step, TopologyError>> {
        let face = self.face;
        let Some(edge) = self.edges.get(step.edge) else {
            return Some(Err(TopologyError::MissingEdge { face, edge: step.edge }));
        };

        let next_id = edge.continuation(step.orientation);
        let Some(next) = self.edges.get(next_id) else {
            return Some(Err(TopologyError::MissingEdge { face, edge: next_id }));
        };

        let orientation = match resolve_orientation(next, face, step.edge, edge.head(step.orientation)) {
            Ok(orientation) => orientation,
            Err(e) => return Some(Err(e)),
        };

        let following = Step { edge: next_id, orientation };
        if following == self.start {
            None
        } else if self.visited >= 2 * self.edges.len() {
            Some(Err(TopologyError::StepLimit { face, edge: step.edge, steps: self.visited }))
        } else {
            Some(Ok(following))
        }
    }
}

impl<'a> Iterator for RingWalk<'a> {
    type Item = Result<Step, TopologyError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next.take()? {
            Err(e) => Some(Err(e)),
            Ok(step) => {
                self.visited += 1;
                self.next = self.follow(step);
                Some(Ok(step))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Trace the ring entered at `start` around `face` into a closed coordinate
/// sequence. Points shared by consecutive edges appear once.
pub fn traverse_ring(start: EdgeId, face: FaceId, edges: &EdgeTable) -> Result<Vec<Coord<f64>>, TopologyError> {
    let mut ring = Vec::new();

    for step in RingWalk::new(edges, start, face)? {
        let step = step?;
        let edge = edges.get(step.edge)
            .ok_or(TopologyError::MissingEdge { face, edge: step.edge })?;
        edge.extend_chain(step.orientation, &mut ring);
    }

    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if first != last { ring.push(first); }
    }

    Ok(ring)
}

/// Trace every ring of `face`. The universe face yields no rings.
///
/// Rings come back in ring-id order as separate parts; the first is the
/// outer boundary when the source follows the usual convention, the rest
/// are holes.
pub fn traverse_face(face: FaceId, rings: &RingTable, edges: &EdgeTable) -> Result<Vec<Vec<Coord<f64>>>, TopologyError> {
    if face == UNIVERSE_FACE {
        return Ok(Vec::new());
    }

    rings.rings_of(face)
        .map(|ring| traverse_ring(ring.start_edge, face, edges))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
