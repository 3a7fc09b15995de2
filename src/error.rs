//! Error types for the track layout core.
//!
//! Each subsystem has its own error enum so callers can tell a degenerate arc
//! (recoverable, fall back to a straight segment) from a broken graph
//! invariant (the operation must stop).

use crate::graph::{EdgeId, NodeId};
use crate::piece::PieceId;

/// Degenerate arc input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("chord of {chord_m:.4}m exceeds arc diameter {diameter_m:.4}m")]
    ChordExceedsDiameter { chord_m: f32, diameter_m: f32 },

    #[error("zero-length chord between arc endpoints")]
    ZeroLengthChord,

    #[error("invalid arc radius {0}")]
    InvalidRadius(f32),

    #[error("non-finite arc input")]
    NonFinite,
}

/// Topology invariant violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown {0}")]
    UnknownNode(NodeId),

    #[error("unknown {0}")]
    UnknownEdge(EdgeId),

    #[error("{node} is still referenced by {edge_count} edge(s)")]
    NodeInUse { node: NodeId, edge_count: usize },

    #[error("duplicate {0} in snapshot")]
    DuplicateNode(NodeId),

    #[error("duplicate {0} in snapshot")]
    DuplicateEdge(EdgeId),

    #[error("{edge} has invalid length {length_m}")]
    InvalidLength { edge: EdgeId, length_m: f32 },
}

/// Connector transform that cannot be snapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapError {
    #[error("connector {0} has no resolved world transform")]
    UnresolvedTransform(String),

    #[error("connector {0} has a zero-length or non-finite forward vector")]
    DegenerateForward(String),
}

/// Invalid catalog entry or piece layout.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PieceError {
    #[error("catalog entry '{id}' needs {expected} connectors, found {found}")]
    ConnectorCount {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("catalog entry '{id}' is missing connector role {role}")]
    MissingRole { id: String, role: &'static str },

    #[error("catalog entry '{0}' needs a positive curve radius and angle")]
    MissingCurveParameters(String),

    #[error("catalog entry '{0}' has a zero-length connector forward")]
    DegenerateConnector(String),

    #[error("catalog entry '{id}' has invalid length {length_m}")]
    InvalidLength { id: String, length_m: f32 },
}

/// Orchestrator-level error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Piece(#[from] PieceError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Snap(#[from] SnapError),

    #[error("unknown catalog entry '{0}'")]
    UnknownCatalogEntry(String),

    #[error("unknown {0}")]
    UnknownPiece(PieceId),

    #[error("duplicate {0} in snapshot")]
    DuplicatePiece(PieceId),

    #[error("{edge} is listed by {piece} but owned by another piece")]
    ForeignEdge { edge: EdgeId, piece: PieceId },

    #[error("placement at ({x:.3}, {z:.3}) is outside the board")]
    OutOfBounds { x: f32, z: f32 },
}

pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_messages() {
        let err = GraphError::NodeInUse {
            node: NodeId(3),
            edge_count: 2,
        };
        assert_eq!(err.to_string(), "Node(3) is still referenced by 2 edge(s)");
        assert_eq!(GraphError::UnknownEdge(EdgeId(7)).to_string(), "unknown Edge(7)");
    }

    #[test]
    fn test_track_error_wraps_graph_error() {
        let err: TrackError = GraphError::UnknownNode(NodeId(1)).into();
        assert_eq!(err.to_string(), "unknown Node(1)");
        assert!(matches!(err, TrackError::Graph(GraphError::UnknownNode(_))));
    }
}
