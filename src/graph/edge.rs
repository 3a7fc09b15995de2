//! Edge type and related structures.
//!
//! Edges are the traversable track segments between nodes. Each edge has:
//! - A stable unique identifier
//! - Source and target node IDs
//! - Track length and curve shape
//! - The piece that generated it

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use crate::geometry::Curve;
use crate::piece::PieceId;

/// Stable edge identifier.
///
/// This ID remains valid even after other edges are removed from the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Create a new EdgeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

impl From<u32> for EdgeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<EdgeId> for u32 {
    #[inline]
    fn from(id: EdgeId) -> Self {
        id.0
    }
}

/// A graph arc: one track segment owned by a placed piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub length_m: f32,
    pub curve: Curve,
    #[serde(rename = "pieceId")]
    pub owner_piece_id: PieceId,
}

impl Edge {
    /// Whether `node` is one of this edge's endpoints.
    #[inline]
    pub fn touches(&self, node: NodeId) -> bool {
        self.from_node_id == node || self.to_node_id == node
    }

    /// The endpoint across the edge from `node`, if `node` is an endpoint.
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if self.from_node_id == node {
            Some(self.to_node_id)
        } else if self.to_node_id == node {
            Some(self.from_node_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ArcDirection;

    fn sample_edge() -> Edge {
        Edge {
            id: EdgeId(9),
            from_node_id: NodeId(1),
            to_node_id: NodeId(2),
            length_m: 0.2,
            curve: Curve::Arc {
                radius_m: 0.5,
                angle_deg: 22.5,
                direction: ArcDirection::Ccw,
            },
            owner_piece_id: PieceId(3),
        }
    }

    #[test]
    fn test_edge_id() {
        let id = EdgeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "Edge(42)");
    }

    #[test]
    fn test_edge_endpoints() {
        let edge = sample_edge();
        assert!(edge.touches(NodeId(1)));
        assert!(!edge.touches(NodeId(5)));
        assert_eq!(edge.opposite(NodeId(2)), Some(NodeId(1)));
        assert_eq!(edge.opposite(NodeId(5)), None);
    }

    #[test]
    fn test_edge_json_field_names() {
        let json = serde_json::to_value(sample_edge()).unwrap();
        assert_eq!(json["fromNodeId"], 1);
        assert_eq!(json["toNodeId"], 2);
        assert_eq!(json["pieceId"], 3);
        assert_eq!(json["curve"]["type"], "arc");
    }
}
