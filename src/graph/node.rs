//! Node type and related structures.
//!
//! A node is one physical connection point on the board. Each node has:
//! - A stable unique identifier (survives graph mutations and snapshots)
//! - A world-space position
//!
//! Several connectors, possibly from unrelated pieces, may bind to the same
//! node; that shared binding is how the network expresses connectivity.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Stable node identifier.
///
/// This ID remains valid even after other nodes are removed from the graph.
/// It wraps a u32 for efficient storage and WebAssembly interop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
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

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// A graph vertex: one connection point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "pos")]
    pub position: Vec3,
}

impl Node {
    #[inline]
    pub fn new(id: NodeId, position: Vec3) -> Self {
        Self { id, position }
    }
}
