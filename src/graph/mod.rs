//! Track topology graph.
//!
//! This module provides the node/edge store using petgraph's StableGraph for
//! stable indices under interactive add/remove, with an R-tree over node
//! positions so coincident connectors can share a node.

mod edge;
mod engine;
mod node;

pub use edge::{Edge, EdgeId};
pub use engine::{GraphSnapshot, GraphStats, TrackGraph};
pub use node::{Node, NodeId};
