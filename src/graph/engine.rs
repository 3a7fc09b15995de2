//! TrackGraph - Core topology store.
//!
//! The TrackGraph stores the network topology using petgraph's StableGraph and
//! keeps an R-tree of node positions so coincident connectors from different
//! pieces can be merged into one shared node.

use std::collections::HashMap;

use glam::Vec3;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use super::edge::{Edge, EdgeId};
use super::node::{Node, NodeId};
use crate::error::GraphError;
use crate::geometry::Curve;
use crate::piece::PieceId;
use crate::spatial::SpatialIndex;

/// Aggregate counters for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_length_m: f32,
}

/// Serialized form of the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// The track topology graph.
///
/// This struct manages:
/// - Graph topology via petgraph (node and edge weights carry the full records)
/// - ID mapping between stable IDs and internal indices
/// - Spatial index for coincident-node lookup
pub struct TrackGraph {
    /// The underlying graph structure. Edges point from the piece's first
    /// connector to the other end (COMMON outward for switches).
    graph: StableGraph<Node, Edge, Directed>,

    /// Map from stable NodeId to petgraph NodeIndex
    node_id_to_index: HashMap<NodeId, NodeIndex>,

    /// Map from stable EdgeId to petgraph EdgeIndex
    edge_id_to_index: HashMap<EdgeId, EdgeIndex>,

    /// Next node ID to assign
    next_node_id: u32,

    /// Next edge ID to assign
    next_edge_id: u32,

    /// Spatial index over node positions
    spatial: SpatialIndex,
}

impl TrackGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            node_id_to_index: HashMap::new(),
            edge_id_to_index: HashMap::new(),
            next_node_id: 0,
            next_edge_id: 0,
            spatial: SpatialIndex::new(),
        }
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            graph: StableGraph::with_capacity(node_capacity, edge_capacity),
            node_id_to_index: HashMap::with_capacity(node_capacity),
            edge_id_to_index: HashMap::with_capacity(edge_capacity),
            ..Self::new()
        }
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Add a node at the specified position.
    ///
    /// Always creates a new node; use [`find_node_at`](Self::find_node_at)
    /// first to reuse a coincident one.
    pub fn add_node(&mut self, position: Vec3) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.insert_node(Node::new(id, position));
        id
    }

    fn insert_node(&mut self, node: Node) {
        let index = self.graph.add_node(node);
        self.node_id_to_index.insert(node.id, index);
        self.spatial.insert(node.id, node.position);
    }

    /// Find the node closest to `position` within `tolerance_m`.
    pub fn find_node_at(&self, position: Vec3, tolerance_m: f32) -> Option<NodeId> {
        if !position.is_finite() {
            return None;
        }
        self.spatial.nearest_within(position, tolerance_m)
    }

    /// All nodes within `radius_m` of `position`.
    pub fn nodes_within(&self, position: Vec3, radius_m: f32) -> Vec<NodeId> {
        self.spatial.in_radius(position, radius_m)
    }

    /// Remove a node.
    ///
    /// Fails with [`GraphError::NodeInUse`] while any edge still references
    /// the node; remove those edges first.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let index = *self
            .node_id_to_index
            .get(&id)
            .ok_or(GraphError::UnknownNode(id))?;

        let edge_count = self.incident_edges(index).count();
        if edge_count > 0 {
            return Err(GraphError::NodeInUse {
                node: id,
                edge_count,
            });
        }

        self.node_id_to_index.remove(&id);
        let node = self.graph.remove_node(index).ok_or(GraphError::UnknownNode(id))?;
        self.spatial.remove(id, node.position);
        Ok(node)
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_id_to_index
            .get(&id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// All nodes in ascending ID order.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<_> = self
            .graph
            .node_indices()
            .filter_map(|index| self.graph.node_weight(index))
            .collect();
        nodes.sort_by_key(|node| node.id);
        nodes
    }

    /// Move a node, keeping the spatial index in sync.
    pub fn set_node_position(&mut self, id: NodeId, position: Vec3) -> Result<(), GraphError> {
        let index = *self
            .node_id_to_index
            .get(&id)
            .ok_or(GraphError::UnknownNode(id))?;
        let node = self
            .graph
            .node_weight_mut(index)
            .ok_or(GraphError::UnknownNode(id))?;

        self.spatial.remove(id, node.position);
        node.position = position;
        self.spatial.insert(id, position);
        Ok(())
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Add an edge between two existing nodes.
    ///
    /// `length_m` must be finite and non-negative.
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        length_m: f32,
        curve: Curve,
        owner: PieceId,
    ) -> Result<EdgeId, GraphError> {
        let id = EdgeId(self.next_edge_id);
        self.insert_edge(Edge {
            id,
            from_node_id: from,
            to_node_id: to,
            length_m,
            curve,
            owner_piece_id: owner,
        })?;
        self.next_edge_id += 1;
        Ok(id)
    }

    fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if !edge.length_m.is_finite() || edge.length_m < 0.0 {
            return Err(GraphError::InvalidLength {
                edge: edge.id,
                length_m: edge.length_m,
            });
        }
        let from_index = *self
            .node_id_to_index
            .get(&edge.from_node_id)
            .ok_or(GraphError::UnknownNode(edge.from_node_id))?;
        let to_index = *self
            .node_id_to_index
            .get(&edge.to_node_id)
            .ok_or(GraphError::UnknownNode(edge.to_node_id))?;

        let index = self.graph.add_edge(from_index, to_index, edge);
        self.edge_id_to_index.insert(edge.id, index);
        Ok(())
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let index = self
            .edge_id_to_index
            .remove(&id)
            .ok_or(GraphError::UnknownEdge(id))?;
        self.graph.remove_edge(index).ok_or(GraphError::UnknownEdge(id))
    }

    /// Get an edge by ID.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_id_to_index
            .get(&id)
            .and_then(|&index| self.graph.edge_weight(index))
    }

    /// All edges in ascending ID order.
    pub fn edges(&self) -> Vec<&Edge> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|index| self.graph.edge_weight(index))
            .collect();
        edges.sort_by_key(|edge| edge.id);
        edges
    }

    /// Edges generated by the given piece, in ascending ID order.
    pub fn edges_by_piece(&self, piece: PieceId) -> Vec<&Edge> {
        let mut edges = self.edges();
        edges.retain(|edge| edge.owner_piece_id == piece);
        edges
    }

    /// Edges incident on a node, in either direction.
    pub fn edges_at_node(&self, id: NodeId) -> Vec<&Edge> {
        let Some(&index) = self.node_id_to_index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.incident_edges(index).map(|e| e.weight()).collect();
        edges.sort_by_key(|edge| edge.id);
        edges.dedup_by_key(|edge| edge.id);
        edges
    }

    fn incident_edges(
        &self,
        index: NodeIndex,
    ) -> impl Iterator<Item = petgraph::stable_graph::EdgeReference<'_, Edge>> {
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
    }

    /// Get the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Node/edge counts and total track length.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            total_length_m: self
                .graph
                .edge_indices()
                .filter_map(|index| self.graph.edge_weight(index))
                .fold(0.0, |total, edge| total + edge.length_m),
        }
    }

    /// Clear all nodes and edges, resetting the graph to its initial state.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_id_to_index.clear();
        self.edge_id_to_index.clear();
        self.next_node_id = 0;
        self.next_edge_id = 0;
        self.spatial.clear();
    }

    /// Serialize every node and edge, in ascending ID order.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().into_iter().copied().collect(),
            edges: self.edges().into_iter().copied().collect(),
        }
    }

    /// Rebuild a graph from a snapshot, keeping the stored IDs.
    ///
    /// Fails if IDs repeat or an edge references a node the snapshot does not
    /// contain. New IDs continue after the largest restored one.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<Self, GraphError> {
        let mut graph = Self::with_capacity(snapshot.nodes.len(), snapshot.edges.len());

        for node in &snapshot.nodes {
            if graph.node_id_to_index.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            let index = graph.graph.add_node(*node);
            graph.node_id_to_index.insert(node.id, index);
        }
        let points: Vec<_> = snapshot.nodes.iter().map(|n| (n.id, n.position)).collect();
        graph.spatial.rebuild(&points);

        for edge in &snapshot.edges {
            if graph.edge_id_to_index.contains_key(&edge.id) {
                return Err(GraphError::DuplicateEdge(edge.id));
            }
            graph.insert_edge(*edge)?;
        }

        graph.next_node_id = snapshot.nodes.iter().map(|n| n.id.0 + 1).max().unwrap_or(0);
        graph.next_edge_id = snapshot.edges.iter().map(|e| e.id.0 + 1).max().unwrap_or(0);
        Ok(graph)
    }

    /// Replace the contents of this graph with a snapshot.
    ///
    /// On error the current contents are left untouched.
    pub fn load_snapshot(&mut self, snapshot: &GraphSnapshot) -> Result<(), GraphError> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }
}

impl Default for TrackGraph {
    fn default() -> Self {
        Self::new()
    }
}
