//! R-tree of graph node positions (rstar), queried when a connector lands
//! and needs the node it coincides with.

use glam::Vec3;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::graph::NodeId;

/// Indexed node position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePoint {
    pub id: NodeId,
    pub position: [f32; 3],
}

impl NodePoint {
    pub fn new(id: NodeId, position: Vec3) -> Self {
        Self {
            id,
            position: position.to_array(),
        }
    }
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for NodePoint {
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        Vec3::from_array(self.position).distance_squared(Vec3::from_array(*point))
    }
}

/// 3D point index over graph nodes.
pub struct SpatialIndex {
    tree: RTree<NodePoint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, id: NodeId, position: Vec3) {
        self.tree.insert(NodePoint::new(id, position));
    }

    /// Remove a node from the index.
    ///
    /// `position` must be the position the node was inserted with.
    /// Returns true if the node was found and removed.
    pub fn remove(&mut self, id: NodeId, position: Vec3) -> bool {
        self.tree.remove(&NodePoint::new(id, position)).is_some()
    }

    /// Closest node no further than `max_distance` from `position`.
    pub fn nearest_within(&self, position: Vec3, max_distance: f32) -> Option<NodeId> {
        let query = position.to_array();
        let max_distance_sq = max_distance * max_distance;
        self.tree
            .nearest_neighbor(&query)
            .filter(|point| point.distance_2(&query) <= max_distance_sq)
            .map(|point| point.id)
    }

    /// Every node within `radius` of `position`, in no particular order.
    pub fn in_radius(&self, position: Vec3, radius: f32) -> Vec<NodeId> {
        self.tree
            .locate_within_distance(position.to_array(), radius * radius)
            .map(|point| point.id)
            .collect()
    }

    /// Replace the contents with a bulk-loaded tree, used after loading a
    /// snapshot.
    pub fn rebuild(&mut self, points: &[(NodeId, Vec3)]) {
        let node_points: Vec<_> = points
            .iter()
            .map(|&(id, position)| NodePoint::new(id, position))
            .collect();

        self.tree = RTree::bulk_load(node_points);
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
