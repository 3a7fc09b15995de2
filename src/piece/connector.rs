//! Connector model: the oriented attachment points of a piece.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::PieceId;
use super::catalog::ConnectorLayout;
use super::placement::Placement;
use crate::graph::NodeId;

/// Semantic name of a connector within its piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorRole {
    A,
    B,
    Common,
    Straight,
    Diverging,
}

impl ConnectorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorRole::A => "A",
            ConnectorRole::B => "B",
            ConnectorRole::Common => "COMMON",
            ConnectorRole::Straight => "STRAIGHT",
            ConnectorRole::Diverging => "DIVERGING",
        }
    }
}

impl fmt::Display for ConnectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connector identifier: owning piece plus position in its layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorId {
    pub piece: PieceId,
    pub index: usize,
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.piece, self.index)
    }
}

/// World-space pose of a connector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPose {
    pub position: Vec3,
    /// Unit vector pointing away from the piece.
    pub forward: Vec3,
}

/// One attachment point of a placed piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub id: ConnectorId,
    pub role: ConnectorRole,
    /// Graph node this connector is bound to, once the piece is in the graph.
    pub node_id: Option<NodeId>,
    pub local_position: Vec3,
    pub local_forward: Vec3,
    world: Option<WorldPose>,
}

impl Connector {
    /// A connector from a catalog layout, without a world transform yet.
    pub fn from_layout(id: ConnectorId, layout: &ConnectorLayout) -> Self {
        Self {
            id,
            role: layout.role,
            node_id: None,
            local_position: layout.local_position,
            local_forward: layout.local_forward.normalize_or_zero(),
            world: None,
        }
    }

    /// Recompute the world pose from the owning piece's placement.
    pub fn update_world(&mut self, placement: &Placement) {
        self.world = Some(WorldPose {
            position: placement.transform_point(self.local_position),
            forward: placement.transform_direction(self.local_forward),
        });
    }

    /// The resolved world pose, if the connector has been placed.
    #[inline]
    pub fn world(&self) -> Option<WorldPose> {
        self.world
    }

    #[inline]
    pub fn world_position(&self) -> Option<Vec3> {
        self.world.map(|w| w.position)
    }

    #[inline]
    pub fn world_forward(&self) -> Option<Vec3> {
        self.world.map(|w| w.forward)
    }
}
