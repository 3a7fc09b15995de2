//! A catalog entry placed on the board.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::PieceId;
use super::catalog::{CatalogEntry, PieceType};
use super::connector::{Connector, ConnectorId, ConnectorRole};
use super::placement::Placement;
use crate::error::PieceError;
use crate::geometry::Curve;
use crate::graph::{EdgeId, NodeId};

/// Selected route of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    Normal,
    Diverging,
}

impl SwitchState {
    pub fn toggled(self) -> Self {
        match self {
            SwitchState::Normal => SwitchState::Diverging,
            SwitchState::Diverging => SwitchState::Normal,
        }
    }
}

/// An edge a piece contributes to the graph, described by connector roles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSpec {
    pub from: ConnectorRole,
    pub to: ConnectorRole,
    pub length_m: f32,
    pub curve: Curve,
}

/// Serialized per-connector binding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSnapshot {
    pub node_id: Option<NodeId>,
}

/// Serialized form of a placed piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceSnapshot {
    pub id: PieceId,
    pub catalog_id: String,
    pub transform: Placement,
    pub generated_edge_ids: Vec<EdgeId>,
    #[serde(default)]
    pub switch_state: Option<SwitchState>,
    pub connectors: Vec<ConnectorSnapshot>,
}

/// A placed instance of a catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPiece {
    id: PieceId,
    entry: CatalogEntry,
    placement: Placement,
    connectors: Vec<Connector>,
    generated_edge_ids: Vec<EdgeId>,
    switch_state: Option<SwitchState>,
}

impl TrackPiece {
    /// Instantiate `entry` at `placement`, resolving every connector's world
    /// pose.
    pub fn new(id: PieceId, entry: CatalogEntry, placement: Placement) -> Result<Self, PieceError> {
        entry.validate()?;

        let connectors = entry
            .connectors
            .iter()
            .enumerate()
            .map(|(index, layout)| Connector::from_layout(ConnectorId { piece: id, index }, layout))
            .collect();
        let switch_state = (entry.piece_type == PieceType::Switch).then_some(SwitchState::Normal);

        let mut piece = Self {
            id,
            entry,
            placement,
            connectors,
            generated_edge_ids: Vec::new(),
            switch_state,
        };
        piece.update_connectors();
        Ok(piece)
    }

    /// Rebuild a piece from its snapshot and catalog entry.
    ///
    /// Connector node bindings and generated edge IDs are taken verbatim; the
    /// caller checks them against the graph.
    pub fn from_snapshot(snapshot: &PieceSnapshot, entry: CatalogEntry) -> Result<Self, PieceError> {
        if snapshot.connectors.len() != entry.connectors.len() {
            return Err(PieceError::ConnectorCount {
                id: entry.id.clone(),
                expected: entry.connectors.len(),
                found: snapshot.connectors.len(),
            });
        }

        let mut piece = Self::new(snapshot.id, entry, snapshot.transform)?;
        for (connector, saved) in piece.connectors.iter_mut().zip(&snapshot.connectors) {
            connector.node_id = saved.node_id;
        }
        piece.generated_edge_ids = snapshot.generated_edge_ids.clone();
        if piece.switch_state.is_some() {
            piece.switch_state = Some(snapshot.switch_state.unwrap_or(SwitchState::Normal));
        }
        Ok(piece)
    }

    pub fn snapshot(&self) -> PieceSnapshot {
        PieceSnapshot {
            id: self.id,
            catalog_id: self.entry.id.clone(),
            transform: self.placement,
            generated_edge_ids: self.generated_edge_ids.clone(),
            switch_state: self.switch_state,
            connectors: self
                .connectors
                .iter()
                .map(|c| ConnectorSnapshot { node_id: c.node_id })
                .collect(),
        }
    }

    #[inline]
    pub fn id(&self) -> PieceId {
        self.id
    }

    #[inline]
    pub fn catalog_entry(&self) -> &CatalogEntry {
        &self.entry
    }

    #[inline]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    #[inline]
    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    #[inline]
    pub fn generated_edge_ids(&self) -> &[EdgeId] {
        &self.generated_edge_ids
    }

    #[inline]
    pub fn switch_state(&self) -> Option<SwitchState> {
        self.switch_state
    }

    #[inline]
    pub fn is_switch(&self) -> bool {
        self.switch_state.is_some()
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// Replace the placement and recompute connector world poses.
    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
        self.update_connectors();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.set_placement(Placement::new(position, self.placement.rotation));
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.set_placement(Placement::new(self.placement.position, rotation));
    }

    fn update_connectors(&mut self) {
        let placement = self.placement;
        for connector in &mut self.connectors {
            connector.update_world(&placement);
        }
    }

    // =========================================================================
    // Connectors
    // =========================================================================

    pub fn connector(&self, role: ConnectorRole) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.role == role)
    }

    pub fn connector_at(&self, index: usize) -> Option<&Connector> {
        self.connectors.get(index)
    }

    /// Bind (or unbind) a connector to a graph node.
    pub(crate) fn bind_connector(&mut self, index: usize, node: Option<NodeId>) {
        if let Some(connector) = self.connectors.get_mut(index) {
            connector.node_id = node;
        }
    }

    pub(crate) fn set_generated_edges(&mut self, edges: Vec<EdgeId>) {
        self.generated_edge_ids = edges;
    }

    /// Drop an edge removed from the graph outside of detaching this piece.
    pub(crate) fn forget_edge(&mut self, edge: EdgeId) {
        self.generated_edge_ids.retain(|&e| e != edge);
    }

    /// Unbind every connector bound to `node`.
    pub(crate) fn unbind_node(&mut self, node: NodeId) {
        for connector in &mut self.connectors {
            if connector.node_id == Some(node) {
                connector.node_id = None;
            }
        }
    }

    // =========================================================================
    // Topology
    // =========================================================================

    /// Edges this piece generates. Switches list the straight route first.
    pub fn edge_specs(&self) -> Vec<EdgeSpec> {
        let arc = self.entry.arc_curve().unwrap_or(Curve::Straight);
        match self.entry.piece_type {
            PieceType::Straight => vec![EdgeSpec {
                from: ConnectorRole::A,
                to: ConnectorRole::B,
                length_m: self.entry.length_m,
                curve: Curve::Straight,
            }],
            PieceType::Curve => vec![EdgeSpec {
                from: ConnectorRole::A,
                to: ConnectorRole::B,
                length_m: arc.length_for(self.entry.length_m),
                curve: arc,
            }],
            PieceType::Switch => vec![
                EdgeSpec {
                    from: ConnectorRole::Common,
                    to: ConnectorRole::Straight,
                    length_m: self.entry.length_m,
                    curve: Curve::Straight,
                },
                EdgeSpec {
                    from: ConnectorRole::Common,
                    to: ConnectorRole::Diverging,
                    length_m: arc.length_for(self.entry.length_m),
                    curve: arc,
                },
            ],
        }
    }

    /// Flip a switch between its routes. Returns the new state, or `None` for
    /// pieces without one. The graph keeps both routes either way.
    pub fn toggle_switch(&mut self) -> Option<SwitchState> {
        self.switch_state = self.switch_state.map(SwitchState::toggled);
        self.switch_state
    }
}
