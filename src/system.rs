//! TrackSystem - orchestrates placement, graph mutation and snapping.
//!
//! The system owns the graph, the snap helper, the catalog and every placed
//! piece, and is the only place where pieces and graph are kept in step:
//! connectors are bound to nodes when a piece is attached, and released (with
//! nodes nobody else uses) when it is detached.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result, SnapError, TrackError};
use crate::geometry::{Curve, MAX_SEGMENTS, PathSample, sample_curve};
use crate::graph::{EdgeId, GraphSnapshot, GraphStats, NodeId, TrackGraph};
use crate::piece::{
    Catalog, CatalogEntry, ConnectorId, ConnectorRole, PieceId, PieceSnapshot, Placement,
    SwitchState, TrackPiece,
};
use crate::snap::{ConnectionCheck, SnapCandidate, SnapConfig, SnapHelper, is_position_in_bounds};

/// Configuration for a track system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackConfig {
    /// Board extent along X, centered on the origin.
    pub board_width_m: f32,
    /// Board extent along Z, centered on the origin.
    pub board_depth_m: f32,
    /// Connectors closer than this share a graph node.
    pub node_merge_tolerance_m: f32,
    /// Sampling density for [`TrackSystem::sample_edge`].
    pub segments_per_meter: f32,
    pub snap: SnapConfig,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            board_width_m: 2.0,
            board_depth_m: 1.0,
            node_merge_tolerance_m: 0.001,
            segments_per_meter: 40.0,
            snap: SnapConfig::default(),
        }
    }
}

/// A snap the system would perform for a piece being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapPreview {
    /// Placement that joins the two connectors.
    pub placement: Placement,
    /// Index of the joining connector on the new piece.
    pub connector_index: usize,
    pub connector_role: ConnectorRole,
    pub target: ConnectorId,
    pub target_role: ConnectorRole,
    /// Distance between the connectors before snapping.
    pub distance_m: f32,
    /// Validation of the joined connectors.
    pub check: ConnectionCheck,
}

/// Result of dropping a piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPiece {
    pub piece_id: PieceId,
    pub snapped: Option<SnapPreview>,
}

/// Serialized form of a whole layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub graph: GraphSnapshot,
    pub pieces: Vec<PieceSnapshot>,
}

/// The track layout: graph, pieces, catalog and snapping in one place.
pub struct TrackSystem {
    config: TrackConfig,
    graph: TrackGraph,
    snap: SnapHelper,
    catalog: Catalog,
    pieces: Vec<TrackPiece>,
    next_piece_id: u32,
}

impl TrackSystem {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            graph: TrackGraph::new(),
            snap: SnapHelper::new(config.snap),
            catalog: Catalog::new(),
            pieces: Vec::new(),
            next_piece_id: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    #[inline]
    pub fn graph(&self) -> &TrackGraph {
        &self.graph
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    pub fn snap_helper(&self) -> &SnapHelper {
        &self.snap
    }

    /// Placed pieces in placement order.
    #[inline]
    pub fn pieces(&self) -> &[TrackPiece] {
        &self.pieces
    }

    pub fn piece(&self, id: PieceId) -> Option<&TrackPiece> {
        self.pieces.iter().find(|piece| piece.id() == id)
    }

    pub fn register_catalog_entry(&mut self, entry: CatalogEntry) -> Result<()> {
        self.catalog.insert(entry)?;
        Ok(())
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// Place a piece exactly at `placement` and connect it to any coincident
    /// connectors.
    pub fn place_piece(&mut self, catalog_id: &str, placement: Placement) -> Result<PieceId> {
        self.check_bounds(&placement)?;
        let mut piece = self.build_piece(catalog_id, placement)?;
        attach(&mut self.graph, self.config.node_merge_tolerance_m, &mut piece)?;

        let id = piece.id();
        self.next_piece_id += 1;
        self.pieces.push(piece);
        tracing::debug!(piece = %id, catalog_id, "placed piece");
        Ok(id)
    }

    /// Work out the snap a drop at `placement` would produce, without
    /// changing anything.
    ///
    /// Each connector of the would-be piece looks for the closest free
    /// connector; the closest pair overall wins.
    pub fn preview_snap(&self, catalog_id: &str, placement: Placement) -> Result<Option<SnapPreview>> {
        let piece = self.build_piece(catalog_id, placement)?;
        Ok(self.snap_for(&piece))
    }

    /// Drop a piece: snap it to the best nearby connector when the snapped
    /// connection validates, otherwise place it where it was dropped.
    pub fn place_piece_snapped(&mut self, catalog_id: &str, placement: Placement) -> Result<PlacedPiece> {
        let snapped = self
            .preview_snap(catalog_id, placement)?
            .filter(|preview| preview.check.valid);
        let final_placement = snapped.map_or(placement, |preview| preview.placement);
        let piece_id = self.place_piece(catalog_id, final_placement)?;
        Ok(PlacedPiece { piece_id, snapped })
    }

    /// Snap an already placed piece (excluded from its own search).
    pub fn preview_snap_for_piece(&self, id: PieceId) -> Option<SnapPreview> {
        self.piece(id).and_then(|piece| self.snap_for(piece))
    }

    fn snap_for(&self, piece: &TrackPiece) -> Option<SnapPreview> {
        let (connector_index, candidate) = piece
            .connectors()
            .iter()
            .enumerate()
            .filter_map(|(index, connector)| {
                let position = connector.world_position()?;
                self.snap
                    .best_snap_candidate(position, &self.pieces, Some(piece.id()))
                    .map(|candidate| (index, candidate))
            })
            .min_by(|(_, a), (_, b)| a.distance_m.total_cmp(&b.distance_m))?;

        let joining = &piece.connectors()[connector_index];
        let placement = match self.snap.compute_snap_transform(joining, candidate.connector) {
            Ok(placement) => placement,
            Err(err) => {
                tracing::warn!(%err, "snap rejected");
                return None;
            }
        };

        let mut snapped = piece.clone();
        snapped.set_placement(placement);
        let check = self
            .snap
            .validate_connection(&snapped.connectors()[connector_index], candidate.connector);
        if let Some(reason) = check.reason {
            tracing::warn!(%reason, "snapped connection failed validation");
        }

        Some(SnapPreview {
            placement,
            connector_index,
            connector_role: joining.role,
            target: candidate.connector.id,
            target_role: candidate.connector.role,
            distance_m: candidate.distance_m,
            check,
        })
    }

    /// Move a placed piece, re-syncing its graph nodes and edges.
    pub fn move_piece(&mut self, id: PieceId, placement: Placement) -> Result<()> {
        self.check_bounds(&placement)?;
        let index = self.piece_index(id)?;

        let mut piece = self.pieces.remove(index);
        detach(&mut self.graph, &self.pieces, &mut piece);
        piece.set_placement(placement);
        let result = attach(&mut self.graph, self.config.node_merge_tolerance_m, &mut piece);
        self.pieces.insert(index, piece);
        result
    }

    /// Move a placed piece, keeping its rotation.
    pub fn set_position(&mut self, id: PieceId, position: Vec3) -> Result<()> {
        let rotation = self
            .piece(id)
            .ok_or(TrackError::UnknownPiece(id))?
            .placement()
            .rotation;
        self.move_piece(id, Placement::new(position, rotation))
    }

    /// Remove a piece, its edges and every node no other piece still uses.
    pub fn remove_piece(&mut self, id: PieceId) -> Result<TrackPiece> {
        let index = self.piece_index(id)?;
        let mut piece = self.pieces.remove(index);
        detach(&mut self.graph, &self.pieces, &mut piece);
        tracing::debug!(piece = %id, "removed piece");
        Ok(piece)
    }

    /// Flip a switch's selected route. The graph keeps both routes.
    pub fn toggle_switch(&mut self, id: PieceId) -> Result<Option<SwitchState>> {
        let index = self.piece_index(id)?;
        Ok(self.pieces[index].toggle_switch())
    }

    /// The generated edge of a piece's selected route: its only edge for
    /// simple pieces, the edge toward STRAIGHT or DIVERGING for switches.
    /// `None` once that edge has been removed.
    pub fn active_edge(&self, id: PieceId) -> Result<Option<EdgeId>> {
        let piece = self.piece(id).ok_or(TrackError::UnknownPiece(id))?;
        let role = match piece.switch_state() {
            None => return Ok(piece.generated_edge_ids().first().copied()),
            Some(SwitchState::Normal) => ConnectorRole::Straight,
            Some(SwitchState::Diverging) => ConnectorRole::Diverging,
        };
        let Some(target) = piece.connector(role).and_then(|c| c.node_id) else {
            return Ok(None);
        };
        Ok(piece.generated_edge_ids().iter().copied().find(|&edge| {
            self.graph
                .edge(edge)
                .is_some_and(|edge| edge.to_node_id == target)
        }))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn find_nearby_connectors(&self, position: Vec3, exclude: Option<PieceId>) -> Vec<SnapCandidate<'_>> {
        self.snap.find_nearby_connectors(position, &self.pieces, exclude)
    }

    pub fn best_snap_candidate(&self, position: Vec3, exclude: Option<PieceId>) -> Option<SnapCandidate<'_>> {
        self.snap.best_snap_candidate(position, &self.pieces, exclude)
    }

    pub fn is_position_in_bounds(&self, position: Vec3) -> bool {
        is_position_in_bounds(position, self.config.board_width_m, self.config.board_depth_m)
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }

    /// Render samples along an edge, from its start node to its end node.
    ///
    /// Without an explicit `segment_count` the density comes from
    /// [`TrackConfig::segments_per_meter`].
    pub fn sample_edge(&self, id: EdgeId, segment_count: Option<usize>) -> Result<Vec<PathSample>> {
        let edge = self.graph.edge(id).ok_or(GraphError::UnknownEdge(id))?;
        let start = self.node_position(edge.from_node_id)?;
        let end = self.node_position(edge.to_node_id)?;

        let segments = segment_count.unwrap_or_else(|| {
            let density = match edge.curve {
                Curve::Straight => 1.0,
                Curve::Arc { .. } => self.config.segments_per_meter,
            };
            (edge.length_m * density).ceil().clamp(1.0, MAX_SEGMENTS as f32) as usize
        });
        Ok(sample_curve(start, end, &edge.curve, segments).collect())
    }

    fn node_position(&self, id: NodeId) -> Result<Vec3> {
        Ok(self.graph.node(id).ok_or(GraphError::UnknownNode(id))?.position)
    }

    // =========================================================================
    // Direct graph access
    // =========================================================================

    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        length_m: f32,
        curve: Curve,
        owner: PieceId,
    ) -> Result<EdgeId> {
        Ok(self
            .graph
            .add_edge(from, to, length_m, curve, owner)
            .inspect_err(log_invariant)?)
    }

    /// Remove an edge and drop it from its owning piece's edge list.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<()> {
        let edge = self.graph.remove_edge(id).inspect_err(log_invariant)?;
        if let Some(owner) = self.pieces.iter_mut().find(|p| p.id() == edge.owner_piece_id) {
            owner.forget_edge(id);
        }
        Ok(())
    }

    /// Remove a node no edge references, unbinding every connector bound to
    /// it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.graph.remove_node(id).inspect_err(log_invariant)?;
        for piece in &mut self.pieces {
            piece.unbind_node(id);
        }
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            graph: self.graph.to_snapshot(),
            pieces: self.pieces.iter().map(TrackPiece::snapshot).collect(),
        }
    }

    /// Replace the layout with a snapshot. Pieces are rebuilt from the
    /// registered catalog. On error nothing changes.
    pub fn restore(&mut self, snapshot: &LayoutSnapshot) -> Result<()> {
        let graph = TrackGraph::from_snapshot(&snapshot.graph)?;

        let mut pieces: Vec<TrackPiece> = Vec::with_capacity(snapshot.pieces.len());
        for saved in &snapshot.pieces {
            if pieces.iter().any(|p| p.id() == saved.id) {
                return Err(TrackError::DuplicatePiece(saved.id));
            }
            let entry = self
                .catalog
                .get(&saved.catalog_id)
                .ok_or_else(|| TrackError::UnknownCatalogEntry(saved.catalog_id.clone()))?
                .clone();
            let piece = TrackPiece::from_snapshot(saved, entry)?;

            if let Some(node) = piece
                .connectors()
                .iter()
                .filter_map(|c| c.node_id)
                .find(|&node| graph.node(node).is_none())
            {
                return Err(GraphError::UnknownNode(node).into());
            }
            for &edge in piece.generated_edge_ids() {
                let owner = graph
                    .edge(edge)
                    .ok_or(GraphError::UnknownEdge(edge))?
                    .owner_piece_id;
                if owner != piece.id() {
                    return Err(TrackError::ForeignEdge {
                        edge,
                        piece: piece.id(),
                    });
                }
            }
            pieces.push(piece);
        }

        self.next_piece_id = pieces.iter().map(|p| p.id().0 + 1).max().unwrap_or(0);
        self.graph = graph;
        self.pieces = pieces;
        Ok(())
    }

    /// Remove every piece, node and edge. The catalog is kept.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.pieces.clear();
        self.next_piece_id = 0;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn build_piece(&self, catalog_id: &str, placement: Placement) -> Result<TrackPiece> {
        let entry = self
            .catalog
            .get(catalog_id)
            .ok_or_else(|| TrackError::UnknownCatalogEntry(catalog_id.to_string()))?;
        Ok(TrackPiece::new(PieceId(self.next_piece_id), entry.clone(), placement)?)
    }

    fn piece_index(&self, id: PieceId) -> Result<usize> {
        self.pieces
            .iter()
            .position(|piece| piece.id() == id)
            .ok_or(TrackError::UnknownPiece(id))
    }

    fn check_bounds(&self, placement: &Placement) -> Result<()> {
        if placement.is_finite() && self.is_position_in_bounds(placement.position) {
            Ok(())
        } else {
            Err(TrackError::OutOfBounds {
                x: placement.position.x,
                z: placement.position.z,
            })
        }
    }
}

impl Default for TrackSystem {
    fn default() -> Self {
        Self::new(TrackConfig::default())
    }
}

fn log_invariant(err: &GraphError) {
    tracing::error!(%err, "graph invariant violated");
}

/// Bind every connector of `piece` to a node (merging with coincident nodes)
/// and create its edges.
fn attach(graph: &mut TrackGraph, tolerance_m: f32, piece: &mut TrackPiece) -> Result<()> {
    for index in 0..piece.connectors().len() {
        let connector = &piece.connectors()[index];
        let position = connector
            .world_position()
            .ok_or_else(|| SnapError::UnresolvedTransform(connector.id.to_string()))?;

        let node = match graph.find_node_at(position, tolerance_m) {
            Some(node) => {
                tracing::debug!(%node, connector = %connector.id, "merged connector into node");
                node
            }
            None => graph.add_node(position),
        };
        piece.bind_connector(index, Some(node));
    }

    let mut edges = Vec::new();
    for spec in piece.edge_specs() {
        let from = bound_node(piece, spec.from)?;
        let to = bound_node(piece, spec.to)?;
        let edge = graph
            .add_edge(from, to, spec.length_m, spec.curve, piece.id())
            .inspect_err(log_invariant)?;
        edges.push(edge);
    }
    piece.set_generated_edges(edges);
    Ok(())
}

fn bound_node(piece: &TrackPiece, role: ConnectorRole) -> Result<NodeId> {
    piece
        .connector(role)
        .and_then(|c| c.node_id)
        .ok_or_else(|| SnapError::UnresolvedTransform(format!("{}:{role}", piece.id())).into())
}

/// Remove the piece's edges and unbind its connectors, deleting nodes that no
/// connector of `others` and no remaining edge still uses.
///
/// Edges and nodes already gone from the graph count as released.
fn detach(graph: &mut TrackGraph, others: &[TrackPiece], piece: &mut TrackPiece) {
    for &edge in piece.generated_edge_ids() {
        if graph.remove_edge(edge).is_err() {
            tracing::debug!(%edge, piece = %piece.id(), "edge already removed");
        }
    }
    piece.set_generated_edges(Vec::new());

    for index in 0..piece.connectors().len() {
        let Some(node) = piece.connectors()[index].node_id else {
            continue;
        };
        piece.bind_connector(index, None);

        let still_used = piece.connectors().iter().any(|c| c.node_id == Some(node))
            || others
                .iter()
                .flat_map(|other| other.connectors())
                .any(|c| c.node_id == Some(node));
        if !still_used && graph.node(node).is_some() && graph.edges_at_node(node).is_empty() {
            if let Err(err) = graph.remove_node(node) {
                log_invariant(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ArcDirection;

    fn system() -> TrackSystem {
        let mut system = TrackSystem::default();
        system
            .register_catalog_entry(CatalogEntry::straight("G1", 0.168))
            .unwrap();
        system
            .register_catalog_entry(CatalogEntry::curve("R1", 0.358, 30.0, ArcDirection::Ccw))
            .unwrap();
        system
            .register_catalog_entry(CatalogEntry::switch("WL", 0.168, 0.438, 22.5, ArcDirection::Ccw))
            .unwrap();
        system
    }

    #[test]
    fn test_two_straights_share_a_node() {
        let mut system = system();
        let first = system.place_piece("G1", Placement::default()).unwrap();
        let second = system
            .place_piece("G1", Placement::at(Vec3::new(0.168, 0.0, 0.0)))
            .unwrap();

        let stats = system.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert!((stats.total_length_m - 0.336).abs() < 1e-5);

        let b = system.piece(first).unwrap().connector(ConnectorRole::B).unwrap().node_id;
        let a = system.piece(second).unwrap().connector(ConnectorRole::A).unwrap().node_id;
        assert!(b.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_switch_edges_leave_common_node() {
        let mut system = system();
        let id = system.place_piece("WL", Placement::default()).unwrap();
        let piece = system.piece(id).unwrap();
        let common = piece.connector(ConnectorRole::Common).unwrap().node_id.unwrap();

        let edges = system.graph().edges_by_piece(id);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.from_node_id == common));
        assert_eq!(piece.generated_edge_ids().len(), 2);
        assert_eq!(system.stats().node_count, 3);
    }

    #[test]
    fn test_nearby_connector_scenario() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        let b = Vec3::new(0.168, 0.0, 0.0);

        assert!(system.find_nearby_connectors(b + Vec3::new(0.0, 0.0, 0.06), None).is_empty());
        let found = system.find_nearby_connectors(b + Vec3::new(0.0, 0.0, 0.03), None);
        assert_eq!(found[0].connector.role, ConnectorRole::B);
        assert!(system.best_snap_candidate(b, None).is_some());
    }

    #[test]
    fn test_joined_connectors_are_not_offered() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        system
            .place_piece("G1", Placement::at(Vec3::new(0.168, 0.0, 0.0)))
            .unwrap();
        assert!(system.find_nearby_connectors(Vec3::new(0.168, 0.0, 0.0), None).is_empty());
        assert_eq!(system.find_nearby_connectors(Vec3::ZERO, None).len(), 1);
    }

    #[test]
    fn test_place_piece_snapped_aligns_to_target() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();

        // Dropped 3cm off and slightly rotated.
        let drop = Placement::with_heading_deg(Vec3::new(0.19, 0.0, 0.02), 8.0);
        let placed = system.place_piece_snapped("R1", drop).unwrap();

        let preview = placed.snapped.unwrap();
        assert_eq!(preview.target_role, ConnectorRole::B);
        assert_eq!(preview.connector_role, ConnectorRole::A);
        assert!(preview.check.valid);

        let piece = system.piece(placed.piece_id).unwrap();
        assert!(piece.placement().position.distance(Vec3::new(0.168, 0.0, 0.0)) < 1e-4);
        assert_eq!(system.stats().node_count, 3);
        assert_eq!(system.stats().edge_count, 2);
    }

    #[test]
    fn test_place_piece_without_candidate_stays_put() {
        let mut system = system();
        let drop = Placement::at(Vec3::new(-0.5, 0.0, 0.2));
        let placed = system.place_piece_snapped("G1", drop).unwrap();
        assert!(placed.snapped.is_none());
        assert_eq!(system.piece(placed.piece_id).unwrap().placement(), drop);
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        let preview = system
            .preview_snap("G1", Placement::at(Vec3::new(0.17, 0.0, 0.0)))
            .unwrap();
        assert!(preview.is_some());
        assert_eq!(system.pieces().len(), 1);
        assert_eq!(system.stats().node_count, 2);
    }

    #[test]
    fn test_preview_snap_for_placed_piece() {
        let mut system = system();
        let first = system.place_piece("G1", Placement::default()).unwrap();
        let loose = system
            .place_piece("G1", Placement::at(Vec3::new(0.2, 0.0, 0.01)))
            .unwrap();

        let preview = system.preview_snap_for_piece(loose).unwrap();
        assert_eq!(preview.target.piece, first);
        assert_eq!(preview.connector_role, ConnectorRole::A);
        assert!(preview.placement.position.distance(Vec3::new(0.168, 0.0, 0.0)) < 1e-4);

        system.move_piece(loose, preview.placement).unwrap();
        assert_eq!(system.stats().node_count, 3);
        assert!(system.preview_snap_for_piece(PieceId(9)).is_none());
    }

    #[test]
    fn test_out_of_bounds_and_unknown_catalog() {
        let mut system = system();
        assert!(matches!(
            system.place_piece("G1", Placement::at(Vec3::new(5.0, 0.0, 0.0))),
            Err(TrackError::OutOfBounds { .. })
        ));
        assert_eq!(
            system.place_piece("nope", Placement::default()),
            Err(TrackError::UnknownCatalogEntry("nope".into()))
        );
        assert!(system.pieces().is_empty());
    }

    #[test]
    fn test_move_piece_splits_and_rejoins() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        let second = system
            .place_piece("G1", Placement::at(Vec3::new(0.168, 0.0, 0.0)))
            .unwrap();
        assert_eq!(system.stats().node_count, 3);

        system.set_position(second, Vec3::new(0.0, 0.0, 0.3)).unwrap();
        assert_eq!(system.stats().node_count, 4);
        assert_eq!(system.stats().edge_count, 2);

        system.set_position(second, Vec3::new(0.168, 0.0, 0.0)).unwrap();
        assert_eq!(system.stats().node_count, 3);
        assert_eq!(system.piece(second).unwrap().generated_edge_ids().len(), 1);
    }

    #[test]
    fn test_remove_piece_keeps_shared_nodes() {
        let mut system = system();
        let first = system.place_piece("G1", Placement::default()).unwrap();
        let second = system
            .place_piece("G1", Placement::at(Vec3::new(0.168, 0.0, 0.0)))
            .unwrap();
        let shared = system.piece(second).unwrap().connectors()[0].node_id.unwrap();

        let removed = system.remove_piece(first).unwrap();
        assert!(removed.connectors().iter().all(|c| c.node_id.is_none()));
        assert_eq!(system.stats().node_count, 2);
        assert_eq!(system.stats().edge_count, 1);
        assert!(system.graph().node(shared).is_some());

        system.remove_piece(second).unwrap();
        assert_eq!(system.stats().node_count, 0);
        assert_eq!(system.remove_piece(second).err(), Some(TrackError::UnknownPiece(second)));
    }

    #[test]
    fn test_remove_node_in_use_is_an_error() {
        let mut system = system();
        let id = system.place_piece("G1", Placement::default()).unwrap();
        let node = system.piece(id).unwrap().connectors()[0].node_id.unwrap();
        assert!(matches!(
            system.remove_node(node),
            Err(TrackError::Graph(GraphError::NodeInUse { .. }))
        ));
    }

    #[test]
    fn test_toggle_switch_keeps_both_edges() {
        let mut system = system();
        let switch = system.place_piece("WL", Placement::default()).unwrap();
        let straight = system
            .place_piece("G1", Placement::at(Vec3::new(-0.4, 0.0, 0.0)))
            .unwrap();

        assert_eq!(system.toggle_switch(switch).unwrap(), Some(SwitchState::Diverging));
        assert_eq!(system.toggle_switch(straight).unwrap(), None);
        assert_eq!(system.graph().edges_by_piece(switch).len(), 2);

        let piece = system.piece(switch).unwrap();
        let diverging = piece.generated_edge_ids()[1];
        assert_eq!(system.active_edge(switch).unwrap(), Some(diverging));
        let straight_edge = system.piece(straight).unwrap().generated_edge_ids()[0];
        assert_eq!(system.active_edge(straight).unwrap(), Some(straight_edge));

        system.remove_edge(diverging).unwrap();
        assert_eq!(system.active_edge(switch).unwrap(), None);
        system.toggle_switch(switch).unwrap();
        let normal = system.active_edge(switch).unwrap().unwrap();
        assert_eq!(system.graph().edge(normal).unwrap().curve, Curve::Straight);
    }

    #[test]
    fn test_remove_edge_then_straight_piece() {
        let mut system = system();
        let id = system.place_piece("G1", Placement::default()).unwrap();
        let edge = system.piece(id).unwrap().generated_edge_ids()[0];

        system.remove_edge(edge).unwrap();
        assert!(system.piece(id).unwrap().generated_edge_ids().is_empty());

        system.set_position(id, Vec3::new(0.0, 0.0, 0.2)).unwrap();
        assert_eq!(system.stats().edge_count, 1);
        assert_eq!(system.stats().node_count, 2);

        let edge = system.piece(id).unwrap().generated_edge_ids()[0];
        system.remove_edge(edge).unwrap();
        system.remove_piece(id).unwrap();
        assert_eq!(system.stats().node_count, 0);
        assert_eq!(system.stats().edge_count, 0);
    }

    #[test]
    fn test_remove_edge_then_switch_piece() {
        let mut system = system();
        let switch = system.place_piece("WL", Placement::default()).unwrap();
        let straight_edge = system.piece(switch).unwrap().generated_edge_ids()[0];

        system.remove_edge(straight_edge).unwrap();
        assert_eq!(system.piece(switch).unwrap().generated_edge_ids().len(), 1);

        let removed = system.remove_piece(switch).unwrap();
        assert!(removed.connectors().iter().all(|c| c.node_id.is_none()));
        assert_eq!(system.stats().node_count, 0);
        assert_eq!(system.stats().edge_count, 0);
    }

    #[test]
    fn test_remove_node_unbinds_connectors() {
        let mut system = system();
        let id = system.place_piece("G1", Placement::default()).unwrap();
        let edge = system.piece(id).unwrap().generated_edge_ids()[0];
        let node = system.piece(id).unwrap().connectors()[1].node_id.unwrap();

        system.remove_edge(edge).unwrap();
        system.remove_node(node).unwrap();
        assert_eq!(system.piece(id).unwrap().connectors()[1].node_id, None);

        let mut restored = self::system();
        restored.restore(&system.snapshot()).unwrap();
        restored.remove_piece(id).unwrap();
        assert_eq!(restored.stats().node_count, 0);
    }

    #[test]
    fn test_sample_edge_endpoints() {
        let mut system = system();
        let id = system.place_piece("R1", Placement::default()).unwrap();
        let piece = system.piece(id).unwrap();
        let edge = piece.generated_edge_ids()[0];
        let end = piece.connector(ConnectorRole::B).unwrap().world_position().unwrap();

        let samples = system.sample_edge(edge, None).unwrap();
        assert!(samples.len() > 2);
        assert!(samples[0].position.distance(Vec3::ZERO) < 1e-4);
        assert!(samples.last().unwrap().position.distance(end) < 1e-3);
        assert!(samples[0].tangent.distance(Vec3::X) < 1e-3);

        assert_eq!(system.sample_edge(edge, Some(4)).unwrap().len(), 5);
        assert!(system.sample_edge(EdgeId(99), None).is_err());
    }

    #[test]
    fn test_sample_edge_segment_count_is_bounded() {
        let mut system = system();
        let id = system.place_piece("G1", Placement::default()).unwrap();
        let piece = system.piece(id).unwrap();
        let from = piece.connectors()[0].node_id.unwrap();
        let to = piece.connectors()[1].node_id.unwrap();

        let long = system.add_edge(from, to, 1e30, Curve::Straight, id).unwrap();
        assert_eq!(system.sample_edge(long, None).unwrap().len(), MAX_SEGMENTS + 1);
        assert_eq!(
            system.sample_edge(long, Some(usize::MAX)).unwrap().len(),
            MAX_SEGMENTS + 1
        );

        assert!(matches!(
            system.add_edge(from, to, f32::NAN, Curve::Straight, id),
            Err(TrackError::Graph(GraphError::InvalidLength { .. }))
        ));
        assert!(matches!(
            system.add_edge(from, to, f32::INFINITY, Curve::Straight, id),
            Err(TrackError::Graph(GraphError::InvalidLength { .. }))
        ));
    }

    #[test]
    fn test_rotated_curve_samples_follow_connectors() {
        let mut system = system();
        let id = system
            .place_piece("R1", Placement::with_heading_deg(Vec3::new(0.1, 0.0, 0.1), 135.0))
            .unwrap();
        let piece = system.piece(id).unwrap();
        let a = piece.connector(ConnectorRole::A).unwrap().world().unwrap();
        let b = piece.connector(ConnectorRole::B).unwrap().world().unwrap();

        let samples = system.sample_edge(piece.generated_edge_ids()[0], Some(16)).unwrap();
        let first = samples.first().unwrap();
        let last = samples.last().unwrap();
        assert!(first.position.distance(a.position) < 1e-3);
        assert!(last.position.distance(b.position) < 1e-3);
        // Travel leaves A against its outward forward and exits along B's.
        assert!(first.tangent.distance(-a.forward) < 1e-3);
        assert!(last.tangent.distance(b.forward) < 1e-3);
    }

    #[test]
    fn test_layout_snapshot_round_trip() {
        let mut system = system();
        let switch = system.place_piece("WL", Placement::default()).unwrap();
        system
            .place_piece_snapped("G1", Placement::at(Vec3::new(0.17, 0.0, 0.0)))
            .unwrap();
        system.toggle_switch(switch).unwrap();

        let json = serde_json::to_string(&system.snapshot()).unwrap();
        let snapshot: LayoutSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = self::system();
        restored.restore(&snapshot).unwrap();
        assert_eq!(restored.snapshot(), system.snapshot());
        assert_eq!(restored.stats(), system.stats());
        assert_eq!(
            restored.piece(switch).unwrap().switch_state(),
            Some(SwitchState::Diverging)
        );

        let next = restored.place_piece("G1", Placement::at(Vec3::new(-0.5, 0.0, 0.0))).unwrap();
        assert_eq!(next, PieceId(2));
    }

    #[test]
    fn test_restore_rejects_unknown_catalog_entry() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        let mut snapshot = system.snapshot();
        snapshot.pieces[0].catalog_id = "missing".into();

        let mut target = self::system();
        assert_eq!(
            target.restore(&snapshot),
            Err(TrackError::UnknownCatalogEntry("missing".into()))
        );
        assert!(target.pieces().is_empty());
    }

    #[test]
    fn test_restore_rejects_unbound_node() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        let mut snapshot = system.snapshot();
        snapshot.pieces[0].connectors[1].node_id = Some(NodeId(77));

        let mut target = self::system();
        assert_eq!(
            target.restore(&snapshot),
            Err(TrackError::Graph(GraphError::UnknownNode(NodeId(77))))
        );
    }

    #[test]
    fn test_restore_rejects_duplicate_piece() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        let mut snapshot = system.snapshot();
        let mut copy = snapshot.pieces[0].clone();
        copy.generated_edge_ids.clear();
        snapshot.pieces.push(copy);

        let mut target = self::system();
        assert_eq!(
            target.restore(&snapshot),
            Err(TrackError::DuplicatePiece(PieceId(0)))
        );
        assert!(target.pieces().is_empty());
    }

    #[test]
    fn test_restore_rejects_edge_owned_by_another_piece() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        system
            .place_piece("G1", Placement::at(Vec3::new(0.168, 0.0, 0.0)))
            .unwrap();
        let mut snapshot = system.snapshot();
        let borrowed = snapshot.pieces[0].generated_edge_ids[0];
        snapshot.pieces[1].generated_edge_ids.push(borrowed);

        let mut target = self::system();
        assert_eq!(
            target.restore(&snapshot),
            Err(TrackError::ForeignEdge {
                edge: borrowed,
                piece: PieceId(1),
            })
        );
    }

    #[test]
    fn test_clear_keeps_catalog() {
        let mut system = system();
        system.place_piece("G1", Placement::default()).unwrap();
        system.clear();
        assert_eq!(system.stats().node_count, 0);
        assert!(system.pieces().is_empty());
        assert_eq!(system.place_piece("G1", Placement::default()).unwrap(), PieceId(0));
    }
}
