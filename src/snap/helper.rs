//! Snap candidate search, snap transform and connection validation.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize, Serializer};

use super::{SNAP_ANGLE_DEG, SNAP_DISTANCE_M};
use crate::error::SnapError;
use crate::geometry::GEOMETRY_EPSILON;
use crate::graph::NodeId;
use crate::piece::{Connector, ConnectorId, PieceId, Placement, TrackPiece};

/// Dot product above which two directions count as already aligned.
const ALIGNED_DOT: f32 = 0.9999;

/// Snap tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapConfig {
    /// Maximum distance between connectors, meters.
    pub snap_distance_m: f32,
    /// Maximum deviation from exactly-opposite forwards, degrees.
    pub snap_angle_deg: f32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_distance_m: SNAP_DISTANCE_M,
            snap_angle_deg: SNAP_ANGLE_DEG,
        }
    }
}

/// A free connector near the query point.
#[derive(Debug, Clone, Copy)]
pub struct SnapCandidate<'a> {
    pub piece: &'a TrackPiece,
    pub connector: &'a Connector,
    pub distance_m: f32,
}

/// Why two connectors do not form a connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    Unresolved(ConnectorId),
    TooFar { distance_m: f32, max_m: f32 },
    Misaligned { angle_deg: f32, max_deg: f32 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RejectReason::Unresolved(id) => {
                write!(f, "connector {id} has no resolved world transform")
            }
            RejectReason::TooFar { distance_m, max_m } => write!(
                f,
                "connectors are {:.1}cm apart (max {:.1}cm)",
                distance_m * 100.0,
                max_m * 100.0
            ),
            RejectReason::Misaligned { angle_deg, max_deg } => write!(
                f,
                "connectors are misaligned by {angle_deg:.1}° (max {max_deg:.1}°)"
            ),
        }
    }
}

impl Serialize for RejectReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of [`SnapHelper::validate_connection`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionCheck {
    pub valid: bool,
    pub reason: Option<RejectReason>,
}

impl ConnectionCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: RejectReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

/// Snap queries over a set of placed pieces.
#[derive(Debug, Clone, Default)]
pub struct SnapHelper {
    config: SnapConfig,
}

impl SnapHelper {
    pub fn new(config: SnapConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Free connectors within the snap distance of `position`, closest first.
    ///
    /// A connector is free unless a connector of some other piece is bound to
    /// the same node. Connectors of `exclude` are never returned. A non-finite
    /// `position` yields no candidates.
    pub fn find_nearby_connectors<'a>(
        &self,
        position: Vec3,
        pieces: &'a [TrackPiece],
        exclude: Option<PieceId>,
    ) -> Vec<SnapCandidate<'a>> {
        if !position.is_finite() {
            return Vec::new();
        }

        let owners = node_owners(pieces);
        let mut candidates: Vec<_> = pieces
            .iter()
            .filter(|piece| Some(piece.id()) != exclude)
            .flat_map(|piece| {
                piece.connectors().iter().filter_map(move |connector| {
                    let world = connector.world_position()?;
                    Some(SnapCandidate {
                        piece,
                        connector,
                        distance_m: world.distance(position),
                    })
                })
            })
            .filter(|c| c.distance_m <= self.config.snap_distance_m)
            .filter(|c| !is_bound_elsewhere(c.connector, c.piece.id(), &owners))
            .collect();

        candidates.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        candidates
    }

    /// The closest free connector, if any.
    pub fn best_snap_candidate<'a>(
        &self,
        position: Vec3,
        pieces: &'a [TrackPiece],
        exclude: Option<PieceId>,
    ) -> Option<SnapCandidate<'a>> {
        self.find_nearby_connectors(position, pieces, exclude)
            .into_iter()
            .next()
    }

    /// Placement that puts `new_connector` on `target`, facing it.
    ///
    /// The returned rotation is the minimal one taking the connector's local
    /// forward onto the negated target forward; it replaces the new piece's
    /// rotation rather than composing with it.
    pub fn compute_snap_transform(
        &self,
        new_connector: &Connector,
        target: &Connector,
    ) -> Result<Placement, SnapError> {
        if new_connector.world().is_none() {
            return Err(SnapError::UnresolvedTransform(new_connector.id.to_string()));
        }
        let target_pose = target
            .world()
            .ok_or_else(|| SnapError::UnresolvedTransform(target.id.to_string()))?;

        let from = unit(new_connector.local_forward)
            .ok_or_else(|| SnapError::DegenerateForward(new_connector.id.to_string()))?;
        let desired = -unit(target_pose.forward)
            .ok_or_else(|| SnapError::DegenerateForward(target.id.to_string()))?;
        if !target_pose.position.is_finite() || !new_connector.local_position.is_finite() {
            return Err(SnapError::UnresolvedTransform(target.id.to_string()));
        }

        let rotation = rotation_between(from, desired);
        let position = target_pose.position - rotation * new_connector.local_position;
        Ok(Placement::new(position, rotation))
    }

    /// Whether two connectors are close enough and opposed enough to join.
    pub fn validate_connection(&self, c1: &Connector, c2: &Connector) -> ConnectionCheck {
        let Some(p1) = c1.world() else {
            return ConnectionCheck::rejected(RejectReason::Unresolved(c1.id));
        };
        let Some(p2) = c2.world() else {
            return ConnectionCheck::rejected(RejectReason::Unresolved(c2.id));
        };

        let distance_m = p1.position.distance(p2.position);
        if !(distance_m <= self.config.snap_distance_m) {
            return ConnectionCheck::rejected(RejectReason::TooFar {
                distance_m,
                max_m: self.config.snap_distance_m,
            });
        }

        let alignment = p1.forward.normalize_or_zero().dot(-p2.forward.normalize_or_zero());
        let angle_deg = alignment.clamp(-1.0, 1.0).acos().to_degrees();
        if !(angle_deg <= self.config.snap_angle_deg) {
            return ConnectionCheck::rejected(RejectReason::Misaligned {
                angle_deg,
                max_deg: self.config.snap_angle_deg,
            });
        }

        ConnectionCheck::ok()
    }
}

/// Whether `position` lies on a board of the given size centered on the
/// origin.
pub fn is_position_in_bounds(position: Vec3, board_width_m: f32, board_depth_m: f32) -> bool {
    position.is_finite()
        && position.x.abs() <= board_width_m * 0.5
        && position.z.abs() <= board_depth_m * 0.5
}

fn unit(v: Vec3) -> Option<Vec3> {
    (v.is_finite() && v.length() > GEOMETRY_EPSILON).then(|| v.normalize())
}

/// Minimal rotation taking unit vector `from` onto unit vector `to`.
fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    let dot = from.dot(to);
    if dot > ALIGNED_DOT {
        return Quat::IDENTITY;
    }
    if dot < -ALIGNED_DOT {
        // Half turn about an axis perpendicular to `from`; prefer the
        // vertical so pieces stay flat on the board.
        let mut axis = Vec3::Y - from * from.dot(Vec3::Y);
        if axis.length() < 1e-3 {
            axis = Vec3::X - from * from.dot(Vec3::X);
        }
        return Quat::from_axis_angle(axis.normalize(), PI);
    }
    Quat::from_axis_angle(from.cross(to).normalize(), dot.acos())
}

/// For every bound node, the pieces whose connectors bind to it.
fn node_owners(pieces: &[TrackPiece]) -> HashMap<NodeId, Vec<PieceId>> {
    let mut owners: HashMap<NodeId, Vec<PieceId>> = HashMap::new();
    for piece in pieces {
        for node in piece.connectors().iter().filter_map(|c| c.node_id) {
            owners.entry(node).or_default().push(piece.id());
        }
    }
    owners
}

fn is_bound_elsewhere(
    connector: &Connector,
    owner: PieceId,
    owners: &HashMap<NodeId, Vec<PieceId>>,
) -> bool {
    connector
        .node_id
        .and_then(|node| owners.get(&node))
        .is_some_and(|pieces| pieces.iter().any(|&p| p != owner))
}
