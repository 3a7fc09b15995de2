//! Catalog entries: the piece types a layout can be built from.
//!
//! Entries normally arrive from the host application. The builders here
//! produce the standard layouts in the local piece frame: the first connector
//! sits at the origin, track runs along +X, and every connector's forward
//! points away from the piece body.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::connector::ConnectorRole;
use crate::error::PieceError;
use crate::geometry::{ArcDirection, Curve, GEOMETRY_EPSILON};

/// Kind of catalog piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    Straight,
    Curve,
    Switch,
}

/// Local pose of one connector in a catalog layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorLayout {
    pub role: ConnectorRole,
    pub local_position: Vec3,
    pub local_forward: Vec3,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub piece_type: PieceType,
    pub length_m: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_radius_m: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_angle_deg: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_direction: Option<ArcDirection>,
    pub connectors: Vec<ConnectorLayout>,
}

/// End point and outward heading of an arc leaving the origin along +X.
fn arc_end(radius_m: f32, angle_deg: f32, direction: ArcDirection) -> (Vec3, Vec3) {
    let a = angle_deg.to_radians();
    let d = direction.sign();
    (
        Vec3::new(radius_m * a.sin(), 0.0, d * radius_m * (1.0 - a.cos())),
        Vec3::new(a.cos(), 0.0, d * a.sin()),
    )
}

impl CatalogEntry {
    /// A straight piece of `length_m`.
    pub fn straight(id: impl Into<String>, length_m: f32) -> Self {
        Self {
            id: id.into(),
            piece_type: PieceType::Straight,
            length_m,
            curve_radius_m: None,
            curve_angle_deg: None,
            curve_direction: None,
            connectors: vec![
                ConnectorLayout {
                    role: ConnectorRole::A,
                    local_position: Vec3::ZERO,
                    local_forward: Vec3::NEG_X,
                },
                ConnectorLayout {
                    role: ConnectorRole::B,
                    local_position: Vec3::new(length_m, 0.0, 0.0),
                    local_forward: Vec3::X,
                },
            ],
        }
    }

    /// A curved piece; its length is the arc length.
    pub fn curve(
        id: impl Into<String>,
        radius_m: f32,
        angle_deg: f32,
        direction: ArcDirection,
    ) -> Self {
        let (end, heading) = arc_end(radius_m, angle_deg, direction);
        Self {
            id: id.into(),
            piece_type: PieceType::Curve,
            length_m: crate::geometry::arc_length(radius_m, angle_deg),
            curve_radius_m: Some(radius_m),
            curve_angle_deg: Some(angle_deg),
            curve_direction: Some(direction),
            connectors: vec![
                ConnectorLayout {
                    role: ConnectorRole::A,
                    local_position: Vec3::ZERO,
                    local_forward: Vec3::NEG_X,
                },
                ConnectorLayout {
                    role: ConnectorRole::B,
                    local_position: end,
                    local_forward: heading,
                },
            ],
        }
    }

    /// A switch: a straight route of `length_m` and a diverging arc, both
    /// leaving the COMMON connector.
    pub fn switch(
        id: impl Into<String>,
        length_m: f32,
        radius_m: f32,
        angle_deg: f32,
        direction: ArcDirection,
    ) -> Self {
        let (end, heading) = arc_end(radius_m, angle_deg, direction);
        Self {
            id: id.into(),
            piece_type: PieceType::Switch,
            length_m,
            curve_radius_m: Some(radius_m),
            curve_angle_deg: Some(angle_deg),
            curve_direction: Some(direction),
            connectors: vec![
                ConnectorLayout {
                    role: ConnectorRole::Common,
                    local_position: Vec3::ZERO,
                    local_forward: Vec3::NEG_X,
                },
                ConnectorLayout {
                    role: ConnectorRole::Straight,
                    local_position: Vec3::new(length_m, 0.0, 0.0),
                    local_forward: Vec3::X,
                },
                ConnectorLayout {
                    role: ConnectorRole::Diverging,
                    local_position: end,
                    local_forward: heading,
                },
            ],
        }
    }

    /// Roles this entry's type requires, in layout order.
    pub fn required_roles(&self) -> &'static [ConnectorRole] {
        match self.piece_type {
            PieceType::Straight | PieceType::Curve => &[ConnectorRole::A, ConnectorRole::B],
            PieceType::Switch => &[
                ConnectorRole::Common,
                ConnectorRole::Straight,
                ConnectorRole::Diverging,
            ],
        }
    }

    /// The arc this entry's curved route follows, if it has one.
    pub fn arc_curve(&self) -> Option<Curve> {
        match (self.curve_radius_m, self.curve_angle_deg) {
            (Some(radius_m), Some(angle_deg)) => Some(Curve::Arc {
                radius_m,
                angle_deg,
                direction: self.curve_direction.unwrap_or(ArcDirection::Ccw),
            }),
            _ => None,
        }
    }

    /// Check the layout matches the piece type.
    pub fn validate(&self) -> Result<(), PieceError> {
        if !self.length_m.is_finite() || self.length_m <= 0.0 {
            return Err(PieceError::InvalidLength {
                id: self.id.clone(),
                length_m: self.length_m,
            });
        }

        let required = self.required_roles();
        if self.connectors.len() != required.len() {
            return Err(PieceError::ConnectorCount {
                id: self.id.clone(),
                expected: required.len(),
                found: self.connectors.len(),
            });
        }
        for role in required {
            if !self.connectors.iter().any(|c| c.role == *role) {
                return Err(PieceError::MissingRole {
                    id: self.id.clone(),
                    role: role.as_str(),
                });
            }
        }
        if self.connectors.iter().any(|c| {
            !c.local_position.is_finite()
                || !c.local_forward.is_finite()
                || c.local_forward.length() < GEOMETRY_EPSILON
        }) {
            return Err(PieceError::DegenerateConnector(self.id.clone()));
        }

        if self.piece_type != PieceType::Straight {
            let radius_ok = self.curve_radius_m.is_some_and(|r| r.is_finite() && r > 0.0);
            let angle_ok = self.curve_angle_deg.is_some_and(|a| a.is_finite() && a > 0.0);
            if !radius_ok || !angle_ok {
                return Err(PieceError::MissingCurveParameters(self.id.clone()));
            }
        }
        Ok(())
    }
}

/// Catalog entries keyed by ID.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add an entry, replacing any entry with the same ID.
    pub fn insert(&mut self, entry: CatalogEntry) -> Result<(), PieceError> {
        entry.validate()?;
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
