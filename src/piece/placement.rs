//! Rigid placement of a piece on the board.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position plus rotation of a piece's local frame.
///
/// Serialized as `{ "pos": [x, y, z], "rot": [x, y, z, w] }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(rename = "pos")]
    pub position: Vec3,
    #[serde(rename = "rot")]
    pub rotation: Quat,
}

impl Placement {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
        }
    }

    /// Translation only.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Position plus a heading in degrees about the vertical axis.
    pub fn with_heading_deg(position: Vec3, heading_deg: f32) -> Self {
        Self::new(position, Quat::from_rotation_y(heading_deg.to_radians()))
    }

    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    #[inline]
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        (self.rotation * local).normalize_or_zero()
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}
