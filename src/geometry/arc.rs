//! Arc solver: recover center and angles from endpoints, radius and sweep.

use std::f32::consts::TAU;

use glam::Vec3;

use super::GEOMETRY_EPSILON;
use super::curve::ArcDirection;
use crate::error::GeometryError;

/// A fully resolved circular arc in the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    /// Arc center. Its Y component is the height of the start point.
    pub center: Vec3,
    pub radius: f32,
    /// Angle of the start point around the center, radians.
    pub start_angle: f32,
    /// Angle of the end point, unwrapped so that the sweep from
    /// `start_angle` follows `direction`.
    pub end_angle: f32,
    pub direction: ArcDirection,
}

impl Arc {
    /// Signed angular sweep in radians (positive for CCW).
    #[inline]
    pub fn sweep(&self) -> f32 {
        self.end_angle - self.start_angle
    }

    /// Length along the arc.
    #[inline]
    pub fn length(&self) -> f32 {
        self.radius * self.sweep().abs()
    }

    /// Point on the arc at angle `theta`.
    #[inline]
    pub fn point_at(&self, theta: f32) -> Vec3 {
        self.center + self.radius * Vec3::new(theta.cos(), 0.0, theta.sin())
    }

    /// Unit direction of travel at angle `theta`.
    #[inline]
    pub fn tangent_at(&self, theta: f32) -> Vec3 {
        self.direction.sign() * Vec3::new(-theta.sin(), 0.0, theta.cos())
    }
}

/// Length of an arc of `radius_m` sweeping `angle_deg`.
#[inline]
pub fn arc_length(radius_m: f32, angle_deg: f32) -> f32 {
    radius_m * angle_deg.abs().to_radians()
}

/// Solve the arc from `start` to `end` with the given radius and sweep.
///
/// The center sits on the perpendicular bisector of the chord, on the left of
/// the chord for [`ArcDirection::Ccw`] and on the right for
/// [`ArcDirection::Cw`], at `radius * cos(angle / 2)` from the chord midpoint.
pub fn compute_arc(
    start: Vec3,
    end: Vec3,
    radius_m: f32,
    angle_deg: f32,
    direction: ArcDirection,
) -> Result<Arc, GeometryError> {
    if !start.is_finite() || !end.is_finite() || !radius_m.is_finite() || !angle_deg.is_finite() {
        return Err(GeometryError::NonFinite);
    }
    if radius_m <= GEOMETRY_EPSILON {
        return Err(GeometryError::InvalidRadius(radius_m));
    }

    let chord = Vec3::new(end.x - start.x, 0.0, end.z - start.z);
    let chord_len = chord.length();
    if chord_len <= GEOMETRY_EPSILON {
        return Err(GeometryError::ZeroLengthChord);
    }
    let diameter = 2.0 * radius_m;
    if chord_len > diameter + GEOMETRY_EPSILON {
        return Err(GeometryError::ChordExceedsDiameter {
            chord_m: chord_len,
            diameter_m: diameter,
        });
    }

    let chord_dir = chord / chord_len;
    let left = Vec3::new(-chord_dir.z, 0.0, chord_dir.x);
    let normal = left * direction.sign();

    let half_angle = angle_deg.abs().to_radians() * 0.5;
    let midpoint = Vec3::new((start.x + end.x) * 0.5, start.y, (start.z + end.z) * 0.5);
    let center = midpoint + normal * (radius_m * half_angle.cos());

    let start_angle = (start.z - center.z).atan2(start.x - center.x);
    let mut end_angle = (end.z - center.z).atan2(end.x - center.x);
    match direction {
        ArcDirection::Ccw => {
            while end_angle < start_angle {
                end_angle += TAU;
            }
        }
        ArcDirection::Cw => {
            while end_angle > start_angle {
                end_angle -= TAU;
            }
        }
    }

    Ok(Arc {
        center,
        radius: radius_m,
        start_angle,
        end_angle,
        direction,
    })
}
