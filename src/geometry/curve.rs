//! Edge curve description.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::arc::arc_length;

/// Turning direction of an arc.
///
/// Serialized as `1` (counter-clockwise, turning left) or `-1` (clockwise,
/// turning right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum ArcDirection {
    Ccw,
    Cw,
}

impl ArcDirection {
    /// The direction as a sign, `1.0` or `-1.0`.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            ArcDirection::Ccw => 1.0,
            ArcDirection::Cw => -1.0,
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            ArcDirection::Ccw => ArcDirection::Cw,
            ArcDirection::Cw => ArcDirection::Ccw,
        }
    }
}

impl From<ArcDirection> for i8 {
    fn from(direction: ArcDirection) -> Self {
        match direction {
            ArcDirection::Ccw => 1,
            ArcDirection::Cw => -1,
        }
    }
}

impl TryFrom<i8> for ArcDirection {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ArcDirection::Ccw),
            -1 => Ok(ArcDirection::Cw),
            other => Err(format!("arc direction must be 1 or -1, got {other}")),
        }
    }
}

impl fmt::Display for ArcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcDirection::Ccw => write!(f, "ccw"),
            ArcDirection::Cw => write!(f, "cw"),
        }
    }
}

/// Shape of a track segment between two nodes.
///
/// Straight segments carry no arc parameters at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Curve {
    Straight,
    #[serde(rename_all = "camelCase")]
    Arc {
        radius_m: f32,
        angle_deg: f32,
        direction: ArcDirection,
    },
}

impl Curve {
    /// Track length of this curve. Straight segments take `straight_length_m`.
    pub fn length_for(&self, straight_length_m: f32) -> f32 {
        match *self {
            Curve::Straight => straight_length_m,
            Curve::Arc {
                radius_m,
                angle_deg,
                ..
            } => arc_length(radius_m, angle_deg),
        }
    }

    #[inline]
    pub fn is_straight(&self) -> bool {
        matches!(self, Curve::Straight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_sign() {
        assert_eq!(ArcDirection::Ccw.sign(), 1.0);
        assert_eq!(ArcDirection::Cw.sign(), -1.0);
        assert_eq!(ArcDirection::Cw.reversed(), ArcDirection::Ccw);
    }

    #[test]
    fn test_direction_conversion() {
        assert_eq!(ArcDirection::try_from(1), Ok(ArcDirection::Ccw));
        assert_eq!(ArcDirection::try_from(-1), Ok(ArcDirection::Cw));
        assert!(ArcDirection::try_from(0).is_err());
        assert_eq!(i8::from(ArcDirection::Cw), -1);
    }

    #[test]
    fn test_curve_json_shape() {
        let arc = Curve::Arc {
            radius_m: 0.5,
            angle_deg: 30.0,
            direction: ArcDirection::Cw,
        };
        let json = serde_json::to_value(arc).unwrap();
        assert_eq!(json["type"], "arc");
        assert_eq!(json["radiusM"], 0.5);
        assert_eq!(json["angleDeg"], 30.0);
        assert_eq!(json["direction"], -1);

        let straight = serde_json::to_value(Curve::Straight).unwrap();
        assert_eq!(straight, serde_json::json!({ "type": "straight" }));
    }

    #[test]
    fn test_curve_rejects_bad_direction() {
        let json = r#"{"type":"arc","radiusM":0.5,"angleDeg":30.0,"direction":2}"#;
        assert!(serde_json::from_str::<Curve>(json).is_err());
    }

    #[test]
    fn test_curve_length() {
        assert_eq!(Curve::Straight.length_for(0.168), 0.168);
        let quarter = Curve::Arc {
            radius_m: 1.0,
            angle_deg: 90.0,
            direction: ArcDirection::Ccw,
        };
        assert!((quarter.length_for(0.0) - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }
}
