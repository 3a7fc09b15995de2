//! Connector snapping.
//!
//! Finds free connectors near a point, computes the rigid transform that
//! joins a new piece to an existing one, and checks whether two connectors
//! are close and opposed enough to count as joined. Everything here is a pure
//! query; expected "nothing to snap to" outcomes are empty results, never
//! errors.

mod helper;

pub use helper::{
    ConnectionCheck, RejectReason, SnapCandidate, SnapConfig, SnapHelper, is_position_in_bounds,
};

/// Default maximum connector distance for a snap, meters.
pub const SNAP_DISTANCE_M: f32 = 0.05;

/// Default maximum deviation from exactly-opposite forwards, degrees.
pub const SNAP_ANGLE_DEG: f32 = 15.0;
