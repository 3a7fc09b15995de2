//! Circular-arc geometry for curved track.
//!
//! Everything in this module is a pure function of its inputs. Arcs live in
//! the horizontal XZ plane; angles are measured with `atan2(z, x)` around the
//! arc center, and a counter-clockwise arc is one whose angle increases from
//! start to end.
//!
//! The solver derives the full arc (center, start/end angle) from two
//! endpoints, a radius and a sweep. Sampling then produces the ordered
//! position/tangent sequence the external mesh renderer consumes.

mod arc;
mod curve;
mod samples;

pub use arc::{Arc, arc_length, compute_arc};
pub use curve::{ArcDirection, Curve};
pub use samples::{
    MAX_SEGMENTS, PathSample, PathSamples, sample_curve, sample_line, sample_points,
};

/// Tolerance for geometric comparisons. Arcs whose sweep or chord falls below
/// it are treated as straight segments.
pub const GEOMETRY_EPSILON: f32 = 1e-4;
