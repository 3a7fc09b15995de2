//! Position/tangent sampling along track segments.
//!
//! The sample sequence is what the external rail/sleeper mesh generator
//! consumes. It is a plain iterator: cloning it restarts the walk.

use glam::Vec3;
use serde::Serialize;

use super::GEOMETRY_EPSILON;
use super::arc::{Arc, compute_arc};
use super::curve::Curve;

/// One sample along a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSample {
    pub position: Vec3,
    /// Unit direction of travel.
    pub tangent: Vec3,
    /// Distance travelled from the first sample, meters.
    pub cumulative_distance: f32,
}

/// Upper bound on segments per sampled path.
pub const MAX_SEGMENTS: usize = 4096;

#[derive(Debug, Clone, Copy)]
enum Path {
    Line { start: Vec3, delta: Vec3 },
    Arc(Arc),
}

/// Evenly spaced samples along a straight line or an arc.
///
/// Yields `segment_count + 1` samples, first and last on the segment
/// endpoints. The segment count is clamped to `1..=MAX_SEGMENTS`.
#[derive(Debug, Clone)]
pub struct PathSamples {
    path: Path,
    segment_count: usize,
    next: usize,
}

impl PathSamples {
    fn new(path: Path, segment_count: usize) -> Self {
        Self {
            path,
            segment_count: segment_count.clamp(1, MAX_SEGMENTS),
            next: 0,
        }
    }

    /// Number of segments the path is divided into.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    fn sample(&self, i: usize) -> PathSample {
        let t = i as f32 / self.segment_count as f32;
        match self.path {
            Path::Line { start, delta } => PathSample {
                position: start + delta * t,
                tangent: delta.normalize_or_zero(),
                cumulative_distance: delta.length() * t,
            },
            Path::Arc(arc) => {
                let theta = arc.start_angle + arc.sweep() * t;
                PathSample {
                    position: arc.point_at(theta),
                    tangent: arc.tangent_at(theta),
                    cumulative_distance: arc.length() * t,
                }
            }
        }
    }
}

impl Iterator for PathSamples {
    type Item = PathSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.segment_count {
            return None;
        }
        let sample = self.sample(self.next);
        self.next += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.segment_count + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PathSamples {}

/// Sample a solved arc into `segment_count` even angular steps.
pub fn sample_points(arc: &Arc, segment_count: usize) -> PathSamples {
    PathSamples::new(Path::Arc(*arc), segment_count)
}

/// Sample the straight segment from `start` to `end`.
pub fn sample_line(start: Vec3, end: Vec3, segment_count: usize) -> PathSamples {
    PathSamples::new(
        Path::Line {
            start,
            delta: end - start,
        },
        segment_count,
    )
}

/// Sample a segment of the given curve shape between two node positions.
///
/// Arcs that cannot be solved, or whose sweep is below
/// [`GEOMETRY_EPSILON`](super::GEOMETRY_EPSILON), are sampled as straight
/// segments instead.
pub fn sample_curve(start: Vec3, end: Vec3, curve: &Curve, segment_count: usize) -> PathSamples {
    match *curve {
        Curve::Straight => sample_line(start, end, segment_count),
        Curve::Arc { angle_deg, .. } if angle_deg.abs() < GEOMETRY_EPSILON => {
            sample_line(start, end, segment_count)
        }
        Curve::Arc {
            radius_m,
            angle_deg,
            direction,
        } => match compute_arc(start, end, radius_m, angle_deg, direction) {
            Ok(arc) => sample_points(&arc, segment_count),
            Err(err) => {
                tracing::debug!(%err, "arc fell back to straight segment");
                sample_line(start, end, segment_count)
            }
        },
    }
}
