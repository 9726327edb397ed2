//! Path kinematics
//!
//! Expands a commanded move between two positions into an ordered, non-empty
//! sequence of [`Pose`]s. The functions are pure: identical inputs always
//! produce identical output, and the first and last poses are built directly
//! from the start and end positions.

use crate::pose::{orientation, Pose};
use camkit_core::{ArcDirection, AxisKind, AxisSet, GeometryError, Plane, Position, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::trace;

/// Largest number of segments a single move is expanded into
pub const MAX_SEGMENTS: usize = 1_000_000;

/// Start and end radii may differ by this much (mm)
pub const ARC_RADIUS_TOLERANCE: f64 = 1e-3;

const ROTARY: [AxisKind; 3] = [AxisKind::A, AxisKind::B, AxisKind::C];

/// Expansion resolutions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Steps per millimetre for linear moves; negative means subdivide only
    /// when rotary axes move as well
    pub linear_steps_per_mm: f64,
    /// Angular steps per degree of arc sweep
    pub arc_steps_per_degree: f64,
    /// Steps per degree of rotary-only motion
    pub rotary_steps_per_degree: f64,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            linear_steps_per_mm: -1.0,
            arc_steps_per_degree: 1.0,
            rotary_steps_per_degree: 1.0,
        }
    }
}

/// Arc parameters in canonical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcMotion {
    /// Arc centre (mm); the coordinate along the plane normal is ignored
    pub center: Point3<f64>,
    pub direction: ArcDirection,
    pub plane: Plane,
    /// Number of revolutions, at least 1
    pub turns: u32,
}

/// Derived geometry of an arc move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    /// Coordinate indices of the in-plane axes and the plane normal
    pub axes: [usize; 3],
    pub radius: f64,
    pub end_radius: f64,
    /// Start angle in radians
    pub start_angle: f64,
    /// Signed sweep in radians, negative for clockwise
    pub sweep: f64,
    /// Displacement along the plane normal (mm)
    pub helix: f64,
}

impl ArcGeometry {
    pub fn new(start: &Position, end: &Position, arc: &ArcMotion) -> Result<Self> {
        if arc.turns == 0 {
            return Err(GeometryError::InvalidTurns { turns: arc.turns }.into());
        }
        let axes = plane_axes(arc.plane)?;
        let [u, v, w] = axes;
        let (p0, p1, c) = (start.cartesian(), end.cartesian(), arc.center);

        let radius = (p0[u] - c[u]).hypot(p0[v] - c[v]);
        let end_radius = (p1[u] - c[u]).hypot(p1[v] - c[v]);
        if radius < 1e-9 {
            return Err(GeometryError::ZeroRadiusArc.into());
        }
        if (radius - end_radius).abs() > ARC_RADIUS_TOLERANCE {
            return Err(GeometryError::NonEquidistantArc {
                start_radius: radius,
                end_radius,
            }
            .into());
        }

        let start_angle = (p0[v] - c[v]).atan2(p0[u] - c[u]);
        let end_angle = (p1[v] - c[v]).atan2(p1[u] - c[u]);
        let mut delta = end_angle - start_angle;
        let extra = 2.0 * PI * f64::from(arc.turns - 1);
        let sweep = match arc.direction {
            ArcDirection::CounterClockwise => {
                if delta <= 0.0 {
                    delta += 2.0 * PI;
                }
                delta + extra
            }
            ArcDirection::Clockwise => {
                if delta >= 0.0 {
                    delta -= 2.0 * PI;
                }
                delta - extra
            }
        };

        Ok(Self {
            axes,
            radius,
            end_radius,
            start_angle,
            sweep,
            helix: p1[w] - p0[w],
        })
    }

    /// Sweep in degrees
    pub fn sweep_degrees(&self) -> f64 {
        self.sweep.to_degrees()
    }

    /// Path length including the helical component (mm)
    pub fn length(&self) -> f64 {
        (self.radius * self.sweep.abs()).hypot(self.helix)
    }

    /// In-plane extremes reached between the end points
    ///
    /// Returns `(coordinate index, value)` for every quadrant point
    /// (0°, 90°, 180°, 270° about `center`) the sweep passes through.
    pub fn extremes(&self, center: &Point3<f64>) -> Vec<(usize, f64)> {
        let [u, v, _] = self.axes;
        let r = self.radius.max(self.end_radius);
        let quadrants = [
            (u, center[u] + r),
            (v, center[v] + r),
            (u, center[u] - r),
            (v, center[v] - r),
        ];
        quadrants
            .into_iter()
            .enumerate()
            .filter(|(k, _)| {
                if self.sweep.abs() >= 2.0 * PI {
                    return true;
                }
                let theta = *k as f64 * PI / 2.0;
                let travelled = if self.sweep > 0.0 {
                    (theta - self.start_angle).rem_euclid(2.0 * PI)
                } else {
                    (self.start_angle - theta).rem_euclid(2.0 * PI)
                };
                travelled <= self.sweep.abs()
            })
            .map(|(_, extreme)| extreme)
            .collect()
    }
}

/// In-plane axes and normal for an arc plane, as coordinate indices
fn plane_axes(plane: Plane) -> Result<[usize; 3]> {
    match plane {
        Plane::XY => Ok([0, 1, 2]),
        Plane::ZX => Ok([2, 0, 1]),
        Plane::YZ => Ok([1, 2, 0]),
        other => Err(GeometryError::UnsupportedPlane {
            plane: other.to_string(),
        }
        .into()),
    }
}

fn segment_count(amount: f64, steps: f64) -> usize {
    let n = (amount * steps).ceil();
    if n.is_finite() && n >= 1.0 {
        (n as usize).min(MAX_SEGMENTS)
    } else {
        1
    }
}

fn rotary_delta(start: &Position, end: &Position, axes: &AxisSet) -> f64 {
    ROTARY
        .iter()
        .filter(|k| axes.contains(**k))
        .map(|k| (end.get(*k) - start.get(*k)).abs())
        .fold(0.0, f64::max)
}

fn lerp_angles(start: &Position, end: &Position, t: f64) -> [f64; 3] {
    let (a, b) = (start.rotary(), end.rotary());
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Expand straight-line motion
///
/// Linear-only moves are split into `ceil(distance * steps_per_mm)` segments;
/// a negative `steps_per_mm` returns just the two endpoints. When rotary axes
/// move too, the segment count also covers the largest rotary delta and the
/// orientation is rebuilt from the interpolated angles at every step.
pub fn expand_linear(
    start: &Position,
    end: &Position,
    axes: &AxisSet,
    steps_per_mm: f64,
) -> Vec<Pose> {
    let first = Pose::from_position(start);
    if start == end {
        return vec![first];
    }
    let last = Pose::from_position(end);
    let rotating = rotary_delta(start, end, axes) > 0.0;
    if !rotating && steps_per_mm < 0.0 {
        return vec![first, last];
    }

    let steps = steps_per_mm.abs();
    let distance = (last.position - first.position).norm();
    let mut n = segment_count(distance, steps);
    if rotating {
        n = n.max(segment_count(rotary_delta(start, end, axes), steps));
    }
    trace!(segments = n, distance, rotating, "expand linear");

    let mut poses = Vec::with_capacity(n + 1);
    poses.push(first);
    for i in 1..n {
        let t = i as f64 / n as f64;
        let position = first.position.lerp(&last.position, t);
        let attitude = if rotating {
            orientation(lerp_angles(start, end, t))
        } else {
            first.orientation
        };
        poses.push(Pose::new(position, attitude));
    }
    poses.push(last);
    poses
}

/// Expand circular or helical motion
///
/// One pose per angular step of `1 / steps_per_degree` degrees. A
/// non-positive resolution falls back to one step per degree.
pub fn expand_arc(
    start: &Position,
    end: &Position,
    arc: &ArcMotion,
    axes: &AxisSet,
    steps_per_degree: f64,
) -> Result<Vec<Pose>> {
    let geometry = ArcGeometry::new(start, end, arc)?;
    let steps = if steps_per_degree > 0.0 {
        steps_per_degree
    } else {
        1.0
    };
    let n = segment_count(geometry.sweep_degrees().abs(), steps);
    let rotating = rotary_delta(start, end, axes) > 0.0;
    trace!(segments = n, sweep = geometry.sweep_degrees(), "expand arc");

    let [u, v, w] = geometry.axes;
    let first = Pose::from_position(start);
    let last = Pose::from_position(end);
    let c = arc.center;

    let mut poses = Vec::with_capacity(n + 1);
    poses.push(first);
    for i in 1..n {
        let t = i as f64 / n as f64;
        let angle = geometry.start_angle + geometry.sweep * t;
        let r = geometry.radius + (geometry.end_radius - geometry.radius) * t;
        let mut position = first.position;
        position[u] = c[u] + r * angle.cos();
        position[v] = c[v] + r * angle.sin();
        position[w] = first.position[w] + geometry.helix * t;
        let attitude = if rotating {
            orientation(lerp_angles(start, end, t))
        } else {
            first.orientation
        };
        poses.push(Pose::new(position, attitude));
    }
    poses.push(last);
    Ok(poses)
}

/// Expand rotary-only motion: the tip stays at `start` while the orientation turns
pub fn expand_rotary(
    start: &Position,
    end: &Position,
    axes: &AxisSet,
    steps_per_degree: f64,
) -> Vec<Pose> {
    let first = Pose::from_position(start);
    if start == end {
        return vec![first];
    }
    let n = segment_count(rotary_delta(start, end, axes), steps_per_degree.abs());
    let mut poses = Vec::with_capacity(n + 1);
    poses.push(first);
    for i in 1..n {
        let t = i as f64 / n as f64;
        poses.push(Pose::new(first.position, orientation(lerp_angles(start, end, t))));
    }
    poses.push(Pose::new(first.position, orientation(end.rotary())));
    poses
}
