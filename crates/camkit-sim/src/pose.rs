//! Tool poses

use camkit_core::Position;
use nalgebra::{Point3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Cartesian tool-tip position (mm) and tool orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose for a machine position: XYZ for the tip, A/B/C for the attitude
    pub fn from_position(position: &Position) -> Self {
        Self::new(position.cartesian(), orientation(position.rotary()))
    }
}

/// Orientation for rotary angles `[A, B, C]` in degrees
///
/// A rotates about X, B about Y and C about Z, applied in that order.
pub fn orientation(angles: [f64; 3]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(
        angles[0].to_radians(),
        angles[1].to_radians(),
        angles[2].to_radians(),
    )
}
