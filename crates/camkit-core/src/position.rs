//! Nine-axis machine position

use crate::axis::{Axis, AxisKind};
use crate::units::{Angle, Length, Units};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of every axis coordinate
///
/// Equality is exact and field-wise. Callers that need a tolerance must
/// round before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: Length,
    pub y: Length,
    pub z: Length,
    pub a: Angle,
    pub b: Angle,
    pub c: Angle,
    pub u: Length,
    pub v: Length,
    pub w: Length,
}

impl Position {
    /// Machine origin
    pub fn origin() -> Self {
        Self::default()
    }

    /// Position with only the primary Cartesian axes set, in millimetres
    pub fn from_xyz_mm(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Length::mm(x),
            y: Length::mm(y),
            z: Length::mm(z),
            ..Self::default()
        }
    }

    /// Canonical value of an axis: millimetres for linear kinds, degrees for rotary
    pub fn get(&self, kind: AxisKind) -> f64 {
        match kind {
            AxisKind::X => self.x.as_mm(),
            AxisKind::Y => self.y.as_mm(),
            AxisKind::Z => self.z.as_mm(),
            AxisKind::A => self.a.as_degrees(),
            AxisKind::B => self.b.as_degrees(),
            AxisKind::C => self.c.as_degrees(),
            AxisKind::U => self.u.as_mm(),
            AxisKind::V => self.v.as_mm(),
            AxisKind::W => self.w.as_mm(),
        }
    }

    /// Set an axis from its canonical value
    pub fn set(&mut self, kind: AxisKind, value: f64) {
        match kind {
            AxisKind::X => self.x = Length::mm(value),
            AxisKind::Y => self.y = Length::mm(value),
            AxisKind::Z => self.z = Length::mm(value),
            AxisKind::A => self.a = Angle::degrees(value),
            AxisKind::B => self.b = Angle::degrees(value),
            AxisKind::C => self.c = Angle::degrees(value),
            AxisKind::U => self.u = Length::mm(value),
            AxisKind::V => self.v = Length::mm(value),
            AxisKind::W => self.w = Length::mm(value),
        }
    }

    /// Canonical value of an axis word interpreted in `units`
    pub fn canonical(axis: &Axis, units: Units) -> f64 {
        if axis.kind().is_linear() {
            units.to_mm(axis.value())
        } else {
            axis.value()
        }
    }

    /// Move an axis to an absolute coordinate
    pub fn with_axis(mut self, axis: &Axis, units: Units) -> Self {
        self.set(axis.kind(), Self::canonical(axis, units));
        self
    }

    /// Move an axis by an incremental distance
    pub fn offset_axis(mut self, axis: &Axis, units: Units) -> Self {
        let kind = axis.kind();
        self.set(kind, self.get(kind) + Self::canonical(axis, units));
        self
    }

    /// Primary Cartesian coordinates in millimetres
    pub fn cartesian(&self) -> Point3<f64> {
        Point3::new(self.x.as_mm(), self.y.as_mm(), self.z.as_mm())
    }

    /// Rotary coordinates `[A, B, C]` in degrees
    pub fn rotary(&self) -> [f64; 3] {
        [self.a.as_degrees(), self.b.as_degrees(), self.c.as_degrees()]
    }

    /// Euclidean distance over every linear axis, in millimetres
    pub fn linear_distance(&self, other: &Position) -> f64 {
        AxisKind::ALL
            .iter()
            .filter(|k| k.is_linear())
            .map(|k| (other.get(*k) - self.get(*k)).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Largest rotary delta, in degrees
    pub fn max_rotary_delta(&self, other: &Position) -> f64 {
        [AxisKind::A, AxisKind::B, AxisKind::C]
            .iter()
            .map(|k| (other.get(*k) - self.get(*k)).abs())
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X:{:.3} Y:{:.3} Z:{:.3} A:{:.3} B:{:.3} C:{:.3} U:{:.3} V:{:.3} W:{:.3}",
            self.x.as_mm(),
            self.y.as_mm(),
            self.z.as_mm(),
            self.a.as_degrees(),
            self.b.as_degrees(),
            self.c.as_degrees(),
            self.u.as_mm(),
            self.v.as_mm(),
            self.w.as_mm()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_equality() {
        let p = Position::from_xyz_mm(1.0, 2.0, 3.0);
        let mut q = p;
        assert_eq!(p, q);
        q.z = Length::mm(3.0 + 1e-12);
        assert_ne!(p, q);
    }

    #[test]
    fn test_with_axis_converts_units() {
        let p = Position::origin().with_axis(&Axis::x(1.0), Units::Imperial);
        assert_eq!(p.x.as_mm(), 25.4);

        let p = p.with_axis(&Axis::a(90.0), Units::Imperial);
        assert_eq!(p.a.as_degrees(), 90.0);
    }

    #[test]
    fn test_offset_axis_accumulates() {
        let p = Position::from_xyz_mm(10.0, 0.0, 0.0).offset_axis(&Axis::x(-2.5), Units::Metric);
        assert_eq!(p.x.as_mm(), 7.5);
    }

    #[test]
    fn test_distances() {
        let p = Position::origin();
        let q = Position::from_xyz_mm(3.0, 4.0, 0.0).with_axis(&Axis::b(-45.0), Units::Metric);
        assert_eq!(p.linear_distance(&q), 5.0);
        assert_eq!(p.max_rotary_delta(&q), 45.0);
    }
}
