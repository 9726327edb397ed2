//! Solid modelling interface
//!
//! The simulation only talks to geometry through [`Solid`]. Implementations
//! are value types: every operation returns a new solid, and clones are
//! expected to be cheap until one of them is mutated.

use camkit_core::Result;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned bounding box in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty slice
    pub fn from_points(points: &[Point3<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut aabb = Self::new(*first, *first);
        for p in &points[1..] {
            aabb.include(p);
        }
        Some(aabb)
    }

    /// Grow to contain `p`
    pub fn include(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e.x * e.y * e.z
    }

    /// The eight corner points
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}]-[{:.3}, {:.3}, {:.3}]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

/// Boolean-closed solid
pub trait Solid: Clone + fmt::Debug + PartialEq {
    fn is_empty(&self) -> bool;

    fn union(&self, other: &Self) -> Self;

    fn difference(&self, other: &Self) -> Self;

    fn intersection(&self, other: &Self) -> Self;

    /// Everything inside `within` that is not part of `self`
    fn complement(&self, within: &Aabb) -> Self;

    /// Rotate about the origin
    fn rotate(&self, rotation: &UnitQuaternion<f64>) -> Self;

    fn translate(&self, offset: &Vector3<f64>) -> Self;

    /// Uniform scale about the origin; `factor` must be positive
    fn scale(&self, factor: f64) -> Result<Self>;

    /// Solid swept by moving `self`'s origin along the polyline `path`
    fn glide(&self, path: &[Point3<f64>]) -> Result<Self>;

    /// Volume in cubic millimetres
    fn volume(&self) -> f64;

    fn bounding_box(&self) -> Option<Aabb>;

    /// True when the boundary is 2-manifold
    fn is_valid(&self) -> bool;

    /// Repair non-manifold regions
    fn regularized(&self) -> Self;

    /// Subtract `other` in place, keeping the result only if it is valid
    ///
    /// Returns the removed volume, or `None` when the regularised result was
    /// still invalid and `self` was left unchanged.
    fn subtract_valid(&mut self, other: &Self) -> Option<f64> {
        let candidate = self.difference(other).regularized();
        if !candidate.is_valid() {
            return None;
        }
        let removed = self.volume() - candidate.volume();
        *self = candidate;
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let pts = [
            Point3::new(1.0, -2.0, 3.0),
            Point3::new(-1.0, 4.0, 0.0),
            Point3::new(0.0, 0.0, 5.0),
        ];
        let b = Aabb::from_points(&pts).unwrap();
        assert_eq!(b.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Point3::new(1.0, 4.0, 5.0));
        assert_eq!(b.volume(), 2.0 * 6.0 * 5.0);
        assert!(b.contains(&Point3::new(0.0, 0.0, 0.0)));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn test_aabb_union() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(2.0, -1.0, 0.5), Point3::new(3.0, 0.0, 0.7));
        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(0.0, -1.0, 0.0));
        assert_eq!(u.max, Point3::new(3.0, 1.0, 1.0));
    }
}
