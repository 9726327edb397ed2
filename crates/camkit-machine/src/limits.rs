//! Travel, feed-rate and rapid limits
//!
//! A [`LimitTable`] holds per-axis bounds for linear and rotary axes plus a
//! global linear bound used for linear axes without their own entry.
//! Rotary axes never fall back to the global value.

use camkit_core::{Angle, AngularVelocity, AxisKind, Length, LimitError, Result, Velocity};
use std::collections::BTreeMap;

/// Quantity usable as a limit, compared in canonical units
pub trait Bound: Copy + std::fmt::Debug + PartialEq {
    /// Value in mm, degrees, mm/min or degrees/min
    fn canonical(self) -> f64;
}

impl Bound for Length {
    fn canonical(self) -> f64 {
        self.as_mm()
    }
}

impl Bound for Angle {
    fn canonical(self) -> f64 {
        self.as_degrees()
    }
}

impl Bound for Velocity {
    fn canonical(self) -> f64 {
        self.as_mm_per_min()
    }
}

impl Bound for AngularVelocity {
    fn canonical(self) -> f64 {
        self.as_degrees_per_min()
    }
}

/// Per-axis bounds for linear (`L`) and rotary (`R`) axes
#[derive(Debug, Clone, PartialEq)]
pub struct LimitTable<L, R> {
    linear: BTreeMap<AxisKind, L>,
    rotary: BTreeMap<AxisKind, R>,
    global: Option<L>,
}

impl<L, R> Default for LimitTable<L, R> {
    fn default() -> Self {
        Self {
            linear: BTreeMap::new(),
            rotary: BTreeMap::new(),
            global: None,
        }
    }
}

/// Maximum coordinate magnitude per axis
pub type Travel = LimitTable<Length, Angle>;

/// Maximum cutting feed per axis
pub type FeedRateLimits = LimitTable<Velocity, AngularVelocity>;

/// Maximum rapid rate per axis
pub type RapidLimits = LimitTable<Velocity, AngularVelocity>;

impl<L: Bound, R: Bound> LimitTable<L, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_axis_linear(&mut self, kind: AxisKind, bound: L) -> Result<()> {
        if !kind.is_linear() {
            return Err(LimitError::NotLinearAxis { axis: kind.letter() }.into());
        }
        self.linear.insert(kind, bound);
        Ok(())
    }

    pub fn set_axis_rotary(&mut self, kind: AxisKind, bound: R) -> Result<()> {
        if !kind.is_rotary() {
            return Err(LimitError::NotRotaryAxis { axis: kind.letter() }.into());
        }
        self.rotary.insert(kind, bound);
        Ok(())
    }

    pub fn set_global(&mut self, bound: L) {
        self.global = Some(bound);
    }

    pub fn global(&self) -> Option<L> {
        self.global
    }

    /// Effective bound for a linear axis
    pub fn linear_bound(&self, kind: AxisKind) -> Option<L> {
        if !kind.is_linear() {
            return None;
        }
        self.linear.get(&kind).copied().or(self.global)
    }

    /// Bound for a rotary axis
    pub fn rotary_bound(&self, kind: AxisKind) -> Option<R> {
        self.rotary.get(&kind).copied()
    }

    /// Effective bound for any axis in canonical units
    pub fn bound(&self, kind: AxisKind) -> Option<f64> {
        if kind.is_linear() {
            self.linear_bound(kind).map(Bound::canonical)
        } else {
            self.rotary_bound(kind).map(Bound::canonical)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty() && self.rotary.is_empty() && self.global.is_none()
    }
}

impl Travel {
    /// Check an absolute target coordinate in canonical units
    pub fn check(&self, kind: AxisKind, requested: f64) -> Result<()> {
        match self.bound(kind) {
            Some(limit) if requested.abs() > limit => Err(LimitError::TravelExceeded {
                axis: kind.letter(),
                requested,
                limit,
            }
            .into()),
            _ => Ok(()),
        }
    }
}

impl LimitTable<Velocity, AngularVelocity> {
    pub fn check_linear(&self, kind: AxisKind, requested: Velocity) -> Result<()> {
        Self::exceeds(kind, requested.as_mm_per_min(), self.linear_bound(kind).map(Bound::canonical))
    }

    pub fn check_rotary(&self, kind: AxisKind, requested: AngularVelocity) -> Result<()> {
        Self::exceeds(
            kind,
            requested.as_degrees_per_min(),
            self.rotary_bound(kind).map(Bound::canonical),
        )
    }

    fn exceeds(kind: AxisKind, requested: f64, limit: Option<f64>) -> Result<()> {
        match limit {
            Some(limit) if requested > limit => Err(LimitError::FeedRateExceeded {
                axis: kind.letter(),
                requested,
                limit,
            }
            .into()),
            _ => Ok(()),
        }
    }
}
