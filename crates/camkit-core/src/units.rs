//! Unit systems and typed physical quantities
//!
//! Every quantity stores a single canonical value (millimetres, degrees,
//! millimetres per minute, newton metres, seconds) and converts to the
//! Metric or Imperial presentation on demand. Nothing here carries
//! implicit conversions: callers construct quantities through named unit
//! constructors and read them back through named getters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Millimetres in one inch
pub const MM_PER_INCH: f64 = 25.4;

/// Degrees swept by one spindle revolution
pub const DEGREES_PER_REV: f64 = 360.0;

/// Newton metres in one pound-foot
pub const NM_PER_LBF_FT: f64 = 1.355_817_948_331_400_4;

/// Measurement system used to interpret linear values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimetres
    #[default]
    Metric,
    /// Inches
    Imperial,
}

impl Units {
    /// Convert a value expressed in these units to millimetres
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            Self::Metric => value,
            Self::Imperial => value * MM_PER_INCH,
        }
    }

    /// Convert a millimetre value to these units
    pub fn from_mm(self, mm: f64) -> f64 {
        match self {
            Self::Metric => mm,
            Self::Imperial => mm / MM_PER_INCH,
        }
    }

    /// Short label for the linear unit
    pub fn label(self) -> &'static str {
        match self {
            Self::Metric => "mm",
            Self::Imperial => "in",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "Metric"),
            Self::Imperial => write!(f, "Imperial"),
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "mm" => Ok(Self::Metric),
            "imperial" | "inch" | "in" => Ok(Self::Imperial),
            _ => Err(format!("Unknown measurement system: {}", s)),
        }
    }
}

macro_rules! quantity_ops {
    ($name:ident) => {
        impl $name {
            /// The zero quantity
            pub const ZERO: Self = Self(0.0);

            /// Absolute magnitude
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// True when the canonical value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }
    };
}

/// Linear distance, stored in millimetres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Length(f64);

impl Length {
    /// Length in millimetres
    pub const fn mm(value: f64) -> Self {
        Self(value)
    }

    /// Length in inches
    pub fn inches(value: f64) -> Self {
        Self(value * MM_PER_INCH)
    }

    /// Length expressed in the given units
    pub fn from_units(value: f64, units: Units) -> Self {
        Self(units.to_mm(value))
    }

    /// Value in millimetres
    pub fn as_mm(self) -> f64 {
        self.0
    }

    /// Value in inches
    pub fn as_inches(self) -> f64 {
        self.0 / MM_PER_INCH
    }

    /// Value in the given units
    pub fn in_units(self, units: Units) -> f64 {
        units.from_mm(self.0)
    }
}

quantity_ops!(Length);

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mm", self.0)
    }
}

/// Plane angle, stored in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(f64);

impl Angle {
    /// Angle in degrees
    pub const fn degrees(value: f64) -> Self {
        Self(value)
    }

    /// Angle in radians
    pub fn radians(value: f64) -> Self {
        Self(value.to_degrees())
    }

    /// Value in degrees
    pub fn as_degrees(self) -> f64 {
        self.0
    }

    /// Value in radians
    pub fn as_radians(self) -> f64 {
        self.0.to_radians()
    }
}

quantity_ops!(Angle);

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Linear velocity, stored in millimetres per minute
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Velocity(f64);

impl Velocity {
    /// Velocity in millimetres per minute
    pub const fn mm_per_min(value: f64) -> Self {
        Self(value)
    }

    /// Velocity in inches per minute
    pub fn inches_per_min(value: f64) -> Self {
        Self(value * MM_PER_INCH)
    }

    /// Velocity in units-per-minute of the given system
    pub fn from_units(value: f64, units: Units) -> Self {
        Self(units.to_mm(value))
    }

    /// Value in millimetres per minute
    pub fn as_mm_per_min(self) -> f64 {
        self.0
    }

    /// Value in units-per-minute of the given system
    pub fn in_units(self, units: Units) -> f64 {
        units.from_mm(self.0)
    }
}

quantity_ops!(Velocity);

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mm/min", self.0)
    }
}

/// Angular velocity, stored in degrees per minute
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AngularVelocity(f64);

impl AngularVelocity {
    /// Angular velocity in degrees per minute
    pub const fn degrees_per_min(value: f64) -> Self {
        Self(value)
    }

    /// Angular velocity in revolutions per minute
    pub fn rpm(value: f64) -> Self {
        Self(value * DEGREES_PER_REV)
    }

    /// Value in degrees per minute
    pub fn as_degrees_per_min(self) -> f64 {
        self.0
    }

    /// Value in revolutions per minute
    pub fn as_rpm(self) -> f64 {
        self.0 / DEGREES_PER_REV
    }
}

quantity_ops!(AngularVelocity);

impl fmt::Display for AngularVelocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} °/min", self.0)
    }
}

/// Torque, stored in newton metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Torque(f64);

impl Torque {
    /// Torque in newton metres
    pub const fn newton_metres(value: f64) -> Self {
        Self(value)
    }

    /// Torque in pound-feet
    pub fn pound_feet(value: f64) -> Self {
        Self(value * NM_PER_LBF_FT)
    }

    /// Value in newton metres
    pub fn as_newton_metres(self) -> f64 {
        self.0
    }

    /// Value in pound-feet
    pub fn as_pound_feet(self) -> f64 {
        self.0 / NM_PER_LBF_FT
    }
}

quantity_ops!(Torque);

impl fmt::Display for Torque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} N·m", self.0)
    }
}

/// Duration, stored in seconds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(f64);

impl Time {
    /// Time in seconds
    pub const fn seconds(value: f64) -> Self {
        Self(value)
    }

    /// Time in minutes
    pub fn minutes(value: f64) -> Self {
        Self(value * 60.0)
    }

    /// Value in seconds
    pub fn as_seconds(self) -> f64 {
        self.0
    }

    /// Value in minutes
    pub fn as_minutes(self) -> f64 {
        self.0 / 60.0
    }
}

quantity_ops!(Time);

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_from_str() {
        assert_eq!("mm".parse::<Units>().unwrap(), Units::Metric);
        assert_eq!("Inch".parse::<Units>().unwrap(), Units::Imperial);
        assert!("furlong".parse::<Units>().is_err());
    }

    #[test]
    fn test_length_conversions() {
        let one_inch = Length::inches(1.0);
        assert_eq!(one_inch.as_mm(), 25.4);
        assert!((one_inch.as_inches() - 1.0).abs() < 1e-12);
        assert_eq!(Length::from_units(2.0, Units::Imperial).as_mm(), 50.8);
        assert_eq!(Length::mm(50.8).in_units(Units::Imperial), 2.0);
    }

    #[test]
    fn test_angle_radians() {
        let a = Angle::radians(std::f64::consts::PI);
        assert!((a.as_degrees() - 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_rpm_round_trip() {
        let w = AngularVelocity::rpm(1000.0);
        assert_eq!(w.as_degrees_per_min(), 360_000.0);
        assert_eq!(w.as_rpm(), 1000.0);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let a = Length::mm(3.0) + Length::mm(4.5) - Length::mm(0.5);
        assert_eq!(a, Length::mm(7.0));
        assert_eq!((-a).abs(), a);
        assert_eq!(Time::minutes(1.5).as_seconds(), 90.0);
    }
}
