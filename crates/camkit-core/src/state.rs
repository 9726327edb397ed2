//! Modal controller state
//!
//! [`MachineState`] is a value snapshot of every modal setting plus the
//! volatile values (feed rate, spindle speed, tool, position) that block
//! restore needs to compare against.

use crate::position::Position;
use crate::units::Units;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of machine being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineType {
    #[default]
    Mill,
    Lathe,
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mill => write!(f, "Mill"),
            Self::Lathe => write!(f, "Lathe"),
        }
    }
}

/// Active plane for arcs and canned cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Plane {
    /// G17
    #[default]
    XY,
    /// G18
    ZX,
    /// G19
    YZ,
    /// G17.1
    UV,
    /// G18.1
    WU,
    /// G19.1
    VW,
}

impl Plane {
    /// True for the planes arc motion is defined in
    pub fn supports_arcs(self) -> bool {
        matches!(self, Plane::XY | Plane::ZX | Plane::YZ)
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::XY => "XY",
            Self::ZX => "ZX",
            Self::YZ => "YZ",
            Self::UV => "UV",
            Self::WU => "WU",
            Self::VW => "VW",
        };
        write!(f, "{}", name)
    }
}

/// Distance mode for axis words (G90/G91) or arc centres (G90.1/G91.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motion {
    #[default]
    Absolute,
    Incremental,
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "Absolute"),
            Self::Incremental => write!(f, "Incremental"),
        }
    }
}

/// How the F word is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedRateMode {
    /// G93, F is the inverse of the move time in minutes
    InverseTime,
    /// G94
    #[default]
    UnitsPerMinute,
    /// G95
    UnitsPerRevolution,
}

impl fmt::Display for FeedRateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InverseTime => write!(f, "Inverse Time"),
            Self::UnitsPerMinute => write!(f, "Units per Minute"),
            Self::UnitsPerRevolution => write!(f, "Units per Revolution"),
        }
    }
}

/// Work coordinate system
///
/// `Active` stands for "whatever is currently selected" and is never a
/// valid target for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordinateSystem {
    Active,
    /// G54
    #[default]
    P1,
    /// G55
    P2,
    /// G56
    P3,
    /// G57
    P4,
    /// G58
    P5,
    /// G59
    P6,
    /// G59.1
    P7,
    /// G59.2
    P8,
    /// G59.3
    P9,
}

impl CoordinateSystem {
    /// One-based index of a concrete coordinate system
    pub fn index(self) -> Option<u8> {
        match self {
            Self::Active => None,
            Self::P1 => Some(1),
            Self::P2 => Some(2),
            Self::P3 => Some(3),
            Self::P4 => Some(4),
            Self::P5 => Some(5),
            Self::P6 => Some(6),
            Self::P7 => Some(7),
            Self::P8 => Some(8),
            Self::P9 => Some(9),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "P{}", i),
            None => write!(f, "Active"),
        }
    }
}

/// Spindle rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// M5
    #[default]
    Stop,
    /// M3
    Clockwise,
    /// M4
    CounterClockwise,
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "Stop"),
            Self::Clockwise => write!(f, "Clockwise"),
            Self::CounterClockwise => write!(f, "Counter-Clockwise"),
        }
    }
}

/// Arc direction (G2/G3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

impl fmt::Display for ArcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clockwise => write!(f, "Clockwise"),
            Self::CounterClockwise => write!(f, "Counter-Clockwise"),
        }
    }
}

/// Modal and volatile controller state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    pub units: Units,
    pub plane: Plane,
    pub coordinate_system: CoordinateSystem,
    pub motion: Motion,
    pub arc_motion: Motion,
    pub feed_rate_mode: FeedRateMode,
    pub spindle_rotation: Rotation,
    /// Feed rate in current units, interpreted per `feed_rate_mode`
    pub feed_rate: f64,
    /// Spindle speed in RPM
    pub spindle_speed: f64,
    /// Loaded tool, 0 when the spindle is empty
    pub current_tool: u32,
    pub current_position: Position,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            plane: Plane::XY,
            coordinate_system: CoordinateSystem::P1,
            motion: Motion::Absolute,
            arc_motion: Motion::Incremental,
            feed_rate_mode: FeedRateMode::UnitsPerMinute,
            spindle_rotation: Rotation::Stop,
            feed_rate: 0.0,
            spindle_speed: 0.0,
            current_tool: 0,
            current_position: Position::origin(),
        }
    }
}

impl MachineState {
    /// Initial state for a machine type: lathes work in ZX with per-revolution feeds
    pub fn for_machine(machine_type: MachineType, units: Units) -> Self {
        let mut state = Self {
            units,
            ..Self::default()
        };
        if machine_type == MachineType::Lathe {
            state.plane = Plane::ZX;
            state.feed_rate_mode = FeedRateMode::UnitsPerRevolution;
        }
        state
    }

    /// True when only the modal fields are compared equal
    pub fn same_modes(&self, other: &MachineState) -> bool {
        self.units == other.units
            && self.plane == other.plane
            && self.coordinate_system == other.coordinate_system
            && self.motion == other.motion
            && self.arc_motion == other.arc_motion
            && self.feed_rate_mode == other.feed_rate_mode
            && self.spindle_rotation == other.spindle_rotation
    }
}
