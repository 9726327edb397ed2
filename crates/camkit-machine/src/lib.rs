//! # CamKit Machine
//!
//! The modal CNC controller. A [`Machine`] keeps the controller state,
//! emits the G-code program that reproduces it, and runs every cutting
//! move through path expansion and stock simulation.
//!
//! Supporting components:
//! - [`Spindle`]: attainable speed table and torque curve
//! - [`LimitTable`]: travel, feed-rate and rapid bounds
//! - [`MachineConfig`]: JSON/TOML machine description

pub mod config;
pub mod limits;
pub mod machine;
pub mod spindle;

pub use config::{
    AxisLimits, LimitsConfig, MachineConfig, SimulationSettings, SpeedRange, SpindleConfig,
};
pub use limits::{Bound, FeedRateLimits, LimitTable, RapidLimits, Travel};
pub use machine::{Machine, RestoreMask};
pub use spindle::{Spindle, SpindleEntry, TorqueSample, DEFAULT_TOLERANCE};
