//! # CamKit Core
//!
//! Core types shared by every CamKit crate: typed physical quantities,
//! axis and offset words, the nine-axis [`Position`], the modal
//! [`MachineState`], tool descriptions and the error taxonomy.

pub mod axis;
pub mod error;
pub mod position;
pub mod state;
pub mod tools;
pub mod units;

pub use axis::{is_linear, Axis, AxisKind, AxisSet, Offset, OffsetKind};
pub use error::{ControllerError, Error, GeometryError, LimitError, Result};
pub use position::Position;
pub use state::{
    ArcDirection, CoordinateSystem, FeedRateMode, MachineState, MachineType, Motion, Plane,
    Rotation,
};
pub use tools::{
    init_lathe_table, init_standard_table, standard_table_for, Tool, ToolTable, ToolType,
};
pub use units::{Angle, AngularVelocity, Length, Time, Torque, Units, Velocity};
