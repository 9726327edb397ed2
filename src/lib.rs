//! # CamKit
//!
//! A CAM driver for CNC machine tools. Given rapid, linear and arc motion
//! commands it:
//! - maintains the modal state of a CNC controller,
//! - emits a G-code program reproducing that state,
//! - expands each move into tool poses and simulates material removal
//!   against a stock solid.
//!
//! ## Architecture
//!
//! CamKit is organized as a workspace with multiple crates:
//!
//! 1. **camkit-core** - Units, axes, positions, machine state, tools, errors
//! 2. **camkit-gcode** - Words, lines, blocks and program rendering
//! 3. **camkit-sim** - Path kinematics, voxel solids, removal simulation
//! 4. **camkit-machine** - The modal controller, spindle, limits, config
//! 5. **camkit** - This facade, re-exporting the public API

pub use camkit_core as core;
pub use camkit_gcode as gcode;
pub use camkit_machine as machine;
pub use camkit_sim as sim;

pub use camkit_core::{
    is_linear, Angle, AngularVelocity, ArcDirection, Axis, AxisKind, AxisSet, ControllerError,
    CoordinateSystem, Error, FeedRateMode, GeometryError, Length, LimitError, MachineState,
    MachineType, Motion, Offset, OffsetKind, Plane, Position, Result, Rotation, Time, Tool,
    ToolTable, ToolType, Torque, Units, Velocity,
};
pub use camkit_gcode::{
    Block, LetterCase, Line, LineCallback, LineEnding, Program, ProgramOptions, Word,
};
pub use camkit_machine::{
    FeedRateLimits, LimitTable, Machine, MachineConfig, RapidLimits, RestoreMask, Spindle,
    SpindleEntry, Travel,
};
pub use camkit_sim::{
    expand_arc, expand_linear, expand_rotary, Aabb, ArcMotion, FaceVertexMesh, Pose,
    SimulationReport, Simulator, Solid, StatisticsMode, StepStatus, VoxelSolid,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support (default level `info`)
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Initialize logging as one JSON object per event on stderr
///
/// Intended for batch runs whose output is collected by other tools.
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_logging_initialises_once() {
        // Either this call installs the subscriber or another test already did
        let first = init_logging();
        assert!(init_logging().is_err() || first.is_err());
    }
}
