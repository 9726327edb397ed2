//! Error handling for CamKit
//!
//! Errors are grouped by how a caller is expected to react to them:
//! - Controller errors: a precondition of the requested operation does not hold
//! - Limit errors: the request is well formed but physically unattainable
//! - Geometry errors: path expansion or solid modelling could not produce a result
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Controller precondition violation
///
/// Raised before any state change or program emission takes place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// A cutting move was requested with the spindle stopped
    #[error("Spindle is stopped")]
    SpindleStopped,

    /// A cutting move was requested with a zero feed rate
    #[error("Feed rate is zero")]
    ZeroFeedRate,

    /// A cutting move was requested with no tool in the spindle
    #[error("No tool loaded")]
    NoToolLoaded,

    /// Tool id not present in the tool table
    #[error("Tool {tool_id} not found")]
    UnknownTool {
        /// The requested tool id.
        tool_id: u32,
    },

    /// Tool built for another kind of machine
    #[error("Tool {tool_id} is a {tool_class} tool and cannot be used on a {machine}")]
    ToolClassMismatch {
        /// The requested tool id.
        tool_id: u32,
        /// Machine type the tool is made for.
        tool_class: String,
        /// Machine type of the controller.
        machine: String,
    },

    /// Tool id 0 is reserved for the empty spindle
    #[error("Tool id 0 is reserved for the empty spindle")]
    ReservedToolId,

    /// Axis not configured on this machine
    #[error("Axis {axis} is not available on this machine")]
    UnknownAxis {
        /// The axis letter.
        axis: char,
    },

    /// Axis given more than once in one command
    #[error("Axis {axis} specified more than once")]
    DuplicateAxis {
        /// The axis letter.
        axis: char,
    },

    /// Axis cannot take part in an arc in the active plane
    #[error("Axis {axis} is not valid for an arc in the {plane} plane")]
    InvalidArcAxis {
        /// The axis letter.
        axis: char,
        /// The active plane.
        plane: String,
    },

    /// Offset is not valid in the active plane, or given twice
    #[error("Offset {offset} is not valid for an arc in the {plane} plane")]
    InvalidArcOffset {
        /// The offset letter.
        offset: char,
        /// The active plane.
        plane: String,
    },

    /// Arcs are only defined in the XY, ZX and YZ planes
    #[error("Arcs are not supported in the {plane} plane")]
    UnsupportedArcPlane {
        /// The active plane.
        plane: String,
    },

    /// Pop or discard with no saved state
    #[error("State stack is empty")]
    EmptyStateStack,

    /// The "active" coordinate system sentinel was selected explicitly
    #[error("The active coordinate system cannot be selected explicitly")]
    ActiveCoordinateSystem,

    /// Position restore requested at block end
    #[error("Position restore is not supported: position diverged from {expected} to {actual}")]
    PositionRestoreUnsupported {
        /// Position captured at block start.
        expected: String,
        /// Live position.
        actual: String,
    },
}

/// Out-of-tolerance physical request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LimitError {
    /// No spindle entry within tolerance of the request
    #[error(
        "Spindle speed {requested} RPM unattainable: nearest is {nearest} RPM ({distance} RPM away, tolerance {tolerance} RPM)"
    )]
    SpindleSpeedUnattainable {
        /// Requested speed.
        requested: f64,
        /// Closest attainable speed.
        nearest: f64,
        /// Signed distance from the request to `nearest`.
        distance: f64,
        /// Configured tolerance.
        tolerance: f64,
    },

    /// Requested feed rate is above the configured limit
    #[error("Feed rate {requested} exceeds the {axis} limit of {limit}")]
    FeedRateExceeded {
        /// Axis the limit applies to.
        axis: char,
        /// Requested rate in canonical units.
        requested: f64,
        /// Configured limit in canonical units.
        limit: f64,
    },

    /// Target coordinate is beyond the axis travel
    #[error("Travel on {axis} to {requested} exceeds the limit of {limit}")]
    TravelExceeded {
        /// Axis the limit applies to.
        axis: char,
        /// Requested coordinate in canonical units.
        requested: f64,
        /// Configured travel in canonical units.
        limit: f64,
    },

    /// Torque lookup needs at least two samples
    #[error("Torque curve needs at least 2 samples, found {count}")]
    InsufficientTorqueSamples {
        /// Number of samples present.
        count: usize,
    },

    /// New spindle entry intersects an existing one
    #[error("Spindle entry {start}-{end} overlaps an existing entry")]
    OverlappingSpindleEntry {
        /// Entry start.
        start: u32,
        /// Entry end.
        end: u32,
    },

    /// Range with start above end
    #[error("Invalid spindle range {start}-{end}")]
    InvalidSpindleRange {
        /// Range start.
        start: u32,
        /// Range end.
        end: u32,
    },

    /// Linear bound set on a rotary axis
    #[error("Axis {axis} is not a linear axis")]
    NotLinearAxis {
        /// The axis letter.
        axis: char,
    },

    /// Rotary bound set on a linear axis
    #[error("Axis {axis} is not a rotary axis")]
    NotRotaryAxis {
        /// The axis letter.
        axis: char,
    },
}

/// Path expansion or solid modelling failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Start point coincides with the arc centre
    #[error("Arc radius is zero")]
    ZeroRadiusArc,

    /// Start and end are not the same distance from the centre
    #[error("Arc end radius {end_radius} differs from start radius {start_radius}")]
    NonEquidistantArc {
        /// Distance from centre to start, mm.
        start_radius: f64,
        /// Distance from centre to end, mm.
        end_radius: f64,
    },

    /// Arc turn count must be at least one
    #[error("Arc turn count must be at least 1, got {turns}")]
    InvalidTurns {
        /// The requested count.
        turns: u32,
    },

    /// Plane with no arc definition
    #[error("Plane {plane} has no arc definition")]
    UnsupportedPlane {
        /// The plane.
        plane: String,
    },

    /// Sweep did not yield a closed solid
    #[error("Sweep failed: {reason}")]
    SweepFailed {
        /// Why the sweep failed.
        reason: String,
    },

    /// Boolean result is not 2-manifold
    #[error("Solid is not 2-manifold")]
    NonManifold,

    /// Scale factor must be positive and finite
    #[error("Invalid scale factor {factor}")]
    InvalidScale {
        /// The rejected factor.
        factor: f64,
    },

    /// Lattice pitch must be positive and finite
    #[error("Invalid resolution {resolution}")]
    InvalidResolution {
        /// The rejected resolution.
        resolution: f64,
    },

    /// Sweep profile contains no points
    #[error("Sweep path is empty")]
    EmptyProfile,

    /// Mesh text could not be parsed
    #[error("Mesh format error at line {line}: {reason}")]
    MeshFormat {
        /// One-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

/// Main error type for CamKit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Controller precondition error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Physical limit error
    #[error(transparent)]
    Limit(#[from] LimitError),

    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialisation error
    #[error("TOML serialisation error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check if this is a precondition violation
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Controller(_))
    }

    /// Check if this is an out-of-tolerance request
    pub fn is_limit(&self) -> bool {
        matches!(self, Error::Limit(_))
    }

    /// Check if this is a geometry failure
    pub fn is_geometry(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
