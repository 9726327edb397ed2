//! # CamKit Sim
//!
//! Path kinematics and stock removal. Commanded moves are expanded into
//! [`Pose`] sequences, and the [`Simulator`] sweeps a tool solid along
//! them to carve a stock modelled by the [`Solid`] kernel. [`VoxelSolid`]
//! is the bundled kernel: a sparse cubic lattice with copy-on-write cells.

pub mod kinematics;
pub mod mesh;
pub mod pose;
pub mod simulation;
pub mod solid;
pub mod voxel;

pub use kinematics::{
    expand_arc, expand_linear, expand_rotary, ArcGeometry, ArcMotion, KinematicsConfig,
};
pub use mesh::FaceVertexMesh;
pub use pose::{orientation, Pose};
pub use simulation::{SimulationReport, Simulator, StatisticsMode, StepReport, StepStatus};
pub use solid::{Aabb, Solid};
pub use voxel::{Cell, VoxelSolid, DEFAULT_RESOLUTION};
