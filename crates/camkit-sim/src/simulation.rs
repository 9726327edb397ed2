//! Material Removal Simulation
//!
//! Drives a tool solid along an expanded pose sequence and subtracts the
//! swept volume from the stock, one adjacent pose pair at a time.

use crate::pose::Pose;
use crate::solid::{Aabb, Solid};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// How removed volume is accounted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsMode {
    /// No volume or bounding box bookkeeping
    Off,
    /// Volume delta recorded for every step
    PerStep,
    /// One volume delta for the whole path
    #[default]
    Batch,
}

/// Outcome of one pose pair
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// Stock updated; `volume` and `bounds` are set in per-step mode
    Removed {
        volume: Option<f64>,
        /// Stock bounds after this step, `None` once the stock is empty
        bounds: Option<Aabb>,
    },
    /// The tool could not be swept; the step was skipped
    SweepFailed { reason: String },
    /// The subtraction left a non-manifold solid; stock unchanged for this step
    NonManifold,
}

impl StepStatus {
    pub fn is_removed(&self) -> bool {
        matches!(self, StepStatus::Removed { .. })
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Removed { volume: Some(v), .. } => write!(f, "removed {v:.3} mm³"),
            StepStatus::Removed { volume: None, .. } => write!(f, "removed"),
            StepStatus::SweepFailed { reason } => write!(f, "sweep failed: {reason}"),
            StepStatus::NonManifold => write!(f, "non-manifold result"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Index of the first pose of the pair
    pub index: usize,
    pub status: StepStatus,
}

/// Result of simulating one path
#[derive(Debug, Clone)]
pub struct SimulationReport<S> {
    /// Stock after every successful step
    pub stock: S,
    pub steps: Vec<StepReport>,
    /// Total removed volume (mm³); `None` with statistics off
    pub removed_volume: Option<f64>,
    /// Stock bounds after the run; `None` with statistics off or empty stock
    pub bounding_box: Option<Aabb>,
}

impl<S> SimulationReport<S> {
    /// Steps that did not update the stock
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.status.is_removed())
    }

    pub fn is_clean(&self) -> bool {
        self.failed_steps().next().is_none()
    }
}

/// Sweeps a tool through pose pairs against a stock solid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulator {
    pub statistics: StatisticsMode,
}

impl Simulator {
    pub fn new(statistics: StatisticsMode) -> Self {
        Self { statistics }
    }

    /// Simulate `poses` against `stock`
    ///
    /// `tool` is modelled with its tip at the origin and its axis along +Z.
    /// Paths with fewer than two poses leave the stock untouched.
    pub fn run<S: Solid>(&self, stock: &S, tool: &S, poses: &[Pose]) -> SimulationReport<S> {
        let mut current = stock.clone();
        let mut steps = Vec::with_capacity(poses.len().saturating_sub(1));
        let initial_volume = match self.statistics {
            StatisticsMode::Batch => Some(current.volume()),
            _ => None,
        };
        let mut per_step_total = 0.0;
        let mut oriented: Option<(nalgebra::UnitQuaternion<f64>, S)> = None;

        for (index, pair) in poses.windows(2).enumerate() {
            let (s0, s1) = (&pair[0], &pair[1]);

            let rotated = match &oriented {
                Some((q, solid)) if *q == s0.orientation => solid.clone(),
                _ => {
                    let solid = tool.rotate(&s0.orientation);
                    oriented = Some((s0.orientation, solid.clone()));
                    solid
                }
            };

            let swept = match rotated.glide(&[s0.position, s1.position]) {
                Ok(swept) => swept,
                Err(e) => {
                    warn!(step = index, error = %e, "sweep failed, skipping step");
                    steps.push(StepReport {
                        index,
                        status: StepStatus::SweepFailed {
                            reason: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let status = match current.subtract_valid(&swept) {
                Some(removed) => {
                    let (volume, bounds) = match self.statistics {
                        StatisticsMode::PerStep => {
                            per_step_total += removed;
                            (Some(removed), current.bounding_box())
                        }
                        _ => (None, None),
                    };
                    StepStatus::Removed { volume, bounds }
                }
                None => {
                    warn!(step = index, "subtraction is not manifold, stock left unchanged");
                    StepStatus::NonManifold
                }
            };
            steps.push(StepReport { index, status });
        }

        let removed_volume = match self.statistics {
            StatisticsMode::Off => None,
            StatisticsMode::PerStep => Some(per_step_total),
            StatisticsMode::Batch => initial_volume.map(|v| v - current.volume()),
        };
        let bounding_box = match self.statistics {
            StatisticsMode::Off => None,
            _ => current.bounding_box(),
        };
        debug!(
            steps = steps.len(),
            removed = ?removed_volume,
            "simulation finished"
        );

        SimulationReport {
            stock: current,
            steps,
            removed_volume,
            bounding_box,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::expand_linear;
    use crate::voxel::VoxelSolid;
    use camkit_core::{AxisSet, GeometryError, Position, Result};
    use nalgebra::{Point3, UnitQuaternion, Vector3};

    fn stock() -> VoxelSolid {
        VoxelSolid::cuboid(Point3::origin(), Point3::new(10.0, 10.0, 5.0), 1.0).unwrap()
    }

    fn tool() -> VoxelSolid {
        VoxelSolid::cuboid(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 10.0), 1.0).unwrap()
    }

    fn slot() -> Vec<Pose> {
        expand_linear(
            &Position::from_xyz_mm(3.0, 5.0, 3.0),
            &Position::from_xyz_mm(7.0, 5.0, 3.0),
            &AxisSet::mill(),
            1.0,
        )
    }

    #[test]
    fn test_slot_removes_material() {
        let original = stock();
        let report = Simulator::new(StatisticsMode::Batch).run(&original, &tool(), &slot());
        assert_eq!(report.steps.len(), 4);
        assert!(report.is_clean());
        // 6 x 2 x 2 cells removed by a 2 x 2 tool travelling 4 mm at depth 2
        assert_eq!(report.removed_volume, Some(24.0));
        assert!((original.volume() - report.stock.volume() - 24.0).abs() < 1e-9);
        assert!(report.stock.is_valid());
    }

    #[test]
    fn test_per_step_volumes_add_up() {
        let original = stock();
        let report = Simulator::new(StatisticsMode::PerStep).run(&original, &tool(), &slot());
        let sum: f64 = report
            .steps
            .iter()
            .filter_map(|s| match s.status {
                StepStatus::Removed { volume, .. } => volume,
                _ => None,
            })
            .sum();
        assert_eq!(report.removed_volume, Some(sum));
        assert!((original.volume() - report.stock.volume() - sum).abs() < 1e-9);
    }

    #[test]
    fn test_per_step_bounds_track_stock() {
        let original = stock();
        let report = Simulator::new(StatisticsMode::PerStep).run(&original, &tool(), &slot());
        let bounds: Vec<Aabb> = report
            .steps
            .iter()
            .filter_map(|s| match &s.status {
                StepStatus::Removed { bounds, .. } => *bounds,
                _ => None,
            })
            .collect();
        assert_eq!(bounds.len(), report.steps.len());
        // A slot through the middle never shrinks the outer box
        assert!(bounds.iter().all(|b| *b == original.bounding_box().unwrap()));
        assert_eq!(bounds.last().copied(), report.bounding_box);

        let batch = Simulator::new(StatisticsMode::Batch).run(&original, &tool(), &slot());
        assert!(batch
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Removed { volume: None, bounds: None }));
    }

    #[test]
    fn test_statistics_off() {
        let report = Simulator::new(StatisticsMode::Off).run(&stock(), &tool(), &slot());
        assert_eq!(report.removed_volume, None);
        assert_eq!(report.bounding_box, None);
    }

    #[test]
    fn test_single_pose_leaves_stock_untouched() {
        let original = stock();
        let poses = [Pose::from_position(&Position::from_xyz_mm(5.0, 5.0, 0.0))];
        let report = Simulator::default().run(&original, &tool(), &poses);
        assert!(report.steps.is_empty());
        assert_eq!(report.stock, original);
        assert_eq!(report.removed_volume, Some(0.0));
    }

    #[test]
    fn test_empty_tool_skips_steps() {
        let original = stock();
        let empty = VoxelSolid::new(1.0).unwrap();
        let report = Simulator::default().run(&original, &empty, &slot());
        assert_eq!(report.failed_steps().count(), 4);
        assert!(matches!(
            report.steps[0].status,
            StepStatus::SweepFailed { .. }
        ));
        assert_eq!(report.stock, original);
    }

    /// Solid whose boolean results are never manifold
    #[derive(Debug, Clone, PartialEq)]
    struct Brittle(f64);

    impl Solid for Brittle {
        fn is_empty(&self) -> bool {
            self.0 <= 0.0
        }
        fn union(&self, other: &Self) -> Self {
            Brittle(self.0 + other.0)
        }
        fn difference(&self, other: &Self) -> Self {
            Brittle(-other.0)
        }
        fn intersection(&self, _: &Self) -> Self {
            Brittle(-1.0)
        }
        fn complement(&self, _: &Aabb) -> Self {
            Brittle(-self.0)
        }
        fn rotate(&self, _: &UnitQuaternion<f64>) -> Self {
            self.clone()
        }
        fn translate(&self, _: &Vector3<f64>) -> Self {
            self.clone()
        }
        fn scale(&self, factor: f64) -> Result<Self> {
            Ok(Brittle(self.0 * factor.powi(3)))
        }
        fn glide(&self, path: &[Point3<f64>]) -> Result<Self> {
            if path.is_empty() {
                return Err(GeometryError::EmptyProfile.into());
            }
            Ok(self.clone())
        }
        fn volume(&self) -> f64 {
            self.0
        }
        fn bounding_box(&self) -> Option<Aabb> {
            None
        }
        fn is_valid(&self) -> bool {
            !self.0.is_sign_negative()
        }
        fn regularized(&self) -> Self {
            self.clone()
        }
    }

    #[test]
    fn test_non_manifold_step_keeps_stock() {
        let report = Simulator::default().run(&Brittle(100.0), &Brittle(1.0), &slot());
        assert_eq!(report.stock, Brittle(100.0));
        assert!(report
            .steps
            .iter()
            .all(|s| s.status == StepStatus::NonManifold));
        assert_eq!(report.removed_volume, Some(0.0));
    }
}
