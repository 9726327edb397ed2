//! Machine configuration
//!
//! A [`MachineConfig`] describes everything needed to build a
//! [`Machine`](crate::Machine): kinematics layout, spindle table, limits,
//! simulation settings and program formatting. Files may be JSON or TOML;
//! the format follows the extension. All limits are in canonical units
//! (mm, degrees, mm/min, degrees/min).

use crate::limits::{Bound, LimitTable};
use crate::spindle::{Spindle, TorqueSample, DEFAULT_TOLERANCE};
use camkit_core::{
    Angle, AngularVelocity, AxisKind, AxisSet, Error, Length, MachineType, Result, Units,
    Velocity,
};
use camkit_gcode::ProgramOptions;
use camkit_sim::{KinematicsConfig, StatisticsMode, DEFAULT_RESOLUTION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Expansion and material removal settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Voxel pitch for stock and tool solids (mm)
    pub resolution: f64,
    pub kinematics: KinematicsConfig,
    pub statistics: StatisticsMode,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            kinematics: KinematicsConfig::default(),
            statistics: StatisticsMode::default(),
        }
    }
}

/// Closed spindle speed range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub start: u32,
    pub end: u32,
}

/// Spindle table as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpindleConfig {
    pub ranges: Vec<SpeedRange>,
    pub discrete: Vec<u32>,
    /// Normalisation tolerance in RPM
    pub tolerance: f64,
    pub torque: Vec<TorqueSample>,
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            discrete: Vec::new(),
            tolerance: DEFAULT_TOLERANCE,
            torque: Vec::new(),
        }
    }
}

impl SpindleConfig {
    pub fn build(&self) -> Result<Spindle> {
        let mut spindle = Spindle::new();
        for range in &self.ranges {
            spindle.add_range(range.start, range.end)?;
        }
        for rpm in &self.discrete {
            spindle.add_discrete(*rpm)?;
        }
        for sample in &self.torque {
            spindle.add_torque_sample(sample.rpm, sample.torque);
        }
        spindle.set_tolerance(self.tolerance);
        Ok(spindle)
    }
}

/// Bounds for one limit table, keyed by axis letter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisLimits {
    /// Fallback for linear axes without their own entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<f64>,
    pub axes: BTreeMap<String, f64>,
}

impl AxisLimits {
    fn validate(&self, name: &str) -> Result<()> {
        if let Some(g) = self.global {
            if !(g.is_finite() && g > 0.0) {
                return Err(Error::config(format!("{name} global limit must be > 0")));
            }
        }
        for (letter, value) in &self.axes {
            letter
                .parse::<AxisKind>()
                .map_err(|_| Error::config(format!("{name}: unknown axis '{letter}'")))?;
            if !(value.is_finite() && *value > 0.0) {
                return Err(Error::config(format!("{name} limit for {letter} must be > 0")));
            }
        }
        Ok(())
    }

    fn build<L: Bound, R: Bound>(
        &self,
        linear: impl Fn(f64) -> L,
        rotary: impl Fn(f64) -> R,
    ) -> Result<LimitTable<L, R>> {
        let mut table = LimitTable::new();
        if let Some(g) = self.global {
            table.set_global(linear(g));
        }
        for (letter, value) in &self.axes {
            let kind: AxisKind = letter
                .parse()
                .map_err(|_| Error::config(format!("unknown axis '{letter}'")))?;
            if kind.is_linear() {
                table.set_axis_linear(kind, linear(*value))?;
            } else {
                table.set_axis_rotary(kind, rotary(*value))?;
            }
        }
        Ok(table)
    }

    pub fn travel(&self) -> Result<LimitTable<Length, Angle>> {
        self.build(Length::mm, Angle::degrees)
    }

    pub fn rates(&self) -> Result<LimitTable<Velocity, AngularVelocity>> {
        self.build(Velocity::mm_per_min, AngularVelocity::degrees_per_min)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub travel: AxisLimits,
    pub feed_rate: AxisLimits,
    pub rapid: AxisLimits,
}

/// Complete machine description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub machine_type: MachineType,
    pub units: Units,
    /// Configured axes; the machine type's default set when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes: Option<AxisSet>,
    pub spindle: SpindleConfig,
    pub limits: LimitsConfig,
    pub simulation: SimulationSettings,
    pub program: ProgramOptions,
}

impl MachineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Axes the machine will accept
    pub fn axis_set(&self) -> AxisSet {
        match &self.axes {
            Some(axes) => axes.clone(),
            None => match self.machine_type {
                MachineType::Mill => AxisSet::mill(),
                MachineType::Lathe => AxisSet::lathe(),
            },
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(Error::config("Config file must be .json or .toml"));
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)?
        } else {
            return Err(Error::config("Config file must be .json or .toml"));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.axis_set().is_empty() {
            return Err(Error::config("At least one axis must be configured"));
        }

        let sim = &self.simulation;
        if !(sim.resolution.is_finite() && sim.resolution > 0.0) {
            return Err(Error::config("Simulation resolution must be > 0"));
        }
        let arc = sim.kinematics.arc_steps_per_degree;
        if !(arc.is_finite() && arc > 0.0) {
            return Err(Error::config("Arc steps per degree must be > 0"));
        }
        let rotary = sim.kinematics.rotary_steps_per_degree;
        if !(rotary.is_finite() && rotary > 0.0) {
            return Err(Error::config("Rotary steps per degree must be > 0"));
        }
        if !sim.kinematics.linear_steps_per_mm.is_finite() {
            return Err(Error::config("Linear steps per mm must be finite"));
        }

        if self.spindle.tolerance < 0.0 {
            return Err(Error::config("Spindle tolerance must be >= 0"));
        }
        if let Some(r) = self.spindle.ranges.iter().find(|r| r.start > r.end) {
            return Err(Error::config(format!(
                "Spindle range {}-{} is inverted",
                r.start, r.end
            )));
        }

        self.limits.travel.validate("Travel")?;
        self.limits.feed_rate.validate("Feed rate")?;
        self.limits.rapid.validate("Rapid")?;

        if self.program.precision > 12 {
            return Err(Error::config("Program precision must be <= 12"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MachineConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.axis_set(), AxisSet::mill());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = MachineConfig::new();
        config.simulation.resolution = 0.0;
        assert!(config.validate().is_err());

        let mut config = MachineConfig::new();
        config.limits.travel.axes.insert("Q".into(), 10.0);
        assert!(config.validate().is_err());

        let mut config = MachineConfig::new();
        config.spindle.ranges.push(SpeedRange { start: 10, end: 5 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limits_build() {
        let mut limits = AxisLimits::default();
        limits.global = Some(500.0);
        limits.axes.insert("Z".into(), 100.0);
        limits.axes.insert("A".into(), 360.0);
        let travel = limits.travel().unwrap();
        assert_eq!(travel.bound(AxisKind::X), Some(500.0));
        assert_eq!(travel.bound(AxisKind::Z), Some(100.0));
        assert_eq!(travel.bound(AxisKind::A), Some(360.0));
        assert_eq!(travel.bound(AxisKind::B), None);
    }

    #[test]
    fn test_spindle_build() {
        let config = SpindleConfig {
            ranges: vec![SpeedRange { start: 1000, end: 2000 }],
            discrete: vec![300],
            tolerance: 50.0,
            torque: Vec::new(),
        };
        let spindle = config.build().unwrap();
        assert_eq!(spindle.entries().len(), 2);
        assert_eq!(spindle.tolerance(), 50.0);
    }

    #[test]
    fn test_unknown_extension() {
        let config = MachineConfig::new();
        assert!(config.save_to_file(Path::new("machine.yaml")).is_err());
    }
}
