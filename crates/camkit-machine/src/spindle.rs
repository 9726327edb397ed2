//! Spindle speed table and torque curve

use camkit_core::{LimitError, Result, Torque};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Default normalisation tolerance (RPM)
pub const DEFAULT_TOLERANCE: f64 = 100.0;

/// Attainable spindle speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpindleEntry {
    /// Any speed in the closed range
    Range { start: u32, end: u32 },
    /// One fixed speed
    Discrete(u32),
}

impl SpindleEntry {
    pub fn start(&self) -> u32 {
        match *self {
            SpindleEntry::Range { start, .. } => start,
            SpindleEntry::Discrete(v) => v,
        }
    }

    pub fn end(&self) -> u32 {
        match *self {
            SpindleEntry::Range { end, .. } => end,
            SpindleEntry::Discrete(v) => v,
        }
    }

    pub fn contains(&self, rpm: f64) -> bool {
        rpm >= f64::from(self.start()) && rpm <= f64::from(self.end())
    }

    fn overlaps(&self, other: &SpindleEntry) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }

    /// Signed offset from `rpm` to the closest edge; zero when contained
    pub fn distance(&self, rpm: f64) -> f64 {
        let (start, end) = (f64::from(self.start()), f64::from(self.end()));
        if rpm < start {
            start - rpm
        } else if rpm > end {
            end - rpm
        } else {
            0.0
        }
    }
}

impl fmt::Display for SpindleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpindleEntry::Range { start, end } => write!(f, "{start}-{end} RPM"),
            SpindleEntry::Discrete(v) => write!(f, "{v} RPM"),
        }
    }
}

/// One point of the torque curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueSample {
    pub rpm: f64,
    pub torque: Torque,
}

/// Spindle speed table with tolerance-based normalisation
#[derive(Debug, Clone, PartialEq)]
pub struct Spindle {
    entries: Vec<SpindleEntry>,
    torque: Vec<TorqueSample>,
    tolerance: f64,
}

impl Default for Spindle {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            torque: Vec::new(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Spindle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_range(&mut self, start: u32, end: u32) -> Result<()> {
        if start > end {
            return Err(LimitError::InvalidSpindleRange { start, end }.into());
        }
        self.insert(SpindleEntry::Range { start, end })
    }

    pub fn add_discrete(&mut self, rpm: u32) -> Result<()> {
        self.insert(SpindleEntry::Discrete(rpm))
    }

    fn insert(&mut self, entry: SpindleEntry) -> Result<()> {
        if self.entries.iter().any(|e| e.overlaps(&entry)) {
            return Err(LimitError::OverlappingSpindleEntry {
                start: entry.start(),
                end: entry.end(),
            }
            .into());
        }
        let at = self.entries.partition_point(|e| e.start() < entry.start());
        self.entries.insert(at, entry);
        Ok(())
    }

    /// Add a torque sample, replacing any sample at the same speed
    pub fn add_torque_sample(&mut self, rpm: f64, torque: Torque) {
        match self
            .torque
            .binary_search_by(|s| s.rpm.total_cmp(&rpm))
        {
            Ok(i) => self.torque[i].torque = torque,
            Err(i) => self.torque.insert(i, TorqueSample { rpm, torque }),
        }
    }

    pub fn set_tolerance(&mut self, rpm: f64) {
        self.tolerance = rpm.abs();
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn entries(&self) -> &[SpindleEntry] {
        &self.entries
    }

    pub fn torque_samples(&self) -> &[TorqueSample] {
        &self.torque
    }

    /// Map a requested speed to the closest attainable one
    ///
    /// With an empty table every speed is attainable. Otherwise the request
    /// moves to the nearest entry edge, provided that edge is within the
    /// tolerance.
    pub fn normalise(&self, requested: f64) -> Result<f64> {
        if self.entries.is_empty() || self.entries.iter().any(|e| e.contains(requested)) {
            return Ok(requested);
        }
        let mut best = 0.0;
        let mut best_abs = f64::INFINITY;
        for entry in &self.entries {
            let d = entry.distance(requested);
            if d.abs() < best_abs {
                best = d;
                best_abs = d.abs();
            }
        }
        if best_abs > self.tolerance {
            return Err(LimitError::SpindleSpeedUnattainable {
                requested,
                nearest: requested + best,
                distance: best,
                tolerance: self.tolerance,
            }
            .into());
        }
        debug!(requested, normalised = requested + best, "spindle speed normalised");
        Ok(requested + best)
    }

    /// Torque at `rpm` from the sampled curve
    ///
    /// Between samples the curve is linear; outside it the two closest
    /// samples are extended.
    pub fn torque_at(&self, rpm: f64) -> Result<Torque> {
        let n = self.torque.len();
        if n < 2 {
            return Err(LimitError::InsufficientTorqueSamples { count: n }.into());
        }
        let upper = self.torque.partition_point(|s| s.rpm < rpm);
        if let Some(s) = self.torque.get(upper).filter(|s| s.rpm == rpm) {
            return Ok(s.torque);
        }
        let i = upper.clamp(1, n - 1);
        let (lo, hi) = (&self.torque[i - 1], &self.torque[i]);
        let t = (rpm - lo.rpm) / (hi.rpm - lo.rpm);
        let nm = lo.torque.as_newton_metres()
            + (hi.torque.as_newton_metres() - lo.torque.as_newton_metres()) * t;
        Ok(Torque::newton_metres(nm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_core::Error;

    #[test]
    fn test_empty_table_passes_through() {
        assert_eq!(Spindle::new().normalise(12345.0).unwrap(), 12345.0);
    }

    #[test]
    fn test_normalise_inside_near_far() {
        let mut spindle = Spindle::new();
        spindle.add_range(1000, 5000).unwrap();
        spindle.add_discrete(300).unwrap();

        assert_eq!(spindle.normalise(2500.0).unwrap(), 2500.0);
        assert_eq!(spindle.normalise(300.0).unwrap(), 300.0);
        assert_eq!(spindle.normalise(305.0).unwrap(), 300.0);
        assert_eq!(spindle.normalise(5050.0).unwrap(), 5000.0);
        assert_eq!(spindle.normalise(950.0).unwrap(), 1000.0);

        match spindle.normalise(650.0) {
            Err(Error::Limit(LimitError::SpindleSpeedUnattainable {
                nearest, distance, ..
            })) => {
                assert_eq!(nearest, 300.0);
                assert_eq!(distance, -350.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_ties_go_to_lower_entry() {
        let mut spindle = Spindle::new();
        spindle.add_discrete(200).unwrap();
        spindle.add_discrete(100).unwrap();
        assert_eq!(spindle.entries()[0], SpindleEntry::Discrete(100));
        assert_eq!(spindle.normalise(150.0).unwrap(), 100.0);
    }

    #[test]
    fn test_tolerance() {
        let mut spindle = Spindle::new();
        spindle.add_discrete(1000).unwrap();
        spindle.set_tolerance(10.0);
        assert!(spindle.normalise(1011.0).is_err());
        assert_eq!(spindle.normalise(1010.0).unwrap(), 1000.0);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut spindle = Spindle::new();
        spindle.add_range(100, 200).unwrap();
        assert!(spindle.add_range(150, 300).is_err());
        assert!(spindle.add_discrete(200).is_err());
        assert!(spindle.add_range(300, 250).is_err());
        spindle.add_range(201, 300).unwrap();
        assert_eq!(spindle.entries().len(), 2);
    }

    #[test]
    fn test_torque_midpoint_and_extrapolation() {
        let mut spindle = Spindle::new();
        assert!(spindle.torque_at(1000.0).is_err());
        spindle.add_torque_sample(1000.0, Torque::newton_metres(2.0));
        assert!(spindle.torque_at(1000.0).is_err());
        spindle.add_torque_sample(3000.0, Torque::newton_metres(4.0));

        assert_eq!(spindle.torque_at(2000.0).unwrap(), Torque::newton_metres(3.0));
        assert_eq!(spindle.torque_at(3000.0).unwrap(), Torque::newton_metres(4.0));
        assert_eq!(spindle.torque_at(4000.0).unwrap(), Torque::newton_metres(5.0));
        assert_eq!(spindle.torque_at(0.0).unwrap(), Torque::newton_metres(1.0));

        spindle.add_torque_sample(3000.0, Torque::newton_metres(6.0));
        assert_eq!(spindle.torque_samples().len(), 2);
        assert_eq!(spindle.torque_at(2000.0).unwrap(), Torque::newton_metres(4.0));
    }
}
