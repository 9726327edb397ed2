//! Axis and arc-offset values
//!
//! An axis value is one tagged word of a motion command: a kind from the
//! closed set `X Y Z A B C U V W` and a scalar. Linear kinds carry a length in
//! the controller's current units, rotary kinds carry degrees.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Machine axis slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxisKind {
    X,
    Y,
    Z,
    A,
    B,
    C,
    U,
    V,
    W,
}

impl AxisKind {
    /// Every axis kind, in word order
    pub const ALL: [AxisKind; 9] = [
        AxisKind::X,
        AxisKind::Y,
        AxisKind::Z,
        AxisKind::A,
        AxisKind::B,
        AxisKind::C,
        AxisKind::U,
        AxisKind::V,
        AxisKind::W,
    ];

    /// True for every kind except the rotary `A`, `B` and `C`
    pub fn is_linear(self) -> bool {
        !self.is_rotary()
    }

    /// True for `A`, `B` and `C`
    pub fn is_rotary(self) -> bool {
        matches!(self, AxisKind::A | AxisKind::B | AxisKind::C)
    }

    /// G-code word letter
    pub fn letter(self) -> char {
        match self {
            AxisKind::X => 'X',
            AxisKind::Y => 'Y',
            AxisKind::Z => 'Z',
            AxisKind::A => 'A',
            AxisKind::B => 'B',
            AxisKind::C => 'C',
            AxisKind::U => 'U',
            AxisKind::V => 'V',
            AxisKind::W => 'W',
        }
    }
}

/// Free-function form of [`AxisKind::is_linear`]
pub fn is_linear(kind: AxisKind) -> bool {
    kind.is_linear()
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for AxisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        AxisKind::ALL
            .iter()
            .copied()
            .find(|k| upper.len() == 1 && upper.starts_with(k.letter()))
            .ok_or_else(|| format!("Unknown axis: {}", s))
    }
}

/// One axis word of a motion command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    kind: AxisKind,
    value: f64,
}

impl Axis {
    /// Create an axis value of any kind
    pub fn new(kind: AxisKind, value: f64) -> Self {
        debug_assert!(value.is_finite(), "axis value must be finite");
        Self { kind, value }
    }

    pub fn x(value: f64) -> Self {
        Self::new(AxisKind::X, value)
    }

    pub fn y(value: f64) -> Self {
        Self::new(AxisKind::Y, value)
    }

    pub fn z(value: f64) -> Self {
        Self::new(AxisKind::Z, value)
    }

    pub fn a(value: f64) -> Self {
        Self::new(AxisKind::A, value)
    }

    pub fn b(value: f64) -> Self {
        Self::new(AxisKind::B, value)
    }

    pub fn c(value: f64) -> Self {
        Self::new(AxisKind::C, value)
    }

    pub fn u(value: f64) -> Self {
        Self::new(AxisKind::U, value)
    }

    pub fn v(value: f64) -> Self {
        Self::new(AxisKind::V, value)
    }

    pub fn w(value: f64) -> Self {
        Self::new(AxisKind::W, value)
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Arc centre offset slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OffsetKind {
    I,
    J,
    K,
}

impl OffsetKind {
    /// G-code word letter
    pub fn letter(self) -> char {
        match self {
            OffsetKind::I => 'I',
            OffsetKind::J => 'J',
            OffsetKind::K => 'K',
        }
    }

    /// The linear axis this offset runs along
    pub fn axis(self) -> AxisKind {
        match self {
            OffsetKind::I => AxisKind::X,
            OffsetKind::J => AxisKind::Y,
            OffsetKind::K => AxisKind::Z,
        }
    }
}

impl fmt::Display for OffsetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Arc centre offset, always linear and in current units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    kind: OffsetKind,
    value: f64,
}

impl Offset {
    pub fn new(kind: OffsetKind, value: f64) -> Self {
        debug_assert!(value.is_finite(), "offset value must be finite");
        Self { kind, value }
    }

    pub fn i(value: f64) -> Self {
        Self::new(OffsetKind::I, value)
    }

    pub fn j(value: f64) -> Self {
        Self::new(OffsetKind::J, value)
    }

    pub fn k(value: f64) -> Self {
        Self::new(OffsetKind::K, value)
    }

    pub fn kind(&self) -> OffsetKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// The axes a machine is built with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxisSet(BTreeSet<AxisKind>);

impl AxisSet {
    /// X, Y and Z
    pub fn mill() -> Self {
        [AxisKind::X, AxisKind::Y, AxisKind::Z].into_iter().collect()
    }

    /// X and Z
    pub fn lathe() -> Self {
        [AxisKind::X, AxisKind::Z].into_iter().collect()
    }

    /// All nine axes
    pub fn all() -> Self {
        AxisKind::ALL.into_iter().collect()
    }

    pub fn contains(&self, kind: AxisKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn insert(&mut self, kind: AxisKind) -> bool {
        self.0.insert(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = AxisKind> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any of `A`, `B`, `C` is present
    pub fn has_rotary(&self) -> bool {
        self.0.iter().any(|k| k.is_rotary())
    }
}

impl FromIterator<AxisKind> for AxisSet {
    fn from_iter<T: IntoIterator<Item = AxisKind>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for AxisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in &self.0 {
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_abc_are_rotary() {
        let rotary: Vec<_> = AxisKind::ALL.iter().filter(|k| !is_linear(**k)).collect();
        assert_eq!(rotary, vec![&AxisKind::A, &AxisKind::B, &AxisKind::C]);
    }

    #[test]
    fn test_axis_letter_round_trip() {
        for kind in AxisKind::ALL {
            assert_eq!(kind.letter().to_string().parse::<AxisKind>().unwrap(), kind);
        }
        assert!("Q".parse::<AxisKind>().is_err());
        assert!("XY".parse::<AxisKind>().is_err());
    }

    #[test]
    fn test_axis_set_defaults() {
        let mill = AxisSet::mill();
        assert!(mill.contains(AxisKind::Y));
        assert!(!mill.has_rotary());
        assert_eq!(AxisSet::lathe().to_string(), "XZ");
        assert_eq!(AxisSet::all().len(), 9);
    }

    #[test]
    fn test_offset_axis_mapping() {
        assert_eq!(Offset::k(1.0).kind().axis(), AxisKind::Z);
        assert_eq!(OffsetKind::J.letter(), 'J');
    }
}
