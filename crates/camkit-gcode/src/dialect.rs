//! Word constructors for the target dialect
//!
//! Every modal value maps to exactly one word. The functions are pure and
//! build a fresh [`Word`] on each call.

use crate::word::Word;
use camkit_core::{
    ArcDirection, Axis, CoordinateSystem, FeedRateMode, Motion, Offset, Plane, Rotation, Units,
};

pub fn rapid_word() -> Word {
    Word::new('G', 0.0)
}

pub fn linear_word() -> Word {
    Word::new('G', 1.0)
}

pub fn arc_word(direction: ArcDirection) -> Word {
    match direction {
        ArcDirection::Clockwise => Word::new('G', 2.0),
        ArcDirection::CounterClockwise => Word::new('G', 3.0),
    }
}

pub fn dwell_word() -> Word {
    Word::new('G', 4.0)
}

pub fn plane_word(plane: Plane) -> Word {
    let code = match plane {
        Plane::XY => 17.0,
        Plane::ZX => 18.0,
        Plane::YZ => 19.0,
        Plane::UV => 17.1,
        Plane::WU => 18.1,
        Plane::VW => 19.1,
    };
    Word::new('G', code)
}

pub fn units_word(units: Units) -> Word {
    match units {
        Units::Imperial => Word::new('G', 20.0),
        Units::Metric => Word::new('G', 21.0),
    }
}

pub fn cutter_compensation_cancel_word() -> Word {
    Word::new('G', 40.0)
}

/// G54..G59.3, or `None` for the active sentinel
pub fn coordinate_system_word(system: CoordinateSystem) -> Option<Word> {
    let code = match system {
        CoordinateSystem::Active => return None,
        CoordinateSystem::P1 => 54.0,
        CoordinateSystem::P2 => 55.0,
        CoordinateSystem::P3 => 56.0,
        CoordinateSystem::P4 => 57.0,
        CoordinateSystem::P5 => 58.0,
        CoordinateSystem::P6 => 59.0,
        CoordinateSystem::P7 => 59.1,
        CoordinateSystem::P8 => 59.2,
        CoordinateSystem::P9 => 59.3,
    };
    Some(Word::new('G', code))
}

pub fn canned_cycle_cancel_word() -> Word {
    Word::new('G', 80.0)
}

pub fn motion_word(motion: Motion) -> Word {
    match motion {
        Motion::Absolute => Word::new('G', 90.0),
        Motion::Incremental => Word::new('G', 91.0),
    }
}

pub fn arc_motion_word(motion: Motion) -> Word {
    match motion {
        Motion::Absolute => Word::new('G', 90.1),
        Motion::Incremental => Word::new('G', 91.1),
    }
}

pub fn feed_rate_mode_word(mode: FeedRateMode) -> Word {
    match mode {
        FeedRateMode::InverseTime => Word::new('G', 93.0),
        FeedRateMode::UnitsPerMinute => Word::new('G', 94.0),
        FeedRateMode::UnitsPerRevolution => Word::new('G', 95.0),
    }
}

pub fn spindle_word(rotation: Rotation) -> Word {
    match rotation {
        Rotation::Clockwise => Word::new('M', 3.0),
        Rotation::CounterClockwise => Word::new('M', 4.0),
        Rotation::Stop => Word::new('M', 5.0),
    }
}

pub fn spindle_speed_word(rpm: f64) -> Word {
    Word::new('S', rpm)
}

pub fn feed_word(rate: f64) -> Word {
    Word::new('F', rate)
}

pub fn tool_word(id: u32) -> Word {
    Word::new('T', f64::from(id))
}

pub fn tool_change_word() -> Word {
    Word::new('M', 6.0)
}

pub fn program_end_word() -> Word {
    Word::new('M', 30.0)
}

pub fn axis_word(axis: &Axis) -> Word {
    Word::new(axis.kind().letter(), axis.value())
}

pub fn offset_word(offset: &Offset) -> Word {
    Word::new(offset.kind().letter(), offset.value())
}

/// P word carrying an arc turn count or dwell time
pub fn p_word(value: f64) -> Word {
    Word::new('P', value)
}
