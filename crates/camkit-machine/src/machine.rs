//! Modal machine controller
//!
//! [`Machine`] is the single stateful entry point. It owns the modal state,
//! the tool table, the spindle, the limit tables, the stock solid and the
//! emitted program. Every public operation validates first, then mutates
//! state, emits G-code, expands the move and, for cutting moves, simulates
//! material removal. A failed validation leaves state and program untouched.

use crate::config::{MachineConfig, SimulationSettings};
use crate::limits::{FeedRateLimits, RapidLimits, Travel};
use crate::spindle::Spindle;
use bitflags::bitflags;
use camkit_core::{
    standard_table_for, ArcDirection, AngularVelocity, Axis, AxisKind, AxisSet,
    ControllerError, CoordinateSystem, FeedRateMode, MachineState, MachineType, Motion, Offset,
    OffsetKind, Plane, Position, Result, Rotation, Time, Tool, ToolTable, Units, Velocity,
};
use camkit_gcode::{dialect, Line, LineCallback, Program, ProgramOptions, Word};
use camkit_sim::{
    expand_arc, expand_linear, expand_rotary, ArcGeometry, ArcMotion, Pose, Simulator, Solid,
    VoxelSolid,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

bitflags! {
    /// Parts of the block-start state re-established by [`Machine::end_block`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RestoreMask: u16 {
        const UNITS = 1 << 0;
        const PLANE = 1 << 1;
        const COORDINATE_SYSTEM = 1 << 2;
        const MOTION = 1 << 3;
        const ARC_MOTION = 1 << 4;
        const FEED_RATE_MODE = 1 << 5;
        const FEED_RATE = 1 << 6;
        const SPINDLE = 1 << 7;
        const TOOL = 1 << 8;
        /// Detected only; restoring position is not supported
        const POSITION = 1 << 9;

        const RESTORE_STATE = Self::UNITS.bits()
            | Self::PLANE.bits()
            | Self::COORDINATE_SYSTEM.bits()
            | Self::MOTION.bits()
            | Self::ARC_MOTION.bits()
            | Self::FEED_RATE_MODE.bits()
            | Self::FEED_RATE.bits()
            | Self::SPINDLE.bits()
            | Self::TOOL.bits();
        const RESTORE_ALL = Self::RESTORE_STATE.bits() | Self::POSITION.bits();
    }
}

impl RestoreMask {
    /// Leave the live state as it is
    pub const PRESERVE_STATE: Self = Self::empty();
}

/// Everything saved by [`Machine::push_state`]
#[derive(Debug, Clone)]
struct Frame {
    state: MachineState,
    tools: ToolTable,
    tool_solids: BTreeMap<u32, VoxelSolid>,
    spindle: Spindle,
    travel: Travel,
    feed_limits: FeedRateLimits,
    rapid_limits: RapidLimits,
    stock: VoxelSolid,
}

/// Modal CNC controller
#[derive(Debug)]
pub struct Machine {
    machine_type: MachineType,
    axes: AxisSet,
    settings: SimulationSettings,
    frame: Frame,
    stack: Vec<Frame>,
    program: Program,
    elapsed_minutes: f64,
    removed_volume: f64,
    last_path: Vec<Pose>,
}

impl Machine {
    /// Machine with the default axes for its type
    pub fn new(machine_type: MachineType, units: Units) -> Self {
        let axes = match machine_type {
            MachineType::Mill => AxisSet::mill(),
            MachineType::Lathe => AxisSet::lathe(),
        };
        Self::with_axes(machine_type, units, axes)
    }

    /// Machine with an explicit axis set
    pub fn with_axes(machine_type: MachineType, units: Units, axes: AxisSet) -> Self {
        let state = MachineState::for_machine(machine_type, units);
        let mut machine = Self {
            machine_type,
            axes,
            settings: SimulationSettings::default(),
            frame: Frame {
                state,
                tools: standard_table_for(machine_type),
                tool_solids: BTreeMap::new(),
                spindle: Spindle::new(),
                travel: Travel::new(),
                feed_limits: FeedRateLimits::new(),
                rapid_limits: RapidLimits::new(),
                stock: VoxelSolid::default(),
            },
            stack: Vec::new(),
            program: Program::new(ProgramOptions::default()),
            elapsed_minutes: 0.0,
            removed_volume: 0.0,
            last_path: Vec::new(),
        };
        machine.emit_preamble();
        info!(
            machine = %machine_type,
            units = %units,
            axes = %machine.axes,
            "machine initialised"
        );
        machine
    }

    /// Machine built from a validated configuration
    pub fn from_config(config: &MachineConfig) -> Result<Self> {
        config.validate()?;
        let mut machine = Self::with_axes(config.machine_type, config.units, config.axis_set());
        machine.settings = config.simulation;
        machine.frame.stock = VoxelSolid::new(config.simulation.resolution)?;
        machine.frame.spindle = config.spindle.build()?;
        machine.frame.travel = config.limits.travel.travel()?;
        machine.frame.feed_limits = config.limits.feed_rate.rates()?;
        machine.frame.rapid_limits = config.limits.rapid.rates()?;
        machine.program.set_options(config.program.clone());
        Ok(machine)
    }

    fn emit_preamble(&mut self) {
        let s = self.frame.state.clone();
        self.program.new_block("Preamble", s.clone());
        self.emit(vec![dialect::plane_word(s.plane)], format!("{} Plane", s.plane));
        self.emit(vec![dialect::units_word(s.units)], s.units.to_string());
        self.emit(
            vec![dialect::cutter_compensation_cancel_word()],
            "Cutter Compensation Off",
        );
        if let Some(word) = dialect::coordinate_system_word(s.coordinate_system) {
            self.emit(
                vec![word],
                format!("Coordinate System {}", s.coordinate_system),
            );
        }
        self.emit(vec![dialect::canned_cycle_cancel_word()], "Canned Cycle Off");
        self.emit(vec![dialect::motion_word(s.motion)], format!("{} Motion", s.motion));
        self.emit(
            vec![dialect::arc_motion_word(s.arc_motion)],
            format!("{} Arc Motion", s.arc_motion),
        );
        self.emit(
            vec![dialect::feed_rate_mode_word(s.feed_rate_mode)],
            format!("{} Mode", s.feed_rate_mode),
        );
        self.emit(vec![dialect::spindle_word(Rotation::Stop)], "Spindle Off");
        self.program.new_block("", s);
    }

    fn emit(&mut self, words: Vec<Word>, comment: impl Into<String>) {
        self.program.add_line(Line::new(words).with_comment(comment));
    }

    // Accessors

    /// Kind of machine being driven
    pub fn machine_type(&self) -> MachineType {
        self.machine_type
    }

    /// Axes this machine accepts
    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    /// Current modal and volatile state
    pub fn state(&self) -> &MachineState {
        &self.frame.state
    }

    /// Current tool position
    pub fn position(&self) -> &Position {
        &self.frame.state.current_position
    }

    /// Expansion and simulation settings
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Registered tools
    pub fn tools(&self) -> &ToolTable {
        &self.frame.tools
    }

    /// Spindle speed table and torque curve
    pub fn spindle(&self) -> &Spindle {
        &self.frame.spindle
    }

    /// Mutable spindle, for adding speed entries and torque samples
    pub fn spindle_mut(&mut self) -> &mut Spindle {
        &mut self.frame.spindle
    }

    /// Mutable travel limits
    pub fn travel_mut(&mut self) -> &mut Travel {
        &mut self.frame.travel
    }

    /// Mutable cutting feed limits
    pub fn feed_limits_mut(&mut self) -> &mut FeedRateLimits {
        &mut self.frame.feed_limits
    }

    /// Mutable rapid rate limits, used for duration estimates
    pub fn rapid_limits_mut(&mut self) -> &mut RapidLimits {
        &mut self.frame.rapid_limits
    }

    /// Program emitted so far
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Render the program as G-code text
    pub fn program_text(&self) -> String {
        self.program.render()
    }

    /// Register or clear the per-line observer
    pub fn set_line_callback(&mut self, callback: Option<LineCallback>) {
        self.program.set_callback(callback);
    }

    /// Current stock solid
    pub fn stock(&self) -> &VoxelSolid {
        &self.frame.stock
    }

    /// Replace the stock; an empty stock disables simulation
    pub fn set_stock(&mut self, stock: VoxelSolid) {
        debug!(volume = stock.volume(), "stock replaced");
        self.frame.stock = stock;
    }

    /// Pose sequence of the most recent move
    pub fn last_path(&self) -> &[Pose] {
        &self.last_path
    }

    /// Accumulated machining time, including dwells
    pub fn estimated_duration(&self) -> Time {
        Time::minutes(self.elapsed_minutes)
    }

    /// Volume removed so far (mm³), `None` with statistics off
    pub fn removed_volume(&self) -> Option<f64> {
        match self.settings.statistics {
            camkit_sim::StatisticsMode::Off => None,
            _ => Some(self.removed_volume),
        }
    }

    /// Number of saved state snapshots
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    // Modal setters

    pub fn set_units(&mut self, units: Units) {
        if self.frame.state.units == units {
            return;
        }
        debug!(%units, "units changed");
        self.frame.state.units = units;
        self.emit(vec![dialect::units_word(units)], units.to_string());
    }

    pub fn set_plane(&mut self, plane: Plane) {
        if self.frame.state.plane == plane {
            return;
        }
        debug!(%plane, "plane changed");
        self.frame.state.plane = plane;
        self.emit(vec![dialect::plane_word(plane)], format!("{plane} Plane"));
    }

    pub fn set_motion(&mut self, motion: Motion) {
        if self.frame.state.motion == motion {
            return;
        }
        debug!(%motion, "motion mode changed");
        self.frame.state.motion = motion;
        self.emit(vec![dialect::motion_word(motion)], format!("{motion} Motion"));
    }

    pub fn set_arc_motion(&mut self, motion: Motion) {
        if self.frame.state.arc_motion == motion {
            return;
        }
        debug!(%motion, "arc motion mode changed");
        self.frame.state.arc_motion = motion;
        self.emit(
            vec![dialect::arc_motion_word(motion)],
            format!("{motion} Arc Motion"),
        );
    }

    pub fn set_feed_rate_mode(&mut self, mode: FeedRateMode) {
        if self.frame.state.feed_rate_mode == mode {
            return;
        }
        debug!(%mode, "feed rate mode changed");
        self.frame.state.feed_rate_mode = mode;
        self.emit(vec![dialect::feed_rate_mode_word(mode)], format!("{mode} Mode"));
    }

    /// Select a work coordinate system; `Active` is rejected
    pub fn set_coordinate_system(&mut self, system: CoordinateSystem) -> Result<()> {
        let word =
            dialect::coordinate_system_word(system).ok_or(ControllerError::ActiveCoordinateSystem)?;
        if self.frame.state.coordinate_system == system {
            return Ok(());
        }
        debug!(%system, "coordinate system changed");
        self.frame.state.coordinate_system = system;
        self.emit(vec![word], format!("Coordinate System {system}"));
        Ok(())
    }

    /// Feed rate in current units, read according to the feed rate mode
    pub fn set_feed_rate(&mut self, rate: f64) {
        if self.frame.state.feed_rate == rate {
            return;
        }
        debug!(rate, "feed rate changed");
        self.frame.state.feed_rate = rate;
        let unit = match self.frame.state.feed_rate_mode {
            FeedRateMode::InverseTime => "1/min".to_string(),
            FeedRateMode::UnitsPerMinute => format!("{}/min", self.frame.state.units.label()),
            FeedRateMode::UnitsPerRevolution => format!("{}/rev", self.frame.state.units.label()),
        };
        self.emit(vec![dialect::feed_word(rate)], format!("Feed Rate {rate} {unit}"));
    }

    /// Start the spindle, returning the normalised speed
    ///
    /// When the spindle table moves the request, the requested speed is kept
    /// as an inline comment on the `S` word.
    pub fn start_spindle(&mut self, rotation: Rotation, rpm: f64) -> Result<f64> {
        if rotation == Rotation::Stop {
            self.stop_spindle();
            return Ok(0.0);
        }
        let speed = self.frame.spindle.normalise(rpm)?;
        let state = &self.frame.state;
        if state.spindle_rotation == rotation && state.spindle_speed == speed {
            return Ok(speed);
        }
        debug!(%rotation, requested = rpm, speed, "spindle started");
        self.frame.state.spindle_rotation = rotation;
        self.frame.state.spindle_speed = speed;

        let mut speed_word = dialect::spindle_speed_word(speed);
        if speed != rpm {
            speed_word = speed_word.with_comment(format!("{rpm} RPM Requested"));
        }
        self.emit(
            vec![dialect::spindle_word(rotation), speed_word],
            format!("Spindle {rotation}"),
        );
        Ok(speed)
    }

    /// `M5`
    pub fn stop_spindle(&mut self) {
        if self.frame.state.spindle_rotation == Rotation::Stop {
            return;
        }
        debug!("spindle stopped");
        self.frame.state.spindle_rotation = Rotation::Stop;
        self.frame.state.spindle_speed = 0.0;
        self.emit(vec![dialect::spindle_word(Rotation::Stop)], "Spindle Off");
    }

    // Tools

    /// Register a tool and build its solid, returning any tool it replaced
    pub fn add_tool(&mut self, id: u32, tool: Tool) -> Result<Option<Tool>> {
        self.check_tool_class(id, &tool)?;
        let solid = VoxelSolid::from_tool(&tool, self.settings.resolution)?;
        let name = tool.name.clone();
        let previous = self.frame.tools.add_tool(id, tool)?;
        self.frame.tool_solids.insert(id, solid);
        info!(id, tool = %name, "tool registered");
        Ok(previous)
    }

    fn check_tool_id(&self, id: u32) -> Result<()> {
        if !self.frame.tools.is_valid_id(id) {
            return Err(ControllerError::UnknownTool { tool_id: id }.into());
        }
        match self.frame.tools.get_tool(id) {
            Some(tool) => self.check_tool_class(id, tool),
            None => Ok(()),
        }
    }

    fn check_tool_class(&self, id: u32, tool: &Tool) -> Result<()> {
        if tool.class == self.machine_type {
            return Ok(());
        }
        Err(ControllerError::ToolClassMismatch {
            tool_id: id,
            tool_class: tool.class.to_string(),
            machine: self.machine_type.to_string(),
        }
        .into())
    }

    fn tool_comment(&self, id: u32) -> String {
        self.frame
            .tools
            .get_tool(id)
            .map(|t| t.description_short())
            .unwrap_or_else(|| "Empty Spindle".to_string())
    }

    /// Physically change tools: `M6 T<id>`
    pub fn tool_change(&mut self, id: u32) -> Result<()> {
        self.check_tool_id(id)?;
        if self.frame.state.current_tool == id {
            return Ok(());
        }
        info!(from = self.frame.state.current_tool, to = id, "tool change");
        self.frame.state.current_tool = id;
        let comment = self.tool_comment(id);
        self.emit(
            vec![dialect::tool_change_word(), dialect::tool_word(id)],
            comment,
        );
        Ok(())
    }

    /// Select a tool without a change cycle: `T<id>`
    pub fn set_tool(&mut self, id: u32) -> Result<()> {
        self.check_tool_id(id)?;
        if self.frame.state.current_tool == id {
            return Ok(());
        }
        info!(tool = id, "tool selected");
        self.frame.state.current_tool = id;
        let comment = self.tool_comment(id);
        self.emit(vec![dialect::tool_word(id)], comment);
        Ok(())
    }

    fn tool_solid(&mut self, id: u32) -> Option<VoxelSolid> {
        if let Some(solid) = self.frame.tool_solids.get(&id) {
            return Some(solid.clone());
        }
        let tool = self.frame.tools.get_tool(id)?;
        match VoxelSolid::from_tool(tool, self.settings.resolution) {
            Ok(solid) => {
                self.frame.tool_solids.insert(id, solid.clone());
                Some(solid)
            }
            Err(e) => {
                warn!(tool = id, error = %e, "cannot model tool, skipping simulation");
                None
            }
        }
    }

    // State stack

    /// Save a snapshot of state, tools, spindle, limits and stock
    pub fn push_state(&mut self) {
        self.stack.push(self.frame.clone());
        debug!(depth = self.stack.len(), "state pushed");
    }

    /// Restore the most recently pushed state
    pub fn pop_state(&mut self) -> Result<()> {
        self.frame = self.stack.pop().ok_or(ControllerError::EmptyStateStack)?;
        debug!(depth = self.stack.len(), "state popped");
        Ok(())
    }

    /// Drop the most recently pushed state without restoring it
    pub fn discard_state(&mut self) -> Result<()> {
        self.stack.pop().ok_or(ControllerError::EmptyStateStack)?;
        debug!(depth = self.stack.len(), "state discarded");
        Ok(())
    }

    // Blocks

    /// Open a named block capturing the current state
    pub fn new_block(&mut self, name: impl Into<String>) {
        let name = name.into();
        info!(block = %name, "block started");
        self.program.new_block(name, self.frame.state.clone());
    }

    /// Close the current block, re-issuing every masked setting that changed
    ///
    /// Position cannot be restored: with [`RestoreMask::POSITION`] set and
    /// the tool moved, the call fails before anything is emitted.
    pub fn end_block(&mut self, mask: RestoreMask) -> Result<()> {
        let saved = self
            .program
            .current_block()
            .map(|b| b.state.clone())
            .unwrap_or_else(|| self.frame.state.clone());
        let live = &self.frame.state;

        if mask.contains(RestoreMask::POSITION) && saved.current_position != live.current_position {
            warn!(
                expected = %saved.current_position,
                actual = %live.current_position,
                "position restore is not supported"
            );
            return Err(ControllerError::PositionRestoreUnsupported {
                expected: saved.current_position.to_string(),
                actual: live.current_position.to_string(),
            }
            .into());
        }
        if mask.contains(RestoreMask::SPINDLE) && saved.spindle_rotation != Rotation::Stop {
            self.frame.spindle.normalise(saved.spindle_speed)?;
        }
        if mask.contains(RestoreMask::TOOL) {
            self.check_tool_id(saved.current_tool)?;
        }

        if mask.contains(RestoreMask::UNITS) {
            self.set_units(saved.units);
        }
        if mask.contains(RestoreMask::PLANE) {
            self.set_plane(saved.plane);
        }
        if mask.contains(RestoreMask::COORDINATE_SYSTEM) {
            self.set_coordinate_system(saved.coordinate_system)?;
        }
        if mask.contains(RestoreMask::MOTION) {
            self.set_motion(saved.motion);
        }
        if mask.contains(RestoreMask::ARC_MOTION) {
            self.set_arc_motion(saved.arc_motion);
        }
        if mask.contains(RestoreMask::FEED_RATE_MODE) {
            self.set_feed_rate_mode(saved.feed_rate_mode);
        }
        if mask.contains(RestoreMask::FEED_RATE) {
            self.set_feed_rate(saved.feed_rate);
        }
        if mask.contains(RestoreMask::SPINDLE) {
            self.start_spindle(saved.spindle_rotation, saved.spindle_speed)?;
        }
        if mask.contains(RestoreMask::TOOL) {
            self.tool_change(saved.current_tool)?;
        }

        info!(mask = ?mask, "block ended");
        self.program.new_block("", self.frame.state.clone());
        Ok(())
    }

    // Program annotations

    /// Comment-only line
    pub fn comment(&mut self, text: impl Into<String>) {
        self.program.add_line(Line::comment_only(text));
    }

    /// Pause in place: `G4 P<seconds>`
    pub fn dwell(&mut self, duration: Time) {
        self.elapsed_minutes += duration.as_minutes().max(0.0);
        self.emit(
            vec![dialect::dwell_word(), dialect::p_word(duration.as_seconds())],
            "Dwell",
        );
    }

    // Motion

    fn check_cutting(&self) -> Result<()> {
        let state = &self.frame.state;
        if state.spindle_rotation == Rotation::Stop {
            return Err(ControllerError::SpindleStopped.into());
        }
        if state.feed_rate == 0.0 {
            return Err(ControllerError::ZeroFeedRate.into());
        }
        if state.current_tool == 0 {
            return Err(ControllerError::NoToolLoaded.into());
        }
        Ok(())
    }

    /// Validate axis words and compute the target position
    fn resolve_target(&self, axes: &[Axis]) -> Result<Position> {
        let state = &self.frame.state;
        let mut seen: Vec<AxisKind> = Vec::with_capacity(axes.len());
        let mut target = state.current_position;
        for axis in axes {
            let kind = axis.kind();
            if !self.axes.contains(kind) {
                return Err(ControllerError::UnknownAxis { axis: kind.letter() }.into());
            }
            if seen.contains(&kind) {
                return Err(ControllerError::DuplicateAxis { axis: kind.letter() }.into());
            }
            seen.push(kind);
            target = match state.motion {
                Motion::Absolute => target.with_axis(axis, state.units),
                Motion::Incremental => target.offset_axis(axis, state.units),
            };
        }
        for kind in seen {
            self.frame.travel.check(kind, target.get(kind))?;
        }
        Ok(target)
    }

    fn check_feed(&self, kinds: impl IntoIterator<Item = AxisKind>) -> Result<()> {
        let state = &self.frame.state;
        if state.feed_rate_mode != FeedRateMode::UnitsPerMinute {
            return Ok(());
        }
        let linear = Velocity::from_units(state.feed_rate, state.units);
        let rotary = AngularVelocity::degrees_per_min(state.feed_rate);
        for kind in kinds {
            if kind.is_linear() {
                self.frame.feed_limits.check_linear(kind, linear)?;
            } else {
                self.frame.feed_limits.check_rotary(kind, rotary)?;
            }
        }
        Ok(())
    }

    fn expand_straight(&self, start: &Position, end: &Position) -> Vec<Pose> {
        let k = &self.settings.kinematics;
        if start.linear_distance(end) == 0.0 && start.max_rotary_delta(end) > 0.0 {
            expand_rotary(start, end, &self.axes, k.rotary_steps_per_degree)
        } else {
            expand_linear(start, end, &self.axes, k.linear_steps_per_mm)
        }
    }

    fn motion_words(first: Word, axes: &[Axis]) -> Vec<Word> {
        let mut words = Vec::with_capacity(axes.len() + 1);
        words.push(first);
        words.extend(axes.iter().map(dialect::axis_word));
        words
    }

    /// Minutes for a cutting move of `distance` mm and `rotary` degrees
    fn cutting_minutes(&self, distance: f64, rotary: f64) -> f64 {
        let state = &self.frame.state;
        if state.feed_rate <= 0.0 {
            return 0.0;
        }
        let per_minute = match state.feed_rate_mode {
            FeedRateMode::InverseTime => return 1.0 / state.feed_rate,
            FeedRateMode::UnitsPerMinute => state.feed_rate,
            FeedRateMode::UnitsPerRevolution => state.feed_rate * state.spindle_speed,
        };
        if per_minute <= 0.0 {
            0.0
        } else if distance > 0.0 {
            distance / state.units.to_mm(per_minute)
        } else {
            rotary / per_minute
        }
    }

    /// Minutes for a rapid, limited by the slowest configured axis
    fn rapid_minutes(&self, start: &Position, end: &Position) -> f64 {
        AxisKind::ALL
            .iter()
            .filter_map(|kind| {
                let delta = (end.get(*kind) - start.get(*kind)).abs();
                let bound = self.frame.rapid_limits.bound(*kind)?;
                (delta > 0.0 && bound > 0.0).then_some(delta / bound)
            })
            .fold(0.0, f64::max)
    }

    fn simulate(&mut self, path: &[Pose]) {
        if self.machine_type == MachineType::Lathe || path.len() < 2 || self.frame.stock.is_empty() {
            return;
        }
        let Some(tool) = self.tool_solid(self.frame.state.current_tool) else {
            return;
        };
        let report = Simulator::new(self.settings.statistics).run(&self.frame.stock, &tool, path);
        if !report.is_clean() {
            warn!(
                failed = report.failed_steps().count(),
                steps = report.steps.len(),
                "simulation skipped steps"
            );
        }
        self.removed_volume += report.removed_volume.unwrap_or(0.0);
        self.frame.stock = report.stock;
    }

    /// Non-cutting positioning move: `G0 ...`
    pub fn rapid(&mut self, axes: &[Axis]) -> Result<()> {
        let start = self.frame.state.current_position;
        let target = self.resolve_target(axes)?;
        let path = self.expand_straight(&start, &target);

        self.program
            .add_line(Line::new(Self::motion_words(dialect::rapid_word(), axes)));
        self.frame.state.current_position = target;
        self.elapsed_minutes += self.rapid_minutes(&start, &target);
        debug!(target = %target, poses = path.len(), "rapid");
        self.last_path = path;
        Ok(())
    }

    /// Straight cutting move: `G1 ...`
    pub fn linear(&mut self, axes: &[Axis]) -> Result<()> {
        self.check_cutting()?;
        let start = self.frame.state.current_position;
        let target = self.resolve_target(axes)?;
        self.check_feed(axes.iter().map(Axis::kind))?;
        let path = self.expand_straight(&start, &target);

        self.program
            .add_line(Line::new(Self::motion_words(dialect::linear_word(), axes)));
        self.frame.state.current_position = target;
        self.elapsed_minutes +=
            self.cutting_minutes(start.linear_distance(&target), start.max_rotary_delta(&target));
        debug!(target = %target, poses = path.len(), "linear");
        self.simulate(&path);
        self.last_path = path;
        Ok(())
    }

    /// Circular or helical cutting move: `G2`/`G3` with centre offsets
    ///
    /// Offsets follow the arc motion mode: relative to the start point when
    /// incremental, absolute coordinates otherwise. Omitted offsets leave
    /// the centre on the start point's coordinate. `turns` above one adds
    /// full revolutions and is emitted as `P`.
    pub fn arc(
        &mut self,
        direction: ArcDirection,
        axes: &[Axis],
        offsets: &[Offset],
        turns: u32,
    ) -> Result<()> {
        self.check_cutting()?;
        let plane = self.frame.state.plane;
        let (in_plane, allowed) = match plane {
            Plane::XY => ([AxisKind::X, AxisKind::Y], [OffsetKind::I, OffsetKind::J]),
            Plane::ZX => ([AxisKind::Z, AxisKind::X], [OffsetKind::K, OffsetKind::I]),
            Plane::YZ => ([AxisKind::Y, AxisKind::Z], [OffsetKind::J, OffsetKind::K]),
            other => {
                return Err(ControllerError::UnsupportedArcPlane {
                    plane: other.to_string(),
                }
                .into())
            }
        };
        if let Some(missing) = in_plane.iter().find(|k| !self.axes.contains(**k)) {
            return Err(ControllerError::InvalidArcAxis {
                axis: missing.letter(),
                plane: plane.to_string(),
            }
            .into());
        }
        let mut seen: Vec<OffsetKind> = Vec::with_capacity(offsets.len());
        for offset in offsets {
            let kind = offset.kind();
            if !allowed.contains(&kind) || seen.contains(&kind) {
                return Err(ControllerError::InvalidArcOffset {
                    offset: kind.letter(),
                    plane: plane.to_string(),
                }
                .into());
            }
            seen.push(kind);
        }

        let start = self.frame.state.current_position;
        let target = self.resolve_target(axes)?;
        self.check_feed(axes.iter().map(Axis::kind).chain(in_plane))?;

        let units = self.frame.state.units;
        let mut center = start.cartesian();
        for offset in offsets {
            let i = match offset.kind().axis() {
                AxisKind::X => 0,
                AxisKind::Y => 1,
                _ => 2,
            };
            let mm = units.to_mm(offset.value());
            center[i] = match self.frame.state.arc_motion {
                Motion::Incremental => center[i] + mm,
                Motion::Absolute => mm,
            };
        }
        let arc = ArcMotion {
            center,
            direction,
            plane,
            turns,
        };
        let geometry = ArcGeometry::new(&start, &target, &arc)?;
        // The arc can leave the travel envelope between its end points
        for (index, value) in geometry.extremes(&center) {
            let kind = [AxisKind::X, AxisKind::Y, AxisKind::Z][index];
            self.frame.travel.check(kind, value)?;
        }
        let path = expand_arc(
            &start,
            &target,
            &arc,
            &self.axes,
            self.settings.kinematics.arc_steps_per_degree,
        )?;

        let mut words = Self::motion_words(dialect::arc_word(direction), axes);
        words.extend(offsets.iter().map(dialect::offset_word));
        if turns > 1 {
            words.push(dialect::p_word(f64::from(turns)));
        }
        self.program.add_line(Line::new(words));
        self.frame.state.current_position = target;
        self.elapsed_minutes +=
            self.cutting_minutes(geometry.length(), start.max_rotary_delta(&target));
        debug!(
            target = %target,
            sweep = geometry.sweep_degrees(),
            poses = path.len(),
            "arc"
        );
        self.simulate(&path);
        self.last_path = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_core::Error;

    fn ready_mill() -> Machine {
        let mut m = Machine::new(MachineType::Mill, Units::Metric);
        m.start_spindle(Rotation::Clockwise, 10000.0).unwrap();
        m.set_feed_rate(600.0);
        m.tool_change(1).unwrap();
        m
    }

    #[test]
    fn test_preamble() {
        let m = Machine::new(MachineType::Mill, Units::Metric);
        let text = m.program_text();
        assert!(text.starts_with("; Preamble\nG17 ; XY Plane\nG21 ; Metric\nG40"));
        assert!(text.contains("G54 ; Coordinate System P1\n"));
        assert!(text.contains("G80 ; Canned Cycle Off\n"));
        assert!(text.contains("G90 ; Absolute Motion\n"));
        assert!(text.contains("G91.1 ; Incremental Arc Motion\n"));
        assert!(text.contains("G94 ; Units per Minute Mode\n"));
        assert!(text.contains("M5 ; Spindle Off\n"));
        assert_eq!(m.program().line_count(), 9);
    }

    #[test]
    fn test_lathe_defaults() {
        let m = Machine::new(MachineType::Lathe, Units::Imperial);
        assert_eq!(m.state().plane, Plane::ZX);
        assert_eq!(m.state().feed_rate_mode, FeedRateMode::UnitsPerRevolution);
        assert!(m.axes().contains(AxisKind::X));
        assert!(!m.axes().contains(AxisKind::Y));
        assert!(m.program_text().contains("G18 ; ZX Plane\nG20 ; Imperial\n"));
    }

    #[test]
    fn test_setters_are_idempotent() {
        let mut m = Machine::new(MachineType::Mill, Units::Metric);
        let before = m.program().line_count();
        m.set_units(Units::Metric);
        m.set_plane(Plane::XY);
        m.set_motion(Motion::Absolute);
        m.set_coordinate_system(CoordinateSystem::P1).unwrap();
        m.stop_spindle();
        assert_eq!(m.program().line_count(), before);

        m.set_plane(Plane::YZ);
        m.set_plane(Plane::YZ);
        assert_eq!(m.program().line_count(), before + 1);
    }

    #[test]
    fn test_active_coordinate_system_rejected() {
        let mut m = Machine::new(MachineType::Mill, Units::Metric);
        let err = m.set_coordinate_system(CoordinateSystem::Active).unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_cutting_preconditions() {
        let mut m = Machine::new(MachineType::Mill, Units::Metric);
        let before = m.program().line_count();
        assert!(matches!(
            m.linear(&[Axis::x(1.0)]),
            Err(Error::Controller(ControllerError::SpindleStopped))
        ));
        m.start_spindle(Rotation::Clockwise, 1000.0).unwrap();
        assert!(matches!(
            m.linear(&[Axis::x(1.0)]),
            Err(Error::Controller(ControllerError::ZeroFeedRate))
        ));
        m.set_feed_rate(100.0);
        assert!(matches!(
            m.linear(&[Axis::x(1.0)]),
            Err(Error::Controller(ControllerError::NoToolLoaded))
        ));
        assert_eq!(m.program().line_count(), before + 2);
        assert_eq!(m.position(), &Position::origin());
    }

    #[test]
    fn test_axis_validation() {
        let mut m = ready_mill();
        assert!(matches!(
            m.rapid(&[Axis::a(10.0)]),
            Err(Error::Controller(ControllerError::UnknownAxis { axis: 'A' }))
        ));
        assert!(matches!(
            m.rapid(&[Axis::x(1.0), Axis::x(2.0)]),
            Err(Error::Controller(ControllerError::DuplicateAxis { axis: 'X' }))
        ));
    }

    #[test]
    fn test_incremental_motion() {
        let mut m = ready_mill();
        m.set_motion(Motion::Incremental);
        m.rapid(&[Axis::x(5.0)]).unwrap();
        m.rapid(&[Axis::x(5.0), Axis::y(-1.0)]).unwrap();
        assert_eq!(m.position().get(AxisKind::X), 10.0);
        assert_eq!(m.position().get(AxisKind::Y), -1.0);
    }

    #[test]
    fn test_imperial_words_are_canonicalised() {
        let mut m = Machine::new(MachineType::Mill, Units::Imperial);
        m.rapid(&[Axis::x(1.0)]).unwrap();
        assert!((m.position().get(AxisKind::X) - 25.4).abs() < 1e-12);
        assert!(m.program_text().contains("G0 X1\n"));
    }

    #[test]
    fn test_travel_limit_blocks_emission() {
        let mut m = ready_mill();
        m.travel_mut().set_global(camkit_core::Length::mm(100.0));
        let before = m.program().line_count();
        let err = m.rapid(&[Axis::x(150.0)]).unwrap_err();
        assert!(err.is_limit());
        assert_eq!(m.program().line_count(), before);
    }

    #[test]
    fn test_arc_travel_checked_between_end_points() {
        let mut m = ready_mill();
        m.travel_mut().set_global(camkit_core::Length::mm(10.0));
        let before = m.program().line_count();
        // Full circle about (9, 0) reaches X18 while both end points sit at the origin
        let err = m
            .arc(ArcDirection::CounterClockwise, &[], &[Offset::i(9.0)], 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Limit(camkit_core::LimitError::TravelExceeded { axis: 'X', .. })
        ));
        assert_eq!(m.program().line_count(), before);
        assert_eq!(m.position(), &Position::origin());

        m.arc(ArcDirection::CounterClockwise, &[], &[Offset::i(4.0)], 1)
            .unwrap();
        assert_eq!(m.program().line_count(), before + 1);
    }

    #[test]
    fn test_feed_limit() {
        let mut m = ready_mill();
        m.feed_limits_mut()
            .set_axis_linear(AxisKind::X, Velocity::mm_per_min(500.0))
            .unwrap();
        assert!(m.linear(&[Axis::x(1.0)]).unwrap_err().is_limit());
        assert!(m.linear(&[Axis::y(1.0)]).is_ok());
    }

    #[test]
    fn test_arc_words_and_plane_checks() {
        let mut m = ready_mill();
        m.arc(
            ArcDirection::CounterClockwise,
            &[Axis::x(10.0), Axis::z(-1.0)],
            &[Offset::i(5.0)],
            2,
        )
        .unwrap();
        assert!(m.program_text().contains("G3 X10 Z-1 I5 P2\n"));
        assert_eq!(m.last_path().len(), 541);

        assert!(matches!(
            m.arc(ArcDirection::Clockwise, &[], &[Offset::k(1.0)], 1),
            Err(Error::Controller(ControllerError::InvalidArcOffset { offset: 'K', .. }))
        ));
        m.set_plane(Plane::UV);
        assert!(matches!(
            m.arc(ArcDirection::Clockwise, &[], &[], 1),
            Err(Error::Controller(ControllerError::UnsupportedArcPlane { .. }))
        ));
    }

    #[test]
    fn test_lathe_rejects_xy_arc() {
        let mut m = Machine::new(MachineType::Lathe, Units::Metric);
        m.start_spindle(Rotation::Clockwise, 500.0).unwrap();
        m.set_feed_rate(0.1);
        m.tool_change(1).unwrap();
        m.set_plane(Plane::XY);
        assert!(matches!(
            m.arc(ArcDirection::Clockwise, &[Axis::x(1.0)], &[Offset::i(1.0)], 1),
            Err(Error::Controller(ControllerError::InvalidArcAxis { axis: 'Y', .. }))
        ));
    }

    #[test]
    fn test_tool_class_must_match_machine() {
        let mut lathe = Machine::new(MachineType::Lathe, Units::Metric);
        assert_eq!(lathe.tools().get_tool(1).unwrap().class, MachineType::Lathe);
        let end_mill = Tool::new(
            "6mm Flat End Mill",
            camkit_core::ToolType::EndMillFlat,
            camkit_core::Length::mm(6.0),
            camkit_core::Length::mm(30.0),
        );
        assert!(matches!(
            lathe.add_tool(2, end_mill.clone()),
            Err(Error::Controller(ControllerError::ToolClassMismatch { tool_id: 2, .. }))
        ));
        assert!(lathe.tools().get_tool(2).is_none());
        lathe.tool_change(1).unwrap();

        let mut mill = Machine::new(MachineType::Mill, Units::Metric);
        let insert = camkit_core::init_lathe_table().get_tool(1).unwrap().clone();
        assert!(mill.add_tool(4, insert).is_err());
        assert!(mill.add_tool(4, end_mill).unwrap().is_none());
        mill.tool_change(4).unwrap();
    }

    #[test]
    fn test_state_stack() {
        let mut m = ready_mill();
        assert!(m.pop_state().is_err());
        assert!(m.discard_state().is_err());

        m.push_state();
        m.set_units(Units::Imperial);
        m.rapid(&[Axis::x(3.0)]).unwrap();
        m.pop_state().unwrap();
        assert_eq!(m.state().units, Units::Metric);
        assert_eq!(m.position(), &Position::origin());

        m.push_state();
        m.set_plane(Plane::ZX);
        m.discard_state().unwrap();
        assert_eq!(m.state().plane, Plane::ZX);
        assert_eq!(m.stack_depth(), 0);
    }

    #[test]
    fn test_end_block_position_unsupported() {
        let mut m = ready_mill();
        m.new_block("Move");
        m.rapid(&[Axis::x(3.0)]).unwrap();
        m.set_units(Units::Imperial);
        let before = m.program().line_count();
        let err = m.end_block(RestoreMask::RESTORE_ALL).unwrap_err();
        assert!(matches!(
            err,
            Error::Controller(ControllerError::PositionRestoreUnsupported { .. })
        ));
        assert_eq!(m.program().line_count(), before);
        assert_eq!(m.state().units, Units::Imperial);
    }

    #[test]
    fn test_end_block_restores_spindle_and_tool() {
        let mut m = ready_mill();
        m.new_block("Engrave");
        m.tool_change(3).unwrap();
        m.stop_spindle();
        m.end_block(RestoreMask::SPINDLE | RestoreMask::TOOL).unwrap();
        assert_eq!(m.state().current_tool, 1);
        assert_eq!(m.state().spindle_rotation, Rotation::Clockwise);
        assert_eq!(m.state().spindle_speed, 10000.0);
    }

    #[test]
    fn test_duration_estimate() {
        let mut m = ready_mill();
        m.linear(&[Axis::x(60.0)]).unwrap();
        assert!((m.estimated_duration().as_minutes() - 0.1).abs() < 1e-12);

        m.set_feed_rate_mode(FeedRateMode::InverseTime);
        m.set_feed_rate(2.0);
        m.linear(&[Axis::x(0.0)]).unwrap();
        assert!((m.estimated_duration().as_minutes() - 0.6).abs() < 1e-12);

        m.dwell(Time::seconds(6.0));
        assert!((m.estimated_duration().as_minutes() - 0.7).abs() < 1e-12);
        assert!(m.program_text().contains("G4 P6 ; Dwell\n"));

        m.rapid_limits_mut().set_global(Velocity::mm_per_min(1000.0));
        m.rapid(&[Axis::x(100.0)]).unwrap();
        assert!((m.estimated_duration().as_minutes() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_machine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Machine>();
    }
}
