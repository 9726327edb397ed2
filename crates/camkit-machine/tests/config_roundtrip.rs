use camkit_core::{Axis, AxisKind, AxisSet, MachineType, Rotation, Torque, Units};
use camkit_gcode::{LetterCase, Word};
use camkit_machine::{Machine, MachineConfig, SpeedRange, TorqueSample};
use camkit_sim::StatisticsMode;
use tempfile::TempDir;

fn sample_config() -> MachineConfig {
    let mut config = MachineConfig::new();
    config.machine_type = MachineType::Mill;
    config.units = Units::Metric;
    config.axes = Some(AxisSet::all());
    config.spindle.ranges.push(SpeedRange { start: 1000, end: 24000 });
    config.spindle.discrete.push(500);
    config.spindle.tolerance = 50.0;
    config.spindle.torque = vec![
        TorqueSample { rpm: 1000.0, torque: Torque::newton_metres(1.5) },
        TorqueSample { rpm: 24000.0, torque: Torque::newton_metres(0.5) },
    ];
    config.limits.travel.global = Some(400.0);
    config.limits.travel.axes.insert("Z".into(), 120.0);
    config.limits.feed_rate.global = Some(3000.0);
    config.limits.rapid.axes.insert("X".into(), 10000.0);
    config.simulation.resolution = 0.25;
    config.simulation.statistics = StatisticsMode::PerStep;
    config.program.line_numbers = true;
    config.program.case = LetterCase::Lower;
    config.program.stop_code = Some(Word::new('M', 2.0));
    config
}

#[test]
fn test_json_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("machine.json");
    let config = sample_config();
    config.save_to_file(&path).unwrap();
    assert_eq!(MachineConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_toml_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("machine.toml");
    let config = sample_config();
    config.save_to_file(&path).unwrap();
    assert_eq!(MachineConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lathe.toml");
    std::fs::write(&path, "machine_type = \"lathe\"\n\n[spindle]\ndiscrete = [300, 600]\n").unwrap();

    let config = MachineConfig::load_from_file(&path).unwrap();
    assert_eq!(config.machine_type, MachineType::Lathe);
    assert_eq!(config.axis_set(), AxisSet::lathe());
    assert_eq!(config.spindle.discrete, vec![300, 600]);
    assert_eq!(config.simulation, Default::default());
}

#[test]
fn test_invalid_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "simulation": { "resolution": -1.0 } }"#).unwrap();
    assert!(MachineConfig::load_from_file(&path).is_err());
}

#[test]
fn test_machine_from_config_applies_limits() {
    let mut m = Machine::from_config(&sample_config()).unwrap();
    assert!(m.axes().contains(AxisKind::A));
    assert_eq!(m.settings().resolution, 0.25);

    assert_eq!(m.start_spindle(Rotation::Clockwise, 520.0).unwrap(), 500.0);
    assert!(m.start_spindle(Rotation::Clockwise, 700.0).unwrap_err().is_limit());
    assert!(m.spindle().torque_at(12500.0).is_ok());

    m.set_feed_rate(2000.0);
    m.tool_change(1).unwrap();
    m.linear(&[Axis::x(100.0)]).unwrap();
    assert!(m.linear(&[Axis::z(150.0)]).unwrap_err().is_limit());

    m.set_feed_rate(4000.0);
    assert!(m.linear(&[Axis::y(10.0)]).unwrap_err().is_limit());

    m.rapid(&[Axis::x(0.0)]).unwrap();
    let text = m.program_text();
    assert!(text.contains("N1001 g17 ; XY Plane"), "{text}");
    assert!(text.contains("g0 x0"));
    assert!(text.trim_end().ends_with("m2"));
}
