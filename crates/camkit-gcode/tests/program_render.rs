use camkit_core::{Axis, MachineState, Plane, Units};
use camkit_gcode::dialect::{axis_word, linear_word, plane_word, units_word};
use camkit_gcode::{format_number, Line, Program, ProgramOptions};
use proptest::prelude::*;

#[test]
fn test_program_renders_preamble_and_motion() {
    let mut program = Program::new(ProgramOptions::default());
    program.new_block("Preamble", MachineState::default());
    program.add_line(Line::new(vec![plane_word(Plane::XY)]).with_comment("XY Plane"));
    program.add_line(Line::new(vec![units_word(Units::Metric)]).with_comment("Metric"));
    program.new_block("Profile", MachineState::default());
    program.add_line(Line::new(vec![linear_word(), axis_word(&Axis::x(12.5)), axis_word(&Axis::y(-3.0))]));

    let text = program.render();
    assert!(text.starts_with("; Preamble\nG17 ; XY Plane\nG21 ; Metric\n\n; Profile\n"));
    assert!(text.contains("G1 X12.5 Y-3\n"));
    assert!(text.ends_with("\nM30\n"));
    assert_eq!(program.line_count(), 3);
}

proptest! {
    #[test]
    fn prop_formatted_numbers_have_no_trailing_zeros(v in -1.0e6f64..1.0e6) {
        let s = format_number(v, 6);
        prop_assert!(!s.ends_with('.'));
        if s.contains('.') {
            prop_assert!(!s.ends_with('0'));
        }
        let parsed: f64 = s.parse().unwrap();
        prop_assert!((parsed - v).abs() <= 5e-7 + 1e-9 * v.abs());
    }
}
