use camkit_core::{ArcDirection, Axis, AxisSet, Plane, Position, Units};
use camkit_sim::{expand_arc, expand_linear, ArcGeometry, ArcMotion, Pose};
use nalgebra::Point3;
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = f64> {
    -500.0f64..500.0
}

proptest! {
    #[test]
    fn prop_same_point_expands_to_single_pose(
        x in coord(), y in coord(), z in coord(), steps in -10.0f64..10.0
    ) {
        let p = Position::from_xyz_mm(x, y, z);
        let poses = expand_linear(&p, &p, &AxisSet::mill(), steps);
        prop_assert_eq!(poses, vec![Pose::from_position(&p)]);
    }

    #[test]
    fn prop_linear_endpoints_are_exact(
        a in (coord(), coord(), coord()),
        b in (coord(), coord(), coord()),
        steps in prop_oneof![Just(-1.0), 0.01f64..2.0],
    ) {
        let start = Position::from_xyz_mm(a.0, a.1, a.2);
        let end = Position::from_xyz_mm(b.0, b.1, b.2);
        let poses = expand_linear(&start, &end, &AxisSet::mill(), steps);
        prop_assert!(!poses.is_empty());
        prop_assert_eq!(poses[0].position, start.cartesian());
        prop_assert_eq!(poses[poses.len() - 1].position, end.cartesian());
    }

    #[test]
    fn prop_arc_endpoints_are_exact(
        radius in 0.5f64..50.0,
        start_deg in 0.0f64..360.0,
        end_deg in 0.0f64..360.0,
        clockwise in any::<bool>(),
        dz in -5.0f64..5.0,
    ) {
        let (s, e) = (start_deg.to_radians(), end_deg.to_radians());
        let start = Position::from_xyz_mm(radius * s.cos(), radius * s.sin(), 0.0);
        let end = Position::from_xyz_mm(radius * e.cos(), radius * e.sin(), dz);
        let arc = ArcMotion {
            center: Point3::origin(),
            direction: if clockwise { ArcDirection::Clockwise } else { ArcDirection::CounterClockwise },
            plane: Plane::XY,
            turns: 1,
        };
        let poses = expand_arc(&start, &end, &arc, &AxisSet::mill(), 1.0).unwrap();
        prop_assert_eq!(poses[0].position, start.cartesian());
        prop_assert_eq!(poses[poses.len() - 1].position, end.cartesian());
        for pose in &poses {
            let rho = pose.position.x.hypot(pose.position.y);
            prop_assert!((rho - radius).abs() < 1e-3 + 1e-9 * radius);
        }
    }
}

#[test]
fn test_quarter_arc_matches_trigonometry() {
    let start = Position::from_xyz_mm(0.0, 0.0, 0.0);
    let end = Position::from_xyz_mm(1.0, 1.0, 0.0);
    let center = Point3::new(1.0, 0.0, 0.0);
    let arc = ArcMotion {
        center,
        direction: ArcDirection::Clockwise,
        plane: Plane::XY,
        turns: 1,
    };

    let a0 = (0.0f64 - center.y).atan2(0.0 - center.x);
    let a1 = (1.0f64 - center.y).atan2(1.0 - center.x);
    let mut expected = (a1 - a0).to_degrees();
    if expected >= 0.0 {
        expected -= 360.0;
    }

    let geometry = ArcGeometry::new(&start, &end, &arc).unwrap();
    assert!((geometry.sweep_degrees() - expected).abs() < 1e-9);
    assert!((expected + 90.0).abs() < 1e-9);

    let poses = expand_arc(&start, &end, &arc, &AxisSet::mill(), 1.0).unwrap();
    assert_eq!(poses.len(), expected.abs().ceil() as usize + 1);
}

#[test]
fn test_rotary_axis_ignored_when_not_configured() {
    let start = Position::origin();
    let end = start
        .with_axis(&Axis::x(4.0), Units::Metric)
        .with_axis(&Axis::b(45.0), Units::Metric);
    // B is not part of a three-axis mill, so no rotary subdivision happens
    let poses = expand_linear(&start, &end, &AxisSet::mill(), -1.0);
    assert_eq!(poses.len(), 2);
}
