use camkit_core::{AxisSet, Length, Position, Tool, ToolType};
use camkit_sim::{expand_linear, FaceVertexMesh, Simulator, Solid, StatisticsMode, VoxelSolid};
use nalgebra::Point3;

#[test]
fn test_end_mill_pass_and_persistence() {
    let stock = VoxelSolid::cuboid(Point3::origin(), Point3::new(20.0, 20.0, 10.0), 0.5).unwrap();
    let tool = Tool::new(
        "6mm flat",
        ToolType::EndMillFlat,
        Length::mm(6.0),
        Length::mm(20.0),
    );
    let cutter = VoxelSolid::from_tool(&tool, 0.5).unwrap();
    let poses = expand_linear(
        &Position::from_xyz_mm(-5.0, 10.0, 8.0),
        &Position::from_xyz_mm(25.0, 10.0, 8.0),
        &AxisSet::mill(),
        1.0,
    );

    let report = Simulator::new(StatisticsMode::Batch).run(&stock, &cutter, &poses);
    let removed = report.removed_volume.unwrap();
    assert!(removed > 0.0);
    assert!(report.stock < stock);
    assert!(report.stock.is_valid());

    // A full-width pass leaves the bottom 8 mm untouched
    let below = VoxelSolid::cuboid(Point3::origin(), Point3::new(20.0, 20.0, 8.0), 0.5).unwrap();
    assert!(below <= report.stock);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock.off");
    report.stock.to_mesh().save_off(&path).unwrap();
    let mesh = FaceVertexMesh::load_off(&path).unwrap();
    assert_eq!(VoxelSolid::from_mesh(&mesh, 0.5).unwrap(), report.stock);

    let native = report.stock.to_native().unwrap();
    assert_eq!(VoxelSolid::from_native(&native).unwrap(), report.stock);
}
