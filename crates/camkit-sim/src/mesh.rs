//! Face-vertex meshes
//!
//! Meshes are used for inspection only: a voxel solid exports its boundary
//! as quads, and a closed mesh can be voxelised back by ray parity. Text
//! I/O uses the OFF format.

use crate::solid::Aabb;
use crate::voxel::{Cell, VoxelSolid};
use camkit_core::{GeometryError, Result};
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Polygon mesh as a vertex list and index faces
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceVertexMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Vec<usize>>,
}

impl FaceVertexMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Fan-triangulate every face
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        self.faces.iter().flat_map(move |face| {
            (1..face.len().saturating_sub(1)).map(move |i| {
                [
                    self.vertices[face[0]],
                    self.vertices[face[i]],
                    self.vertices[face[i + 1]],
                ]
            })
        })
    }

    pub fn to_off(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "OFF");
        let _ = writeln!(out, "{} {} 0", self.vertices.len(), self.faces.len());
        for v in &self.vertices {
            let _ = writeln!(out, "{} {} {}", v.x, v.y, v.z);
        }
        for face in &self.faces {
            let indices: Vec<String> = face.iter().map(|i| i.to_string()).collect();
            let _ = writeln!(out, "{} {}", face.len(), indices.join(" "));
        }
        out
    }

    pub fn from_off(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.split('#').next().unwrap_or("").trim()))
            .filter(|(_, l)| !l.is_empty());

        let err = |line: usize, reason: &str| GeometryError::MeshFormat {
            line,
            reason: reason.to_string(),
        };

        let (n, header) = lines.next().ok_or_else(|| err(1, "missing OFF header"))?;
        if header != "OFF" {
            return Err(err(n, "missing OFF header").into());
        }
        let (n, counts) = lines.next().ok_or_else(|| err(n, "missing counts"))?;
        let counts: Vec<usize> = counts
            .split_whitespace()
            .map(|t| t.parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| err(n, "invalid counts"))?;
        let (nv, nf) = match counts.as_slice() {
            [nv, nf, ..] => (*nv, *nf),
            _ => return Err(err(n, "invalid counts").into()),
        };

        let mut mesh = Self::new();
        for _ in 0..nv {
            let (n, line) = lines.next().ok_or_else(|| err(n, "missing vertex"))?;
            let coords: Vec<f64> = line
                .split_whitespace()
                .map(|t| t.parse::<f64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| err(n, "invalid vertex"))?;
            match coords.as_slice() {
                [x, y, z, ..] => mesh.vertices.push(Point3::new(*x, *y, *z)),
                _ => return Err(err(n, "vertex needs three coordinates").into()),
            }
        }
        for _ in 0..nf {
            let (n, line) = lines.next().ok_or_else(|| err(n, "missing face"))?;
            let values: Vec<usize> = line
                .split_whitespace()
                .map(|t| t.parse::<usize>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| err(n, "invalid face"))?;
            let (count, indices) = values
                .split_first()
                .ok_or_else(|| err(n, "empty face"))?;
            if indices.len() < *count || *count < 3 {
                return Err(err(n, "face has too few indices").into());
            }
            let face = indices[..*count].to_vec();
            if face.iter().any(|i| *i >= nv) {
                return Err(err(n, "face index out of range").into());
            }
            mesh.faces.push(face);
        }
        Ok(mesh)
    }

    pub fn save_off(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_off())?;
        Ok(())
    }

    pub fn load_off(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_off(&std::fs::read_to_string(path)?)
    }
}

/// Skewed so rays never run along the lattice-aligned face diagonals
const RAY_DIRECTION: [f64; 3] = [1.0, 0.013_7, 0.007_1];

/// Möller–Trumbore ray/triangle test for the forward ray only
fn ray_hits(origin: &Point3<f64>, dir: &Vector3<f64>, tri: &[Point3<f64>; 3]) -> bool {
    const EPS: f64 = 1e-12;
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < EPS {
        return false;
    }
    let inv = 1.0 / det;
    let s = origin - tri[0];
    let u = s.dot(&p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    e2.dot(&q) * inv > EPS
}

impl VoxelSolid {
    /// Boundary quads of every exposed cell face, with shared vertices merged
    pub fn to_mesh(&self) -> FaceVertexMesh {
        let r = self.resolution();
        let mut mesh = FaceVertexMesh::new();
        let mut index: BTreeMap<Cell, usize> = BTreeMap::new();
        let mut vertex = |mesh: &mut FaceVertexMesh, v: Cell| -> usize {
            *index.entry(v).or_insert_with(|| {
                mesh.vertices.push(Point3::new(
                    f64::from(v.0) * r,
                    f64::from(v.1) * r,
                    f64::from(v.2) * r,
                ));
                mesh.vertices.len() - 1
            })
        };

        for (x, y, z) in self.cells() {
            // Each entry: neighbour offset and the face corners, counter-clockwise seen from outside
            let faces: [((i32, i32, i32), [Cell; 4]); 6] = [
                ((-1, 0, 0), [(x, y, z), (x, y, z + 1), (x, y + 1, z + 1), (x, y + 1, z)]),
                ((1, 0, 0), [(x + 1, y, z), (x + 1, y + 1, z), (x + 1, y + 1, z + 1), (x + 1, y, z + 1)]),
                ((0, -1, 0), [(x, y, z), (x + 1, y, z), (x + 1, y, z + 1), (x, y, z + 1)]),
                ((0, 1, 0), [(x, y + 1, z), (x, y + 1, z + 1), (x + 1, y + 1, z + 1), (x + 1, y + 1, z)]),
                ((0, 0, -1), [(x, y, z), (x, y + 1, z), (x + 1, y + 1, z), (x + 1, y, z)]),
                ((0, 0, 1), [(x, y, z + 1), (x + 1, y, z + 1), (x + 1, y + 1, z + 1), (x, y + 1, z + 1)]),
            ];
            for ((dx, dy, dz), corners) in faces {
                if self.contains_cell((x + dx, y + dy, z + dz)) {
                    continue;
                }
                let face = corners.iter().map(|c| vertex(&mut mesh, *c)).collect();
                mesh.faces.push(face);
            }
        }
        mesh
    }

    /// Voxelise a closed mesh: a cell is filled when its centre is inside
    pub fn from_mesh(mesh: &FaceVertexMesh, resolution: f64) -> Result<Self> {
        let Some(bounds) = mesh.bounding_box() else {
            return VoxelSolid::new(resolution);
        };
        let triangles: Vec<[Point3<f64>; 3]> = mesh.triangles().collect();
        let dir = Vector3::from(RAY_DIRECTION);
        VoxelSolid::from_predicate(&bounds, resolution, |p| {
            triangles.iter().filter(|t| ray_hits(p, &dir, t)).count() % 2 == 1
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solid::Solid;

    #[test]
    fn test_single_cell_mesh() {
        let cube = VoxelSolid::from_cells(1.0, [(0, 0, 0)]).unwrap();
        let mesh = cube.to_mesh();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.faces.len(), 6);
        assert_eq!(mesh.triangles().count(), 12);
    }

    #[test]
    fn test_shared_faces_are_hidden() {
        let bar = VoxelSolid::from_cells(1.0, [(0, 0, 0), (1, 0, 0)]).unwrap();
        let mesh = bar.to_mesh();
        assert_eq!(mesh.faces.len(), 10);
        assert_eq!(mesh.vertices.len(), 12);
    }

    #[test]
    fn test_mesh_round_trip() {
        let block = VoxelSolid::cuboid(Point3::origin(), Point3::new(3.0, 2.0, 2.0), 0.5).unwrap();
        let notch = VoxelSolid::cuboid(Point3::new(1.0, 0.0, 1.0), Point3::new(2.0, 2.0, 2.0), 0.5).unwrap();
        let part = block.difference(&notch);
        let back = VoxelSolid::from_mesh(&part.to_mesh(), 0.5).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn test_off_text_round_trip() {
        let cube = VoxelSolid::from_cells(2.0, [(0, 0, 0), (0, 0, 1)]).unwrap();
        let mesh = cube.to_mesh();
        let parsed = FaceVertexMesh::from_off(&mesh.to_off()).unwrap();
        assert_eq!(parsed, mesh);
    }

    #[test]
    fn test_off_errors() {
        assert!(FaceVertexMesh::from_off("").is_err());
        assert!(FaceVertexMesh::from_off("PLY\n").is_err());
        assert!(FaceVertexMesh::from_off("OFF\n1 1 0\n0 0 0\n3 0 1 2\n").is_err());
        assert!(FaceVertexMesh::from_off("OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n").is_ok());
    }
}
