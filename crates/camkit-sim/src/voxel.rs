//! Sparse voxel solid
//!
//! Material is a set of occupied cubic cells on a lattice of pitch
//! `resolution`. Cell `(i, j, k)` covers `[i*r, (i+1)*r)` on each axis and is
//! sampled at its centre. The cell set sits behind an [`Arc`]: clones share it
//! until one of them is mutated.

use crate::solid::{Aabb, Solid};
use camkit_core::{GeometryError, Result, Tool, ToolType};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub, SubAssign};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lattice index of one cell
pub type Cell = (i32, i32, i32);

/// Lattice pitch used when none is configured (mm)
pub const DEFAULT_RESOLUTION: f64 = 0.5;

/// Upper bound on repair sweeps over non-manifold vertices
const MAX_REPAIR_PASSES: usize = 64;

/// Native format version written by [`VoxelSolid::to_native`]
const NATIVE_VERSION: u32 = 1;

fn check_resolution(resolution: f64) -> Result<()> {
    if resolution.is_finite() && resolution > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidResolution { resolution }.into())
    }
}

/// Voxelised solid
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelSolid {
    resolution: f64,
    cells: Arc<BTreeSet<Cell>>,
}

impl Default for VoxelSolid {
    fn default() -> Self {
        Self::with_cells(DEFAULT_RESOLUTION, BTreeSet::new())
    }
}

#[derive(Serialize, Deserialize)]
struct NativeSolid {
    version: u32,
    resolution: f64,
    cells: Vec<[i32; 3]>,
}

impl VoxelSolid {
    /// Empty solid on a lattice of the given pitch (mm)
    pub fn new(resolution: f64) -> Result<Self> {
        check_resolution(resolution)?;
        Ok(Self::with_cells(resolution, BTreeSet::new()))
    }

    fn with_cells(resolution: f64, cells: BTreeSet<Cell>) -> Self {
        Self {
            resolution,
            cells: Arc::new(cells),
        }
    }

    pub fn from_cells(resolution: f64, cells: impl IntoIterator<Item = Cell>) -> Result<Self> {
        check_resolution(resolution)?;
        Ok(Self::with_cells(resolution, cells.into_iter().collect()))
    }

    /// Every cell inside `bounds` whose centre satisfies `inside`
    pub fn from_predicate<F>(bounds: &Aabb, resolution: f64, inside: F) -> Result<Self>
    where
        F: Fn(&Point3<f64>) -> bool,
    {
        check_resolution(resolution)?;
        Ok(Self::sample(bounds, resolution, inside))
    }

    fn sample<F>(bounds: &Aabb, resolution: f64, inside: F) -> Self
    where
        F: Fn(&Point3<f64>) -> bool,
    {
        let lo = |v: f64| (v / resolution).floor() as i32;
        let mut cells = BTreeSet::new();
        for i in lo(bounds.min.x)..=lo(bounds.max.x) {
            for j in lo(bounds.min.y)..=lo(bounds.max.y) {
                for k in lo(bounds.min.z)..=lo(bounds.max.z) {
                    let centre = cell_centre(resolution, (i, j, k));
                    if bounds.contains(&centre) && inside(&centre) {
                        cells.insert((i, j, k));
                    }
                }
            }
        }
        Self::with_cells(resolution, cells)
    }

    /// Axis-aligned block between two corners
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>, resolution: f64) -> Result<Self> {
        Self::from_predicate(&Aabb::new(min, max), resolution, |_| true)
    }

    /// Cylinder standing on `base` along +Z
    pub fn cylinder(base: Point3<f64>, radius: f64, height: f64, resolution: f64) -> Result<Self> {
        let bounds = Aabb::new(
            base - Vector3::new(radius, radius, 0.0),
            base + Vector3::new(radius, radius, height),
        );
        let r2 = radius * radius;
        Self::from_predicate(&bounds, resolution, |p| {
            let dx = p.x - base.x;
            let dy = p.y - base.y;
            dx * dx + dy * dy <= r2
        })
    }

    /// Cutting envelope of a tool, tip at the origin and shank along +Z
    pub fn from_tool(tool: &Tool, resolution: f64) -> Result<Self> {
        check_resolution(resolution)?;
        let r = tool.diameter.as_mm() / 2.0;
        let h = if tool.flute_length.as_mm() > 0.0 {
            tool.flute_length.as_mm()
        } else {
            tool.length.as_mm()
        };
        let bounds = Aabb::new(Point3::new(-r, -r, 0.0), Point3::new(r, r, h));
        let r2 = r * r;
        let solid = match tool.tool_type {
            ToolType::EndMillBall => Self::sample(&bounds, resolution, |p| {
                let rho2 = p.x * p.x + p.y * p.y;
                if p.z >= r {
                    rho2 <= r2
                } else {
                    rho2 + (p.z - r).powi(2) <= r2
                }
            }),
            ToolType::VBit { tip_angle } if tip_angle > 0.0 && tip_angle < 180.0 => {
                let slope = (tip_angle.to_radians() / 2.0).tan();
                Self::sample(&bounds, resolution, |p| {
                    let rho = (p.x * p.x + p.y * p.y).sqrt();
                    rho <= (p.z * slope).min(r)
                })
            }
            _ => Self::sample(&bounds, resolution, |p| p.x * p.x + p.y * p.y <= r2),
        };
        if !solid.is_empty() {
            return Ok(solid);
        }
        // Cutters thinner than one cell still occupy the column on their axis
        debug!(tool = %tool.name, "tool below lattice resolution, using axis column");
        let top = ((h / resolution).ceil() as i32).max(1);
        let column = (0..top).flat_map(|k| [(-1, -1, k), (-1, 0, k), (0, -1, k), (0, 0, k)]);
        Ok(Self::with_cells(resolution, column.collect()))
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of occupied cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    pub fn cell_volume(&self) -> f64 {
        self.resolution.powi(3)
    }

    pub fn contains_cell(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn cell_of(&self, p: &Point3<f64>) -> Cell {
        (
            (p.x / self.resolution).floor() as i32,
            (p.y / self.resolution).floor() as i32,
            (p.z / self.resolution).floor() as i32,
        )
    }

    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        self.cells.contains(&self.cell_of(p))
    }

    /// The same solid sampled on another lattice
    pub fn resample(&self, resolution: f64) -> Result<Self> {
        check_resolution(resolution)?;
        Ok(match self.bounding_box() {
            Some(bounds) => Self::sample(&bounds, resolution, |p| self.contains_point(p)),
            None => Self::with_cells(resolution, BTreeSet::new()),
        })
    }

    fn aligned<'a>(&self, other: &'a VoxelSolid) -> Cow<'a, VoxelSolid> {
        if other.resolution == self.resolution {
            return Cow::Borrowed(other);
        }
        match other.bounding_box() {
            Some(bounds) => Cow::Owned(Self::sample(&bounds, self.resolution, |p| {
                other.contains_point(p)
            })),
            None => Cow::Owned(Self::with_cells(self.resolution, BTreeSet::new())),
        }
    }

    fn shifted(&self, shift: Cell) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|c| (c.0 + shift.0, c.1 + shift.1, c.2 + shift.2))
            .collect();
        Self::with_cells(self.resolution, cells)
    }

    /// Lossless JSON serialisation
    pub fn to_native(&self) -> Result<String> {
        let native = NativeSolid {
            version: NATIVE_VERSION,
            resolution: self.resolution,
            cells: self.cells.iter().map(|c| [c.0, c.1, c.2]).collect(),
        };
        Ok(serde_json::to_string(&native)?)
    }

    pub fn from_native(text: &str) -> Result<Self> {
        let native: NativeSolid = serde_json::from_str(text)?;
        if native.version != NATIVE_VERSION {
            return Err(camkit_core::Error::other(format!(
                "Unsupported native solid version {}",
                native.version
            )));
        }
        Self::from_cells(
            native.resolution,
            native.cells.into_iter().map(|c| (c[0], c[1], c[2])),
        )
    }

    /// Vertices around which the boundary is not a 2-manifold
    pub fn non_manifold_vertices(&self) -> Vec<Cell> {
        all_vertices(&self.cells)
            .into_iter()
            .filter(|v| !is_manifold_mask(vertex_mask(&self.cells, *v)))
            .collect()
    }
}

fn cell_centre(resolution: f64, c: Cell) -> Point3<f64> {
    Point3::new(
        (f64::from(c.0) + 0.5) * resolution,
        (f64::from(c.1) + 0.5) * resolution,
        (f64::from(c.2) + 0.5) * resolution,
    )
}

/// The eight lattice vertices at the corners of a cell
fn cell_vertices(c: Cell) -> impl Iterator<Item = Cell> {
    (0..8).map(move |b| (c.0 + (b & 1), c.1 + ((b >> 1) & 1), c.2 + ((b >> 2) & 1)))
}

/// The cell at bit `b` of the 2x2x2 neighbourhood of vertex `v`
fn neighbour_cell(v: Cell, b: i32) -> Cell {
    (v.0 - 1 + (b & 1), v.1 - 1 + ((b >> 1) & 1), v.2 - 1 + ((b >> 2) & 1))
}

fn all_vertices(cells: &BTreeSet<Cell>) -> BTreeSet<Cell> {
    cells.iter().flat_map(|c| cell_vertices(*c)).collect()
}

fn vertex_mask(cells: &BTreeSet<Cell>, v: Cell) -> u8 {
    (0..8).fold(0u8, |mask, b| {
        if cells.contains(&neighbour_cell(v, b)) {
            mask | (1 << b)
        } else {
            mask
        }
    })
}

/// True when the set bits of `mask` are face-connected within the 2x2x2 block
fn face_connected(mask: u8) -> bool {
    if mask == 0 {
        return true;
    }
    let start = mask.trailing_zeros() as u8;
    let mut seen = 1u8 << start;
    let mut stack = vec![start];
    while let Some(b) = stack.pop() {
        for flip in [1u8, 2, 4] {
            let n = b ^ flip;
            if mask & (1 << n) != 0 && seen & (1 << n) == 0 {
                seen |= 1 << n;
                stack.push(n);
            }
        }
    }
    seen == mask
}

/// A vertex is manifold when both material and void around it are face-connected
fn is_manifold_mask(mask: u8) -> bool {
    face_connected(mask) && face_connected(!mask)
}

/// Remove cells until every vertex in `pending` is manifold
///
/// Removed cells are appended to `removed`. Returns false if `passes` ran
/// out with bad vertices left.
fn repair(
    cells: &mut BTreeSet<Cell>,
    mut pending: BTreeSet<Cell>,
    removed: &mut Vec<Cell>,
    passes: usize,
) -> bool {
    for _ in 0..passes {
        let bad: Vec<Cell> = pending
            .iter()
            .copied()
            .filter(|v| !is_manifold_mask(vertex_mask(cells, *v)))
            .collect();
        if bad.is_empty() {
            return true;
        }
        pending.clear();
        for v in bad {
            let mask = vertex_mask(cells, v);
            if is_manifold_mask(mask) {
                continue;
            }
            let victim = (0..8)
                .filter(|b| mask & (1 << *b) != 0)
                .map(|b| neighbour_cell(v, b))
                .max();
            if let Some(victim) = victim {
                cells.remove(&victim);
                removed.push(victim);
                pending.extend(cell_vertices(victim));
            }
        }
    }
    pending
        .iter()
        .all(|v| is_manifold_mask(vertex_mask(cells, *v)))
}

impl Solid for VoxelSolid {
    fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out |= other;
        out
    }

    fn difference(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out -= other;
        out
    }

    fn intersection(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out &= other;
        out
    }

    fn complement(&self, within: &Aabb) -> Self {
        Self::sample(within, self.resolution, |p| !self.contains_point(p))
    }

    fn rotate(&self, rotation: &UnitQuaternion<f64>) -> Self {
        if rotation.angle().abs() < 1e-12 {
            return self.clone();
        }
        let Some(bounds) = self.bounding_box() else {
            return self.clone();
        };
        let corners = bounds.corners().map(|c| rotation * c);
        let Some(target) = Aabb::from_points(&corners) else {
            return self.clone();
        };
        let inverse = rotation.inverse();
        Self::sample(&target, self.resolution, |p| {
            self.contains_point(&(inverse * p))
        })
    }

    fn translate(&self, offset: &Vector3<f64>) -> Self {
        let steps = offset / self.resolution;
        let rounded = steps.map(f64::round);
        if (steps - rounded).amax() < 1e-9 {
            return self.shifted((rounded.x as i32, rounded.y as i32, rounded.z as i32));
        }
        let Some(bounds) = self.bounding_box() else {
            return self.clone();
        };
        let target = Aabb::new(bounds.min + offset, bounds.max + offset);
        Self::sample(&target, self.resolution, |p| {
            self.contains_point(&(p - offset))
        })
    }

    fn scale(&self, factor: f64) -> Result<Self> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(GeometryError::InvalidScale { factor }.into());
        }
        let Some(bounds) = self.bounding_box() else {
            return Ok(self.clone());
        };
        let target = Aabb::new(bounds.min * factor, bounds.max * factor);
        Ok(Self::sample(&target, self.resolution, |p| {
            self.contains_point(&(p / factor))
        }))
    }

    fn glide(&self, path: &[Point3<f64>]) -> Result<Self> {
        let first = path.first().ok_or(GeometryError::EmptyProfile)?;
        if self.is_empty() {
            return Err(GeometryError::SweepFailed {
                reason: "solid is empty".to_string(),
            }
            .into());
        }
        if path.iter().any(|p| !p.coords.iter().all(|v| v.is_finite())) {
            return Err(GeometryError::SweepFailed {
                reason: "path contains non-finite coordinates".to_string(),
            }
            .into());
        }

        let r = self.resolution;
        let to_shift = |p: &Point3<f64>| -> Cell {
            (
                (p.x / r).round() as i32,
                (p.y / r).round() as i32,
                (p.z / r).round() as i32,
            )
        };
        let mut shifts = BTreeSet::new();
        shifts.insert(to_shift(first));
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let steps = ((b - a).norm() / (r * 0.5)).ceil().max(1.0) as usize;
            for i in 1..=steps {
                let t = i as f64 / steps as f64;
                shifts.insert(to_shift(&a.lerp(&b, t)));
            }
        }

        let mut cells = BTreeSet::new();
        for s in &shifts {
            cells.extend(
                self.cells
                    .iter()
                    .map(|c| (c.0 + s.0, c.1 + s.1, c.2 + s.2)),
            );
        }
        Ok(Self::with_cells(r, cells))
    }

    fn volume(&self) -> f64 {
        self.cells.len() as f64 * self.cell_volume()
    }

    fn bounding_box(&self) -> Option<Aabb> {
        let first = self.cells.iter().next()?;
        let (mut lo, mut hi) = (*first, *first);
        for c in self.cells.iter() {
            lo = (lo.0.min(c.0), lo.1.min(c.1), lo.2.min(c.2));
            hi = (hi.0.max(c.0), hi.1.max(c.1), hi.2.max(c.2));
        }
        let r = self.resolution;
        Some(Aabb::new(
            Point3::new(f64::from(lo.0) * r, f64::from(lo.1) * r, f64::from(lo.2) * r),
            Point3::new(
                f64::from(hi.0 + 1) * r,
                f64::from(hi.1 + 1) * r,
                f64::from(hi.2 + 1) * r,
            ),
        ))
    }

    fn is_valid(&self) -> bool {
        all_vertices(&self.cells)
            .into_iter()
            .all(|v| is_manifold_mask(vertex_mask(&self.cells, v)))
    }

    fn regularized(&self) -> Self {
        let mut out = self.clone();
        let pending = all_vertices(&out.cells);
        let mut removed = Vec::new();
        let cells = Arc::make_mut(&mut out.cells);
        if !repair(cells, pending, &mut removed, MAX_REPAIR_PASSES) {
            warn!(removed = removed.len(), "regularisation stopped at pass limit");
        }
        out
    }

    fn subtract_valid(&mut self, other: &Self) -> Option<f64> {
        self.subtract_repaired(other, MAX_REPAIR_PASSES)
    }
}

impl VoxelSolid {
    /// Subtract `other`, repairing around the removed cells within `passes`
    ///
    /// On failure every removed cell is put back.
    fn subtract_repaired(&mut self, other: &Self, passes: usize) -> Option<f64> {
        let other = self.aligned(other);
        let hits: Vec<Cell> = other
            .cells
            .iter()
            .copied()
            .filter(|c| self.cells.contains(c))
            .collect();
        if hits.is_empty() {
            return Some(0.0);
        }
        let cell_volume = self.cell_volume();
        let cells = Arc::make_mut(&mut self.cells);
        let mut pending = BTreeSet::new();
        for c in &hits {
            cells.remove(c);
            pending.extend(cell_vertices(*c));
        }
        let mut extra = Vec::new();
        if repair(cells, pending, &mut extra, passes) {
            Some((hits.len() + extra.len()) as f64 * cell_volume)
        } else {
            cells.extend(hits);
            cells.extend(extra);
            None
        }
    }
}

impl PartialOrd for VoxelSolid {
    /// Subset ordering; solids on different lattices are incomparable
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.resolution != other.resolution {
            return None;
        }
        match (
            self.cells.is_subset(&other.cells),
            self.cells.is_superset(&other.cells),
        ) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}

impl BitOrAssign<&VoxelSolid> for VoxelSolid {
    fn bitor_assign(&mut self, rhs: &VoxelSolid) {
        let rhs = self.aligned(rhs);
        if rhs.is_empty() {
            return;
        }
        Arc::make_mut(&mut self.cells).extend(rhs.cells.iter().copied());
    }
}

impl SubAssign<&VoxelSolid> for VoxelSolid {
    fn sub_assign(&mut self, rhs: &VoxelSolid) {
        let rhs = self.aligned(rhs);
        if rhs.is_empty() {
            return;
        }
        let cells = Arc::make_mut(&mut self.cells);
        for c in rhs.cells.iter() {
            cells.remove(c);
        }
    }
}

impl BitAndAssign<&VoxelSolid> for VoxelSolid {
    fn bitand_assign(&mut self, rhs: &VoxelSolid) {
        let rhs = self.aligned(rhs);
        Arc::make_mut(&mut self.cells).retain(|c| rhs.cells.contains(c));
    }
}

impl BitOr for &VoxelSolid {
    type Output = VoxelSolid;

    fn bitor(self, rhs: &VoxelSolid) -> VoxelSolid {
        self.union(rhs)
    }
}

impl Sub for &VoxelSolid {
    type Output = VoxelSolid;

    fn sub(self, rhs: &VoxelSolid) -> VoxelSolid {
        self.difference(rhs)
    }
}

impl BitAnd for &VoxelSolid {
    type Output = VoxelSolid;

    fn bitand(self, rhs: &VoxelSolid) -> VoxelSolid {
        self.intersection(rhs)
    }
}
