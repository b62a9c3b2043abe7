//! Unit-cell replication filter.
//!
//! Replicates each domain `xrep × yrep × zrep` times along three lattice
//! vectors. The vectors come either from the filter's configuration or
//! from a `unit_cell_vectors` field-data array carried by the dataset
//! (optionally corrected by an `inverse_grid_transform` matrix stored the
//! same way). Axis-aligned rectilinear grids replicate by offsetting
//! their coordinate arrays; everything else replicates by full
//! point-offset copies. In merged mode an optional post-pass mirrors
//! atoms sitting on the replicated block's boundary faces to the
//! opposite side, which needs global knowledge of all offsets and is
//! therefore unavailable when images stay separate leaves.

use crate::dataset::array::DataArray;
use crate::dataset::grid::Grid;
use crate::dataset::tree::DataTree;
use crate::filter::info::DataObjectInfo;
use crate::filter::Filter;
use crate::pipeline_error::PipelineError;

/// Field-data array naming the unit cell's three lattice vectors
/// (3 components × 3 tuples, row per vector).
pub const UNIT_CELL_VECTORS: &str = "unit_cell_vectors";

/// Field-data array carrying a 3×3 inverse grid transform applied to the
/// unit-cell vectors before use (3 components × 3 tuples, row-major).
pub const INVERSE_GRID_TRANSFORM: &str = "inverse_grid_transform";

/// Distance from a boundary face, in normalized lattice coordinates,
/// within which an atom is considered *on* the face and mirrored.
pub const BOUNDARY_THRESHOLD: f64 = 1e-4;

/// Replicates a dataset along three lattice vectors.
#[derive(Debug)]
pub struct ReplicateFilter {
    reps: [usize; 3],
    vectors: Option<[[f64; 3]; 3]>,
    merge: bool,
    replicate_boundary_atoms: bool,
}

impl ReplicateFilter {
    /// Replicate `reps[a]` times along axis `a`. Each count must be ≥ 1;
    /// `[1, 1, 1]` is the identity.
    pub fn new(reps: [usize; 3]) -> Self {
        Self {
            reps,
            vectors: None,
            merge: false,
            replicate_boundary_atoms: false,
        }
    }

    /// Use explicit lattice vectors instead of field data.
    pub fn with_vectors(mut self, vectors: [[f64; 3]; 3]) -> Self {
        self.vectors = Some(vectors);
        self
    }

    /// Merge all images into a single unstructured output.
    pub fn merged(mut self) -> Self {
        self.merge = true;
        self
    }

    /// In merged mode, also mirror boundary-face atoms to the opposite
    /// side of the replicated block. Ignored when images are kept as
    /// separate leaves.
    pub fn with_boundary_atoms(mut self) -> Self {
        self.replicate_boundary_atoms = true;
        self
    }

    /// Resolve the lattice vectors for `grid`.
    ///
    /// Priority: explicit configuration, then the dataset's field data,
    /// then the grid's own bounding box widths. A zero-width axis falls
    /// back to a unit vector so a degenerate (2D) dataset still
    /// replicates.
    fn lattice_vectors(&self, grid: &Grid) -> Result<[[f64; 3]; 3], PipelineError> {
        if let Some(v) = self.vectors {
            return Ok(v);
        }
        if let Some(arr) = grid.field_data().get(UNIT_CELL_VECTORS) {
            let mut v = read_matrix(arr)?;
            if let Some(inv) = grid.field_data().get(INVERSE_GRID_TRANSFORM) {
                let m = read_matrix(inv)?;
                for row in &mut v {
                    *row = mat_vec(&m, *row);
                }
            }
            return Ok(v);
        }
        let b = grid.bounds().ok_or_else(|| {
            PipelineError::InvalidGeometry("cannot replicate an empty dataset".into())
        })?;
        let mut v = [[0.0; 3]; 3];
        for a in 0..3 {
            let w = b[2 * a + 1] - b[2 * a];
            v[a][a] = if w > 0.0 { w } else { 1.0 };
        }
        Ok(v)
    }

    fn axis_aligned(vectors: &[[f64; 3]; 3]) -> bool {
        (0..3).all(|a| (0..3).all(|c| a == c || vectors[a][c] == 0.0))
    }

    /// One replicated image at lattice offset `(i, j, k)`.
    fn image(grid: &Grid, vectors: &[[f64; 3]; 3], ijk: [usize; 3]) -> Grid {
        let offset = lattice_offset(vectors, ijk);
        match grid {
            Grid::Rectilinear(g) if Self::axis_aligned(vectors) => {
                let mut out = g.clone();
                for (axis, coords) in
                    [&mut out.x, &mut out.y, &mut out.z].into_iter().enumerate()
                {
                    for c in coords.iter_mut() {
                        *c += offset[axis];
                    }
                }
                Grid::Rectilinear(out)
            }
            _ => {
                let mut out = grid.to_unstructured();
                for p in &mut out.points {
                    for a in 0..3 {
                        p[a] += offset[a];
                    }
                }
                Grid::Unstructured(out)
            }
        }
    }

    fn fan_out(&self, grid: &Grid, domain: usize, label: &str) -> Result<DataTree, PipelineError> {
        let vectors = self.lattice_vectors(grid)?;
        let [xr, yr, zr] = self.reps;
        let mut children = Vec::with_capacity(xr * yr * zr);
        for k in 0..zr {
            for j in 0..yr {
                for i in 0..xr {
                    children.push(DataTree::leaf(
                        Some(Self::image(grid, &vectors, [i, j, k])),
                        domain,
                        format!("{label}_r{i}_{j}_{k}"),
                    ));
                }
            }
        }
        Ok(DataTree::node(children))
    }

    fn merged_image(&self, grid: &Grid, domain: usize, label: &str) -> Result<Option<Grid>, PipelineError> {
        let vectors = self.lattice_vectors(grid)?;
        let tree = self.fan_out(grid, domain, label)?;
        let Some(mut merged) = tree.append_leaves()? else {
            return Ok(None);
        };
        if self.replicate_boundary_atoms {
            mirror_boundary_atoms(&mut merged, &vectors, self.reps)?;
        }
        Ok(Some(Grid::Unstructured(merged)))
    }
}

impl Filter for ReplicateFilter {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn execute_data(
        &mut self,
        grid: &Grid,
        domain: usize,
        label: &str,
    ) -> Result<Option<Grid>, PipelineError> {
        self.merged_image(grid, domain, label)
    }

    fn execute_data_tree(
        &mut self,
        grid: &Grid,
        domain: usize,
        label: &str,
    ) -> Result<DataTree, PipelineError> {
        if self.merge {
            Ok(DataTree::leaf(
                self.merged_image(grid, domain, label)?,
                domain,
                label,
            ))
        } else {
            self.fan_out(grid, domain, label)
        }
    }

    fn update_data_object_info(&self, info: &mut DataObjectInfo) {
        if self.reps != [1, 1, 1] {
            info.invalidate_points();
            info.invalidate_zones();
        }
    }
}

/// Read a 3×3 matrix stored as a 3-component, 3-tuple field-data array.
fn read_matrix(arr: &DataArray) -> Result<[[f64; 3]; 3], PipelineError> {
    if arr.components() != 3 || arr.num_tuples() != 3 {
        return Err(PipelineError::ComponentMismatch {
            name: arr.name().to_string(),
            expected: 3,
            actual: arr.components(),
        });
    }
    let mut m = [[0.0; 3]; 3];
    for (r, row) in m.iter_mut().enumerate() {
        row.copy_from_slice(arr.tuple(r));
    }
    Ok(m)
}

fn mat_vec(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn lattice_offset(vectors: &[[f64; 3]; 3], [i, j, k]: [usize; 3]) -> [f64; 3] {
    let mut o = [0.0; 3];
    for a in 0..3 {
        o[a] = i as f64 * vectors[0][a] + j as f64 * vectors[1][a] + k as f64 * vectors[2][a];
    }
    o
}

/// Invert the matrix whose *columns* are the lattice vectors, so a point
/// can be expressed in normalized lattice coordinates.
fn lattice_inverse(vectors: &[[f64; 3]; 3]) -> Result<[[f64; 3]; 3], PipelineError> {
    // m[r][c] = component r of lattice vector c.
    let mut m = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            m[r][c] = vectors[c][r];
        }
    }
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-30 {
        return Err(PipelineError::InvalidGeometry(
            "unit cell vectors are linearly dependent".into(),
        ));
    }
    let d = 1.0 / det;
    Ok([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * d,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * d,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * d,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * d,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * d,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * d,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * d,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * d,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * d,
        ],
    ])
}

/// Mirror atoms on the replicated block's boundary faces to the opposite
/// side.
///
/// An atom whose normalized lattice coordinate along axis `a` is within
/// [`BOUNDARY_THRESHOLD`] of `0` (or of `reps[a]`) gains an image shifted
/// by `+reps[a]` (or `−reps[a]`) lattice cells along that axis. Every
/// nonempty combination of flagged axes produces one image, so a face
/// atom gains 1, an edge atom 3, and a corner atom 7. Images copy the
/// source atom's point data; cells are untouched.
fn mirror_boundary_atoms(
    g: &mut crate::dataset::grid::UnstructuredGrid,
    vectors: &[[f64; 3]; 3],
    reps: [usize; 3],
) -> Result<(), PipelineError> {
    let inv = lattice_inverse(vectors)?;
    let n = g.points.len();
    let mut mirrored = 0usize;
    let src_data = g.point_data.clone();
    for i in 0..n {
        let p = g.points[i];
        let lat = mat_vec(&inv, p);
        // Per axis: the lattice-cell shift that mirrors this atom, if on
        // a boundary face of the whole block.
        let mut shifts = [0f64; 3];
        for a in 0..3 {
            if lat[a].abs() <= BOUNDARY_THRESHOLD {
                shifts[a] = reps[a] as f64;
            } else if (lat[a] - reps[a] as f64).abs() <= BOUNDARY_THRESHOLD {
                shifts[a] = -(reps[a] as f64);
            }
        }
        let flagged: Vec<usize> = (0..3).filter(|&a| shifts[a] != 0.0).collect();
        if flagged.is_empty() {
            continue;
        }
        // Each nonempty subset of flagged axes is one image.
        for mask in 1u8..(1 << flagged.len()) {
            let mut q = p;
            for (bit, &a) in flagged.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    for c in 0..3 {
                        q[c] += shifts[a] * vectors[a][c];
                    }
                }
            }
            g.points.push(q);
            for (out, from) in g.point_data.zip_like(&src_data) {
                out.push_tuple_from(from, i);
            }
            mirrored += 1;
        }
    }
    if mirrored > 0 {
        log::debug!("replicate: mirrored {mirrored} boundary atom image(s)");
    }
    Ok(())
}
