//! Concrete per-domain grid representations.
//!
//! The pipeline carries two representations: `Rectilinear` (implicit
//! topology, per-axis coordinate arrays) and `Unstructured` (explicit
//! points + cells). Both carry point data, cell data, and per-dataset
//! field data. Filters that cannot preserve implicit topology convert to
//! unstructured first via [`Grid::to_unstructured`].

use crate::dataset::array::{AttributeSet, DataArray};
use crate::dataset::cell::{Cell, CellShape};
use crate::pipeline_error::PipelineError;

/// Rectilinear grid: per-axis coordinate arrays, implicit topology.
///
/// A degenerate axis (`len == 1`) collapses that dimension; a 2D grid has
/// `z.len() == 1`. Point index layout is `i + j·nx + k·nx·ny`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RectilinearGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub point_data: AttributeSet,
    pub cell_data: AttributeSet,
    pub field_data: AttributeSet,
}

impl RectilinearGrid {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        Self {
            x,
            y,
            z,
            point_data: AttributeSet::new(),
            cell_data: AttributeSet::new(),
            field_data: AttributeSet::new(),
        }
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        [self.x.len(), self.y.len(), self.z.len()]
    }

    pub fn num_points(&self) -> usize {
        self.x.len() * self.y.len() * self.z.len()
    }

    /// Cells per axis: `max(len−1, 1)` so degenerate axes contribute one
    /// layer rather than zero.
    fn cell_dims(&self) -> [usize; 3] {
        [
            self.x.len().saturating_sub(1).max(1),
            self.y.len().saturating_sub(1).max(1),
            self.z.len().saturating_sub(1).max(1),
        ]
    }

    pub fn num_cells(&self) -> usize {
        let [cx, cy, cz] = self.cell_dims();
        cx * cy * cz
    }

    /// Decode a flattened point index into `(i, j, k)`.
    #[inline]
    pub fn point_ijk(&self, idx: usize) -> (usize, usize, usize) {
        let nx = self.x.len();
        let ny = self.y.len();
        (idx % nx, (idx / nx) % ny, idx / (nx * ny))
    }

    /// Coordinate of the point at flattened index `idx`.
    #[inline]
    pub fn point(&self, idx: usize) -> [f64; 3] {
        let (i, j, k) = self.point_ijk(idx);
        [self.x[i], self.y[j], self.z[k]]
    }

    pub fn spatial_dimension(&self) -> u8 {
        let mut d = 0;
        for n in [self.x.len(), self.y.len(), self.z.len()] {
            if n > 1 {
                d += 1;
            }
        }
        d
    }
}

/// Unstructured grid: explicit points and cells.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnstructuredGrid {
    pub points: Vec<[f64; 3]>,
    pub cells: Vec<Cell>,
    pub point_data: AttributeSet,
    pub cell_data: AttributeSet,
    pub field_data: AttributeSet,
}

impl UnstructuredGrid {
    pub fn new(points: Vec<[f64; 3]>, cells: Vec<Cell>) -> Self {
        Self {
            points,
            cells,
            ..Default::default()
        }
    }

    /// Average of the cell's vertex coordinates.
    pub fn cell_centroid(&self, cell: &Cell) -> [f64; 3] {
        let mut c = [0.0; 3];
        for &p in &cell.connectivity {
            for (a, b) in c.iter_mut().zip(self.points[p]) {
                *a += b;
            }
        }
        let w = 1.0 / cell.connectivity.len() as f64;
        c.map(|v| v * w)
    }
}

/// A per-domain dataset.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Grid {
    Rectilinear(RectilinearGrid),
    Unstructured(UnstructuredGrid),
}

impl Grid {
    pub fn num_points(&self) -> usize {
        match self {
            Grid::Rectilinear(g) => g.num_points(),
            Grid::Unstructured(g) => g.points.len(),
        }
    }

    pub fn num_cells(&self) -> usize {
        match self {
            Grid::Rectilinear(g) => g.num_cells(),
            Grid::Unstructured(g) => g.cells.len(),
        }
    }

    pub fn point(&self, idx: usize) -> [f64; 3] {
        match self {
            Grid::Rectilinear(g) => g.point(idx),
            Grid::Unstructured(g) => g.points[idx],
        }
    }

    pub fn point_data(&self) -> &AttributeSet {
        match self {
            Grid::Rectilinear(g) => &g.point_data,
            Grid::Unstructured(g) => &g.point_data,
        }
    }

    pub fn point_data_mut(&mut self) -> &mut AttributeSet {
        match self {
            Grid::Rectilinear(g) => &mut g.point_data,
            Grid::Unstructured(g) => &mut g.point_data,
        }
    }

    pub fn cell_data(&self) -> &AttributeSet {
        match self {
            Grid::Rectilinear(g) => &g.cell_data,
            Grid::Unstructured(g) => &g.cell_data,
        }
    }

    pub fn cell_data_mut(&mut self) -> &mut AttributeSet {
        match self {
            Grid::Rectilinear(g) => &mut g.cell_data,
            Grid::Unstructured(g) => &mut g.cell_data,
        }
    }

    pub fn field_data(&self) -> &AttributeSet {
        match self {
            Grid::Rectilinear(g) => &g.field_data,
            Grid::Unstructured(g) => &g.field_data,
        }
    }

    pub fn field_data_mut(&mut self) -> &mut AttributeSet {
        match self {
            Grid::Rectilinear(g) => &mut g.field_data,
            Grid::Unstructured(g) => &mut g.field_data,
        }
    }

    /// Axis-aligned bounds `[xmin, xmax, ymin, ymax, zmin, zmax]`, or
    /// `None` for a grid with no points.
    pub fn bounds(&self) -> Option<[f64; 6]> {
        let n = self.num_points();
        if n == 0 {
            return None;
        }
        let mut b = [
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        ];
        for idx in 0..n {
            let p = self.point(idx);
            for a in 0..3 {
                b[2 * a] = b[2 * a].min(p[a]);
                b[2 * a + 1] = b[2 * a + 1].max(p[a]);
            }
        }
        Some(b)
    }

    pub fn spatial_dimension(&self) -> u8 {
        match self {
            Grid::Rectilinear(g) => g.spatial_dimension(),
            Grid::Unstructured(_) => match self.bounds() {
                Some(b) => {
                    let mut d = 0;
                    for a in 0..3 {
                        if b[2 * a + 1] > b[2 * a] {
                            d += 1;
                        }
                    }
                    d
                }
                None => 0,
            },
        }
    }

    /// Explicit-topology copy of this grid. Rectilinear grids emit hexes
    /// (quads when the z axis is degenerate); unstructured grids clone.
    pub fn to_unstructured(&self) -> UnstructuredGrid {
        match self {
            Grid::Unstructured(g) => g.clone(),
            Grid::Rectilinear(g) => {
                let nx = g.x.len();
                let ny = g.y.len();
                let nz = g.z.len();
                let mut points = Vec::with_capacity(g.num_points());
                for idx in 0..g.num_points() {
                    points.push(g.point(idx));
                }
                let pid = |i: usize, j: usize, k: usize| i + j * nx + k * nx * ny;
                let mut cells = Vec::with_capacity(g.num_cells());
                if nz <= 1 {
                    for j in 0..ny.saturating_sub(1) {
                        for i in 0..nx.saturating_sub(1) {
                            cells.push(Cell::new(
                                CellShape::Quad,
                                vec![
                                    pid(i, j, 0),
                                    pid(i + 1, j, 0),
                                    pid(i + 1, j + 1, 0),
                                    pid(i, j + 1, 0),
                                ],
                            ));
                        }
                    }
                } else {
                    for k in 0..nz - 1 {
                        for j in 0..ny - 1 {
                            for i in 0..nx - 1 {
                                cells.push(Cell::new(
                                    CellShape::Hex,
                                    vec![
                                        pid(i, j, k),
                                        pid(i + 1, j, k),
                                        pid(i + 1, j + 1, k),
                                        pid(i, j + 1, k),
                                        pid(i, j, k + 1),
                                        pid(i + 1, j, k + 1),
                                        pid(i + 1, j + 1, k + 1),
                                        pid(i, j + 1, k + 1),
                                    ],
                                ));
                            }
                        }
                    }
                }
                UnstructuredGrid {
                    points,
                    cells,
                    point_data: g.point_data.clone(),
                    cell_data: g.cell_data.clone(),
                    field_data: g.field_data.clone(),
                }
            }
        }
    }

    /// Recenter a zone-centered array to the nodes by averaging, over all
    /// cells incident to each node. Returns the node-centered array.
    ///
    /// # Errors
    /// `MissingVariable` if the named array is not in the cell data.
    pub fn cell_to_point_average(&self, name: &str) -> Result<DataArray, PipelineError> {
        let src = self.cell_data().try_get(name)?;
        let g = self.to_unstructured();
        let ncomp = src.components();
        let npts = g.points.len();
        let mut sums = vec![0.0f64; npts * ncomp];
        let mut counts = vec![0u32; npts];
        for (ci, cell) in g.cells.iter().enumerate() {
            let t = src.tuple(ci);
            for &p in &cell.connectivity {
                counts[p] += 1;
                for c in 0..ncomp {
                    sums[p * ncomp + c] += t[c];
                }
            }
        }
        for p in 0..npts {
            if counts[p] > 0 {
                let w = 1.0 / counts[p] as f64;
                for c in 0..ncomp {
                    sums[p * ncomp + c] *= w;
                }
            }
        }
        DataArray::new(name, ncomp, sums)
    }
}
