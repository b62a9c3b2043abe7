//! Shape-accumulation builder for topology-reshaping filters.
//!
//! A filter that decomposes cells (hex-to-tet splitting, clipping,
//! isovolume extraction) appends output shapes whose vertices reference
//! original input points, edge-interpolated points, or synthesized
//! centroid points. [`VolumeFromVolume::construct_data_set`] then emits a
//! single unstructured grid with interpolated point data and copied-through
//! cell data.
//!
//! Point provenance is an explicit sum type ([`PointRef`]); the historical
//! negative-id encoding (`id = -(1 + centroidIndex)`) is gone, but the
//! two-phase accumulate-then-resolve protocol is the same: shapes are
//! appended per input cell during one filter execution, consumed exactly
//! once, then the builder is discarded.

use crate::dataset::array::AttributeSet;
use crate::dataset::cell::{Cell, CellShape};
use crate::dataset::grid::UnstructuredGrid;
use crate::pipeline_error::PipelineError;
use hashbrown::HashMap;

/// Where an output vertex comes from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PointRef {
    /// An input point, by its original id.
    Original(usize),
    /// An edge-interpolated point, by its index in the edge-point list.
    Edge(usize),
    /// A synthesized centroid point, by its index in the centroid list.
    Centroid(usize),
}

#[derive(Clone, Copy, Debug)]
struct EdgePoint {
    a: usize,
    b: usize,
    /// Blend fraction weighting endpoint `a`.
    blend: f64,
}

#[derive(Clone, Debug)]
struct CentroidPoint {
    contributors: Vec<PointRef>,
}

#[derive(Clone, Debug)]
struct Shape {
    shape: CellShape,
    verts: Vec<PointRef>,
    source_cell: usize,
}

/// How `construct_data_set` fetches input point coordinates.
///
/// Both sources produce byte-identical topology and attributes for
/// equivalent inputs; only the coordinate fetch differs.
pub enum CoordSource<'a> {
    /// Explicit point coordinates.
    Points(&'a [[f64; 3]]),
    /// Implicit rectilinear coordinates: a point's position is computed
    /// from its flattened index via `i = idx % nx`, `j = (idx/nx) % ny`,
    /// `k = idx/(nx·ny)`.
    Rectilinear {
        x: &'a [f64],
        y: &'a [f64],
        z: &'a [f64],
    },
}

impl CoordSource<'_> {
    pub fn num_points(&self) -> usize {
        match self {
            CoordSource::Points(p) => p.len(),
            CoordSource::Rectilinear { x, y, z } => x.len() * y.len() * z.len(),
        }
    }

    #[inline]
    pub fn point(&self, idx: usize) -> [f64; 3] {
        match self {
            CoordSource::Points(p) => p[idx],
            CoordSource::Rectilinear { x, y, z } => {
                let nx = x.len();
                let ny = y.len();
                [x[idx % nx], y[(idx / nx) % ny], z[idx / (nx * ny)]]
            }
        }
    }
}

/// Accumulates output shapes for one filter execution over one input
/// dataset, then resolves them into an unstructured grid.
pub struct VolumeFromVolume {
    n_input_points: usize,
    edges: Vec<EdgePoint>,
    /// Keyed by (low endpoint, high endpoint, blend-toward-low bits) so
    /// repeated requests for the same edge across adjacent cells reuse
    /// the same output point.
    edge_lookup: HashMap<(usize, usize, u64), usize>,
    centroids: Vec<CentroidPoint>,
    shapes: Vec<Shape>,
}

/// Fixed family emission order for output cells.
const FAMILY_ORDER: [CellShape; 6] = [
    CellShape::Tet,
    CellShape::Pyramid,
    CellShape::Wedge,
    CellShape::Hex,
    CellShape::Quad,
    CellShape::Tri,
];

impl VolumeFromVolume {
    /// `n_input_points` is the point count of the dataset being
    /// decomposed; original ids must stay below it.
    pub fn new(n_input_points: usize) -> Self {
        Self {
            n_input_points,
            edges: Vec::new(),
            edge_lookup: HashMap::new(),
            centroids: Vec::new(),
            shapes: Vec::new(),
        }
    }

    pub fn num_edge_points(&self) -> usize {
        self.edges.len()
    }

    pub fn num_centroid_points(&self) -> usize {
        self.centroids.len()
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    /// Point count `construct_data_set` will emit.
    pub fn total_output_points(&self) -> usize {
        self.n_input_points + self.edges.len() + self.centroids.len()
    }

    /// Register (or reuse) the point interpolated along the edge
    /// `(a, b)` with blend fraction `blend` weighting `a`. The same edge
    /// requested from an adjacent cell with the mirrored orientation
    /// resolves to the same output point.
    pub fn add_edge_point(&mut self, a: usize, b: usize, blend: f64) -> PointRef {
        debug_assert!(a < self.n_input_points && b < self.n_input_points);
        let (lo, hi, blend_lo) = if a <= b { (a, b, blend) } else { (b, a, 1.0 - blend) };
        let key = (lo, hi, blend_lo.to_bits());
        if let Some(&i) = self.edge_lookup.get(&key) {
            return PointRef::Edge(i);
        }
        let i = self.edges.len();
        self.edges.push(EdgePoint {
            a: lo,
            b: hi,
            blend: blend_lo,
        });
        self.edge_lookup.insert(key, i);
        PointRef::Edge(i)
    }

    /// Register a synthesized centroid point averaging `contributors`.
    /// Contributors may reference earlier centroids.
    pub fn add_centroid_point(&mut self, contributors: Vec<PointRef>) -> PointRef {
        debug_assert!(!contributors.is_empty());
        let i = self.centroids.len();
        self.centroids.push(CentroidPoint { contributors });
        PointRef::Centroid(i)
    }

    fn add_shape(&mut self, shape: CellShape, source_cell: usize, verts: &[PointRef]) {
        debug_assert_eq!(verts.len(), shape.vertex_count());
        self.shapes.push(Shape {
            shape,
            verts: verts.to_vec(),
            source_cell,
        });
    }

    pub fn add_tet(&mut self, source_cell: usize, verts: [PointRef; 4]) {
        self.add_shape(CellShape::Tet, source_cell, &verts);
    }

    pub fn add_pyramid(&mut self, source_cell: usize, verts: [PointRef; 5]) {
        self.add_shape(CellShape::Pyramid, source_cell, &verts);
    }

    pub fn add_wedge(&mut self, source_cell: usize, verts: [PointRef; 6]) {
        self.add_shape(CellShape::Wedge, source_cell, &verts);
    }

    pub fn add_hex(&mut self, source_cell: usize, verts: [PointRef; 8]) {
        self.add_shape(CellShape::Hex, source_cell, &verts);
    }

    pub fn add_quad(&mut self, source_cell: usize, verts: [PointRef; 4]) {
        self.add_shape(CellShape::Quad, source_cell, &verts);
    }

    pub fn add_tri(&mut self, source_cell: usize, verts: [PointRef; 3]) {
        self.add_shape(CellShape::Tri, source_cell, &verts);
    }

    /// Resolve a vertex reference into an output point id.
    ///
    /// `centroid_limit` bounds which centroids are resolvable so a
    /// centroid's contributor list can only reach *earlier* centroids.
    fn resolve(&self, r: PointRef, centroid_limit: usize) -> Result<usize, PipelineError> {
        match r {
            PointRef::Original(i) => {
                if i >= self.n_input_points {
                    return Err(PipelineError::UnresolvedPoint(format!(
                        "original point {i} out of range ({} input points)",
                        self.n_input_points
                    )));
                }
                Ok(i)
            }
            PointRef::Edge(i) => {
                if i >= self.edges.len() {
                    return Err(PipelineError::UnresolvedPoint(format!(
                        "edge point {i} out of range ({} edge points)",
                        self.edges.len()
                    )));
                }
                Ok(self.n_input_points + i)
            }
            PointRef::Centroid(i) => {
                if i >= centroid_limit {
                    return Err(PipelineError::UnresolvedPoint(format!(
                        "centroid {i} referenced before it was finalized (limit {centroid_limit})"
                    )));
                }
                Ok(self.n_input_points + self.edges.len() + i)
            }
        }
    }

    /// Consume the accumulated shapes against explicit point coordinates.
    pub fn construct_data_set(
        self,
        points: &[[f64; 3]],
        point_data: &AttributeSet,
        cell_data: &AttributeSet,
    ) -> Result<UnstructuredGrid, PipelineError> {
        self.construct(CoordSource::Points(points), point_data, cell_data)
    }

    /// Consume the accumulated shapes against implicit rectilinear
    /// coordinates.
    pub fn construct_data_set_rectilinear(
        self,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        point_data: &AttributeSet,
        cell_data: &AttributeSet,
    ) -> Result<UnstructuredGrid, PipelineError> {
        self.construct(CoordSource::Rectilinear { x, y, z }, point_data, cell_data)
    }

    fn construct(
        self,
        coords: CoordSource<'_>,
        point_data: &AttributeSet,
        cell_data: &AttributeSet,
    ) -> Result<UnstructuredGrid, PipelineError> {
        if coords.num_points() != self.n_input_points {
            return Err(PipelineError::InvalidGeometry(format!(
                "coordinate source has {} points, accumulator was built for {}",
                coords.num_points(),
                self.n_input_points
            )));
        }
        let mut out = UnstructuredGrid::default();
        out.points.reserve(self.total_output_points());

        // (a) Original points first, ids and data preserved.
        for i in 0..self.n_input_points {
            out.points.push(coords.point(i));
        }
        out.point_data = point_data.empty_like(self.total_output_points());
        for (dst, src) in out.point_data.zip_like(point_data) {
            for i in 0..self.n_input_points {
                dst.push_tuple_from(src, i);
            }
        }

        // (b) Edge-interpolated points: bp·P0 + (1−bp)·P1.
        for e in &self.edges {
            let pa = coords.point(e.a);
            let pb = coords.point(e.b);
            let mut p = [0.0; 3];
            for c in 0..3 {
                p[c] = e.blend * pa[c] + (1.0 - e.blend) * pb[c];
            }
            out.points.push(p);
        }
        for (dst, src) in out.point_data.zip_like(point_data) {
            for e in &self.edges {
                dst.push_edge_interpolated(src, e.a, e.b, e.blend);
            }
        }

        // (c) Centroid points last, averaging already-emitted points.
        for (ci, centroid) in self.centroids.iter().enumerate() {
            let ids: Vec<usize> = centroid
                .contributors
                .iter()
                .map(|&r| self.resolve(r, ci))
                .collect::<Result<_, _>>()?;
            let w = 1.0 / ids.len() as f64;
            let mut p = [0.0; 3];
            for &id in &ids {
                for c in 0..3 {
                    p[c] += out.points[id][c];
                }
            }
            out.points.push(p.map(|v| v * w));
            for dst in out.point_data.iter_mut() {
                dst.push_uniform_average_self(&ids);
            }
        }

        // (d) Cells in fixed family order, cell data copied from the
        // owning input cell.
        out.cell_data = cell_data.empty_like(self.shapes.len());
        let all_centroids = self.centroids.len();
        for family in FAMILY_ORDER {
            for s in self.shapes.iter().filter(|s| s.shape == family) {
                let conn: Vec<usize> = s
                    .verts
                    .iter()
                    .map(|&r| self.resolve(r, all_centroids))
                    .collect::<Result<_, _>>()?;
                out.cells.push(Cell::new(family, conn));
                for (dst, src) in out.cell_data.zip_like(cell_data) {
                    dst.push_tuple_from(src, s.source_cell);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::array::DataArray;

    fn unit_hex_points() -> Vec<[f64; 3]> {
        let mut pts = Vec::new();
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    pts.push([i as f64, j as f64, k as f64]);
                }
            }
        }
        pts
    }

    #[test]
    fn edge_points_are_reused_across_orientations() {
        let mut v = VolumeFromVolume::new(8);
        let e1 = v.add_edge_point(0, 1, 0.25);
        let e2 = v.add_edge_point(1, 0, 0.75);
        assert_eq!(e1, e2);
        assert_eq!(v.num_edge_points(), 1);
        let e3 = v.add_edge_point(0, 1, 0.5);
        assert_ne!(e1, e3);
    }

    #[test]
    fn point_accounting_is_exact() {
        let mut v = VolumeFromVolume::new(8);
        let e = v.add_edge_point(0, 7, 0.5);
        let c = v.add_centroid_point(vec![
            PointRef::Original(0),
            PointRef::Original(1),
            PointRef::Original(2),
            PointRef::Original(3),
        ]);
        v.add_tet(0, [PointRef::Original(0), PointRef::Original(1), e, c]);
        assert_eq!(v.total_output_points(), 10);
        let out = v
            .construct_data_set(&unit_hex_points(), &AttributeSet::new(), &AttributeSet::new())
            .unwrap();
        assert_eq!(out.points.len(), 10);
        for cell in &out.cells {
            for &p in &cell.connectivity {
                assert!(p < out.points.len());
            }
        }
    }

    #[test]
    fn family_order_and_cell_data_copy_through() {
        let mut v = VolumeFromVolume::new(8);
        let o = PointRef::Original;
        v.add_quad(1, [o(0), o(1), o(3), o(2)]);
        v.add_tet(0, [o(0), o(1), o(2), o(4)]);
        v.add_tri(2, [o(4), o(5), o(6)]);
        let cell_data = {
            let mut s = AttributeSet::new();
            s.set(DataArray::scalar("m", vec![10.0, 20.0, 30.0]));
            s
        };
        let out = v
            .construct_data_set(&unit_hex_points(), &AttributeSet::new(), &cell_data)
            .unwrap();
        // Tets before quads before tris regardless of insertion order.
        assert_eq!(out.cells[0].shape, CellShape::Tet);
        assert_eq!(out.cells[1].shape, CellShape::Quad);
        assert_eq!(out.cells[2].shape, CellShape::Tri);
        assert_eq!(out.cell_data.get("m").unwrap().values(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn centroid_point_data_is_uniform_average() {
        let mut v = VolumeFromVolume::new(2);
        let c = v.add_centroid_point(vec![PointRef::Original(0), PointRef::Original(1)]);
        v.add_tri(0, [PointRef::Original(0), PointRef::Original(1), c]);
        let mut pd = AttributeSet::new();
        pd.set(DataArray::scalar("t", vec![1.0, 3.0]));
        let pts = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let out = v.construct_data_set(&pts, &pd, &AttributeSet::new()).unwrap();
        assert_eq!(out.points[2], [0.5, 0.0, 0.0]);
        assert_eq!(out.point_data.get("t").unwrap().values(), &[1.0, 3.0, 2.0]);
    }

    #[test]
    fn centroid_may_reference_earlier_centroid_only() {
        let mut v = VolumeFromVolume::new(2);
        let c0 = v.add_centroid_point(vec![PointRef::Original(0), PointRef::Original(1)]);
        let c1 = v.add_centroid_point(vec![c0, PointRef::Original(0)]);
        v.add_tri(0, [PointRef::Original(0), c0, c1]);
        let pts = vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let out = v
            .construct_data_set(&pts, &AttributeSet::new(), &AttributeSet::new())
            .unwrap();
        // c0 = midpoint (1,0,0); c1 = avg(c0, p0) = (0.5,0,0).
        assert_eq!(out.points[2], [1.0, 0.0, 0.0]);
        assert_eq!(out.points[3], [0.5, 0.0, 0.0]);
    }

    #[test]
    fn forward_centroid_reference_is_an_error() {
        let mut v = VolumeFromVolume::new(2);
        // Contributor references a centroid that does not exist yet.
        v.add_centroid_point(vec![PointRef::Centroid(5), PointRef::Original(0)]);
        let pts = vec![[0.0; 3], [1.0, 0.0, 0.0]];
        let err = v
            .construct_data_set(&pts, &AttributeSet::new(), &AttributeSet::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvedPoint(_)));
    }

    #[test]
    fn rectilinear_and_flat_sources_agree() {
        let x = vec![0.0, 1.0];
        let y = vec![0.0, 2.0];
        let z = vec![0.0, 3.0];
        let mut flat = Vec::new();
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    flat.push([x[i], y[j], z[k]]);
                }
            }
        }
        let build = || {
            let mut v = VolumeFromVolume::new(8);
            let e = v.add_edge_point(0, 7, 0.5);
            let c = v.add_centroid_point(vec![
                PointRef::Original(0),
                PointRef::Original(3),
                PointRef::Original(5),
                PointRef::Original(6),
            ]);
            v.add_tet(0, [PointRef::Original(0), PointRef::Original(1), e, c]);
            v
        };
        let a = build()
            .construct_data_set(&flat, &AttributeSet::new(), &AttributeSet::new())
            .unwrap();
        let b = build()
            .construct_data_set_rectilinear(&x, &y, &z, &AttributeSet::new(), &AttributeSet::new())
            .unwrap();
        assert_eq!(a, b);
    }
}
