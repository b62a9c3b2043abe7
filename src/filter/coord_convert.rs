//! Coordinate-system conversion filter.
//!
//! Converts a dataset between Cartesian, cylindrical, and spherical
//! coordinates. The three systems form a ring with exactly three
//! single-step conversions (Cartesian→Cylindrical, Cylindrical→Spherical,
//! Spherical→Cartesian); any other pair is reached by walking the ring,
//! at most two hops. Vector arrays are transformed with one of four
//! selectable semantics, and conversions into an angular system repair
//! cells straddling the 0/2π azimuthal seam by duplicating the point set.

use std::f64::consts::{PI, TAU};

use crate::dataset::array::is_bookkeeping_array;
use crate::dataset::grid::{Grid, UnstructuredGrid};
use crate::filter::info::DataObjectInfo;
use crate::filter::Filter;
use crate::pipeline_error::PipelineError;

/// Perturbation step for [`VectorTransformMethod::AsDirection`].
///
/// Fixed, not user-configurable. For coordinate magnitudes far from 1 the
/// finite difference loses precision; an adaptive step would change
/// results, so the constant stays. TODO: expose as a builder knob once a
/// consumer needs magnitudes outside ~1e-3..1e3.
pub const DIRECTION_EPSILON: f64 = 1e-5;

/// One of the three supported coordinate systems.
///
/// Cylindrical tuples are `(r, φ, z)`; spherical tuples are `(ρ, θ, φ)`
/// with ISO 31-11 ordering, `θ` the polar angle from +z and `φ` the
/// azimuth. Azimuths are normalized into `[0, 2π)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CoordSystem {
    Cartesian,
    Cylindrical,
    Spherical,
}

impl CoordSystem {
    /// Successor on the conversion ring.
    fn next(self) -> Self {
        match self {
            CoordSystem::Cartesian => CoordSystem::Cylindrical,
            CoordSystem::Cylindrical => CoordSystem::Spherical,
            CoordSystem::Spherical => CoordSystem::Cartesian,
        }
    }

    /// Apply this system's single outgoing conversion.
    fn step(self, p: [f64; 3]) -> [f64; 3] {
        match self {
            CoordSystem::Cartesian => cartesian_to_cylindrical(p),
            CoordSystem::Cylindrical => cylindrical_to_spherical(p),
            CoordSystem::Spherical => spherical_to_cartesian(p),
        }
    }

    /// Convert a point from `self` to `target`, walking the ring.
    pub fn convert(self, target: CoordSystem, mut p: [f64; 3]) -> [f64; 3] {
        let mut cur = self;
        while cur != target {
            p = cur.step(p);
            cur = cur.next();
        }
        p
    }

    /// Index of the azimuthal component in this system's tuples, if any.
    fn azimuth_component(self) -> Option<usize> {
        match self {
            CoordSystem::Cartesian => None,
            CoordSystem::Cylindrical => Some(1),
            CoordSystem::Spherical => Some(2),
        }
    }
}

/// `(x, y, z)` → `(r, φ, z)`, azimuth normalized into `[0, 2π)`.
pub fn cartesian_to_cylindrical([x, y, z]: [f64; 3]) -> [f64; 3] {
    let r = x.hypot(y);
    let mut phi = y.atan2(x);
    if phi < 0.0 {
        phi += TAU;
    }
    [r, phi, z]
}

/// `(r, φ, z)` → `(ρ, θ, φ)`, polar angle measured from +z.
pub fn cylindrical_to_spherical([r, phi, z]: [f64; 3]) -> [f64; 3] {
    let rho = r.hypot(z);
    let theta = r.atan2(z);
    [rho, theta, phi]
}

/// `(ρ, θ, φ)` → `(x, y, z)`.
pub fn spherical_to_cartesian([rho, theta, phi]: [f64; 3]) -> [f64; 3] {
    let st = theta.sin();
    [
        rho * st * phi.cos(),
        rho * st * phi.sin(),
        rho * theta.cos(),
    ]
}

/// How a 3-component vector array follows the coordinate transform.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum VectorTransformMethod {
    /// Component-wise passthrough; the values keep no geometric meaning.
    None,
    /// Run the components through the point transform as if they were a
    /// point.
    AsPoint,
    /// Transform `point + vector` and `point` separately; the new vector
    /// is the difference. Exact for finite displacements.
    #[default]
    AsDisplacement,
    /// Finite-difference Jacobian-vector product: perturb the point by
    /// `ε·vector`, transform, rescale by `1/ε`.
    AsDirection,
}

/// Transform one vector attached at `point` (both given in the `from`
/// system).
fn transform_vector(
    from: CoordSystem,
    to: CoordSystem,
    point: [f64; 3],
    vec: [f64; 3],
    method: VectorTransformMethod,
) -> [f64; 3] {
    match method {
        VectorTransformMethod::None => vec,
        VectorTransformMethod::AsPoint => from.convert(to, vec),
        VectorTransformMethod::AsDisplacement => {
            let tip = from.convert(
                to,
                [point[0] + vec[0], point[1] + vec[1], point[2] + vec[2]],
            );
            let base = from.convert(to, point);
            [tip[0] - base[0], tip[1] - base[1], tip[2] - base[2]]
        }
        VectorTransformMethod::AsDirection => {
            let e = DIRECTION_EPSILON;
            let tip = from.convert(
                to,
                [
                    point[0] + e * vec[0],
                    point[1] + e * vec[1],
                    point[2] + e * vec[2],
                ],
            );
            let base = from.convert(to, point);
            [
                (tip[0] - base[0]) / e,
                (tip[1] - base[1]) / e,
                (tip[2] - base[2]) / e,
            ]
        }
    }
}

/// Converts each domain from one coordinate system to another.
///
/// The output is always unstructured: implicit rectilinear topology does
/// not survive a curvilinear change of coordinates.
#[derive(Debug)]
pub struct CoordinateConversionFilter {
    input: CoordSystem,
    output: CoordSystem,
    vector_method: VectorTransformMethod,
}

impl CoordinateConversionFilter {
    pub fn new(input: CoordSystem, output: CoordSystem) -> Self {
        Self {
            input,
            output,
            vector_method: VectorTransformMethod::default(),
        }
    }

    pub fn with_vector_method(mut self, method: VectorTransformMethod) -> Self {
        self.vector_method = method;
        self
    }
}

impl Filter for CoordinateConversionFilter {
    fn name(&self) -> &'static str {
        "coordinate_conversion"
    }

    fn execute_data(
        &mut self,
        grid: &Grid,
        _domain: usize,
        _label: &str,
    ) -> Result<Option<Grid>, PipelineError> {
        if self.input == self.output {
            return Ok(Some(grid.clone()));
        }
        let mut g = grid.to_unstructured();

        // Transform positions are needed for the vector rules, so capture
        // them in the input system before rewriting coordinates.
        let old_points = g.points.clone();
        let old_centroids: Vec<[f64; 3]> =
            g.cells.iter().map(|c| g.cell_centroid(c)).collect();

        for p in &mut g.points {
            *p = self.input.convert(self.output, *p);
        }

        for arr in g.point_data.iter_mut() {
            if arr.components() != 3 || is_bookkeeping_array(arr.name()) {
                continue;
            }
            for (i, &pos) in old_points.iter().enumerate() {
                let t = arr.tuple_mut(i);
                let v = transform_vector(
                    self.input,
                    self.output,
                    pos,
                    [t[0], t[1], t[2]],
                    self.vector_method,
                );
                t.copy_from_slice(&v);
            }
        }
        for arr in g.cell_data.iter_mut() {
            if arr.components() != 3 || is_bookkeeping_array(arr.name()) {
                continue;
            }
            for (i, &pos) in old_centroids.iter().enumerate() {
                let t = arr.tuple_mut(i);
                let v = transform_vector(
                    self.input,
                    self.output,
                    pos,
                    [t[0], t[1], t[2]],
                    self.vector_method,
                );
                t.copy_from_slice(&v);
            }
        }

        if let Some(az) = self.output.azimuth_component() {
            repair_wraparound(&mut g, az);
        }
        Ok(Some(Grid::Unstructured(g)))
    }

    fn update_data_object_info(&self, info: &mut DataObjectInfo) {
        if self.input != self.output {
            info.invalidate_points();
            // Seam repair may split cells.
            if self.output.azimuth_component().is_some() {
                info.invalidate_zones();
            }
        }
    }
}

const SEAM_HIGH: f64 = 0.95 * TAU;
const SEAM_LOW: f64 = 0.1 * TAU;

/// Returns true iff the cell has an azimuth above [`SEAM_HIGH`] and one
/// below [`SEAM_LOW`], i.e. it straddles the 0/2π seam.
fn straddles_seam(g: &UnstructuredGrid, cell: usize, az: usize) -> bool {
    let mut high = false;
    let mut low = false;
    for &p in &g.cells[cell].connectivity {
        let a = g.points[p][az];
        high |= a > SEAM_HIGH;
        low |= a < SEAM_LOW;
    }
    high && low
}

/// Repair cells straddling the azimuthal seam after a conversion into an
/// angular system.
///
/// Every point `i` gains a shifted twin `i + n`: azimuths above π shift
/// down by 2π, the rest shift up, so a straddling cell can be rebuilt
/// once entirely near azimuth 0 (high vertices use their down-shifted
/// twins) and once entirely near 2π (low vertices use their up-shifted
/// twins). Non-straddling cells keep the unmodified copies. Point count
/// doubles; that is the accepted price for seam-correct topology.
fn repair_wraparound(g: &mut UnstructuredGrid, az: usize) {
    let straddlers: Vec<usize> = (0..g.cells.len())
        .filter(|&c| straddles_seam(g, c, az))
        .collect();
    if straddlers.is_empty() {
        return;
    }
    log::debug!(
        "wraparound repair: splitting {} seam-straddling cell(s)",
        straddlers.len()
    );

    let n = g.points.len();
    for i in 0..n {
        let mut twin = g.points[i];
        if twin[az] > PI {
            twin[az] -= TAU;
        } else {
            twin[az] += TAU;
        }
        g.points.push(twin);
    }
    let src = g.point_data.clone();
    for (out, from) in g.point_data.zip_like(&src) {
        for i in 0..n {
            out.push_tuple_from(from, i);
        }
    }

    let old_cells = std::mem::take(&mut g.cells);
    let old_cell_data = std::mem::take(&mut g.cell_data);
    let mut cell_data = old_cell_data.empty_like(old_cells.len() + straddlers.len());
    let mut next_straddler = straddlers.iter().peekable();
    for (ci, cell) in old_cells.into_iter().enumerate() {
        if next_straddler.peek() == Some(&&ci) {
            next_straddler.next();
            // Copy near 0: high vertices via their down-shifted twins.
            let mut near_zero = cell.clone();
            for v in &mut near_zero.connectivity {
                if g.points[*v][az] > PI {
                    *v += n;
                }
            }
            // Copy near 2π: low vertices via their up-shifted twins.
            let mut near_tau = cell;
            for v in &mut near_tau.connectivity {
                if g.points[*v][az] <= PI {
                    *v += n;
                }
            }
            g.cells.push(near_zero);
            g.cells.push(near_tau);
            for (out, from) in cell_data.zip_like(&old_cell_data) {
                out.push_tuple_from(from, ci);
                out.push_tuple_from(from, ci);
            }
        } else {
            g.cells.push(cell);
            for (out, from) in cell_data.zip_like(&old_cell_data) {
                out.push_tuple_from(from, ci);
            }
        }
    }
    g.cell_data = cell_data;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::array::DataArray;
    use crate::dataset::cell::{Cell, CellShape};
    use std::f64::consts::FRAC_PI_4;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn unit_diagonal_to_cylindrical() {
        let c = cartesian_to_cylindrical([1.0, 1.0, 0.0]);
        assert!(close(c, [2f64.sqrt(), FRAC_PI_4, 0.0]));
    }

    #[test]
    fn cylindrical_to_cartesian_half_turn() {
        let p = CoordSystem::Cylindrical.convert(CoordSystem::Cartesian, [2.0, PI, 5.0]);
        assert!((p[0] + 2.0).abs() < 1e-12);
        assert!(p[1].abs() < 1e-12);
        assert!((p[2] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn azimuth_normalized_into_zero_tau() {
        let c = cartesian_to_cylindrical([1.0, -1.0, 0.0]);
        assert!((c[1] - 7.0 * FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn full_ring_is_identity() {
        for p in [[1.0, 2.0, 3.0], [-0.5, 0.25, -4.0], [3.0, 0.0, 0.0]] {
            let q = CoordSystem::Cartesian.convert(CoordSystem::Cartesian, p);
            assert!(close(p, q));
            let via = CoordSystem::Spherical.convert(
                CoordSystem::Cartesian,
                CoordSystem::Cartesian.convert(CoordSystem::Spherical, p),
            );
            assert!(via.iter().zip(p).all(|(x, y)| (x - y).abs() < 1e-9));
        }
    }

    #[test]
    fn displacement_is_exact_direction_is_close() {
        let from = CoordSystem::Cartesian;
        let to = CoordSystem::Cylindrical;
        let point = [2.0, 0.0, 0.0];
        let vec = [0.0, 1.0, 0.0];
        let exact_tip = from.convert(to, [2.0, 1.0, 0.0]);
        let base = from.convert(to, point);
        let d = transform_vector(from, to, point, vec, VectorTransformMethod::AsDisplacement);
        assert!(close(
            d,
            [
                exact_tip[0] - base[0],
                exact_tip[1] - base[1],
                exact_tip[2] - base[2]
            ]
        ));
        // The directional derivative at (2,0,0) of azimuth along +y is
        // 1/r = 0.5, and radius is stationary.
        let j = transform_vector(from, to, point, vec, VectorTransformMethod::AsDirection);
        assert!(j[0].abs() < 1e-4);
        assert!((j[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn none_method_passes_vectors_through_untouched() {
        let from = CoordSystem::Cartesian;
        let to = CoordSystem::Spherical;
        let vec = [0.3, -1.7, 4.2];
        for point in [[2.0, 0.0, 0.0], [0.1, -0.2, 0.3], [0.0, 0.0, 0.0]] {
            let out = transform_vector(from, to, point, vec, VectorTransformMethod::None);
            assert_eq!(out, vec);
        }
    }

    /// Quad wrapped around the +x axis so its vertices land on both
    /// sides of azimuth 0.
    fn seam_quad() -> Grid {
        let a = 0.05f64;
        let points = vec![
            [a.cos(), -a.sin(), 0.0],
            [a.cos(), a.sin(), 0.0],
            [a.cos(), a.sin(), 1.0],
            [a.cos(), -a.sin(), 1.0],
        ];
        let mut g = UnstructuredGrid::new(points, vec![Cell::new(
            CellShape::Quad,
            vec![0, 1, 2, 3],
        )]);
        g.cell_data.set(DataArray::scalar("pressure", vec![42.0]));
        Grid::Unstructured(g)
    }

    #[test]
    fn seam_straddling_quad_is_split() {
        let mut f =
            CoordinateConversionFilter::new(CoordSystem::Cartesian, CoordSystem::Cylindrical);
        let out = f.execute_data(&seam_quad(), 0, "d0").unwrap().unwrap();
        let Grid::Unstructured(u) = out else {
            panic!("expected unstructured output")
        };
        assert_eq!(u.points.len(), 8);
        assert_eq!(u.cells.len(), 2);
        for cell in &u.cells {
            let az: Vec<f64> = cell.connectivity.iter().map(|&p| u.points[p][1]).collect();
            let span = az.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                - az.iter().cloned().fold(f64::INFINITY, f64::min);
            assert!(span <= PI, "cell spans {span} radians azimuthally");
        }
        // Cell data follows both halves.
        let p = u.cell_data.get("pressure").unwrap();
        assert_eq!(p.values(), &[42.0, 42.0]);
    }

    #[test]
    fn non_straddling_cells_pass_untouched() {
        let points = vec![
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 0.0],
            [2.0, 2.0, 0.0],
            [1.0, 2.0, 0.0],
        ];
        let g = Grid::Unstructured(UnstructuredGrid::new(
            points,
            vec![Cell::new(CellShape::Quad, vec![0, 1, 2, 3])],
        ));
        let mut f =
            CoordinateConversionFilter::new(CoordSystem::Cartesian, CoordSystem::Cylindrical);
        let out = f.execute_data(&g, 0, "d0").unwrap().unwrap();
        assert_eq!(out.num_points(), 4);
        assert_eq!(out.num_cells(), 1);
    }

    #[test]
    fn bookkeeping_arrays_skip_vector_transform() {
        let mut g = seam_quad().to_unstructured();
        g.point_data.set(
            DataArray::new(
                crate::dataset::array::ORIGINAL_NODE_NUMBERS,
                3,
                (0..12).map(f64::from).collect(),
            )
            .unwrap(),
        );
        let before = g.point_data.get(crate::dataset::array::ORIGINAL_NODE_NUMBERS)
            .unwrap()
            .clone();
        let mut f =
            CoordinateConversionFilter::new(CoordSystem::Cartesian, CoordSystem::Cylindrical)
                .with_vector_method(VectorTransformMethod::AsPoint);
        let out = f
            .execute_data(&Grid::Unstructured(g), 0, "d0")
            .unwrap()
            .unwrap();
        let after = out
            .point_data()
            .get(crate::dataset::array::ORIGINAL_NODE_NUMBERS)
            .unwrap();
        // Seam repair duplicates the tuples but the values themselves are
        // never run through the transform.
        assert_eq!(&after.values()[..12], before.values());
    }
}
