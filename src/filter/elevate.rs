//! Surface elevation filter.
//!
//! Lifts a 2D dataset into 3D by setting each point's z coordinate to a
//! (optionally log- or skew-scaled) scalar variable value. Zone-centered
//! variables are first recentered to the nodes by averaging over incident
//! cells. The filter tracks the running min/max of the *output* z values
//! across every domain processed on this rank and folds them into the
//! published extents at the end of the pass.

use crate::contract::Contract;
use crate::dataset::extents::Extents;
use crate::dataset::grid::Grid;
use crate::filter::info::DataObjectInfo;
use crate::filter::pipeline::DataSource;
use crate::filter::Filter;
use crate::pipeline_error::PipelineError;

/// How variable values map to z heights.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Scaling {
    #[default]
    Linear,
    /// `log10` of the value. Non-positive values are clamped to
    /// `10^min` first; this substitution is the documented policy for
    /// invalid-for-log data, not an error.
    Log,
    /// Exponential remap `k·(skew^v − 1) + min` with
    /// `k = (max − min)/(skew − 1)`. A factor ≤ 0 or == 1 degenerates to
    /// the identity.
    Skew(f64),
}

/// Maps a 2D field to a 3D surface, z = scaled variable value.
#[derive(Debug)]
pub struct ElevateFilter {
    /// Variable to elevate by; `None` uses the contract's primary
    /// variable.
    variable: Option<String>,
    scaling: Scaling,
    /// Value range the log clamp and skew remap are parameterized by.
    min: f64,
    max: f64,
    /// Resolved in `pre_execute` from the finalized contract.
    active_variable: String,
    /// Union of output extents over this rank's domains this pass.
    run_extents: Extents,
}

impl ElevateFilter {
    pub fn new(scaling: Scaling, min: f64, max: f64) -> Self {
        Self {
            variable: None,
            scaling,
            min,
            max,
            active_variable: String::new(),
            run_extents: Extents::new(),
        }
    }

    /// Elevate by `name` instead of the contract's primary variable.
    pub fn by_variable(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }

    /// Running `[zmin, zmax]` of the scaled heights seen this pass, if
    /// any domain produced output.
    pub fn z_range(&self) -> Option<[f64; 2]> {
        self.run_extents.get().map(|b| [b[4], b[5]])
    }

    fn scale(&self, v: f64) -> f64 {
        match self.scaling {
            Scaling::Linear => v,
            Scaling::Log => {
                let v = if v <= 0.0 { 10f64.powf(self.min) } else { v };
                v.log10()
            }
            Scaling::Skew(s) => {
                if s <= 0.0 || s == 1.0 {
                    return v;
                }
                let k = (self.max - self.min) / (s - 1.0);
                k * (s.powf(v) - 1.0) + self.min
            }
        }
    }
}

impl Filter for ElevateFilter {
    fn name(&self) -> &'static str {
        "elevate"
    }

    fn verify_input(&self, info: &DataObjectInfo) -> Result<(), PipelineError> {
        if info.spatial_dimension != 2 {
            return Err(PipelineError::InvalidDimension {
                filter: "elevate",
                expected: 2,
                actual: info.spatial_dimension,
            });
        }
        Ok(())
    }

    fn modify_contract(&mut self, mut contract: Contract) -> Contract {
        if let Some(var) = &self.variable {
            let var = var.clone();
            contract.request_mut().add_secondary_variable(var);
        }
        contract
    }

    /// The scaling range is authoritative pre-pass knowledge: take it
    /// from the source's data extents when they are cheaply known. When
    /// they are not, the constructor range stands and dynamic load
    /// balancing must be disabled rather than guessed around.
    fn perform_restriction(&mut self, contract: &mut Contract, source: &dyn DataSource) {
        let name = match &self.variable {
            Some(v) => v.clone(),
            None => contract.request().variable().to_string(),
        };
        match source.try_data_extents(&name) {
            Some([lo, hi]) => {
                self.min = lo;
                self.max = hi;
            }
            None => contract.no_dynamic_load_balancing(),
        }
    }

    fn pre_execute(&mut self, contract: &Contract) {
        self.active_variable = match &self.variable {
            Some(v) => v.clone(),
            None => contract.request().variable().to_string(),
        };
        self.run_extents.clear();
    }

    fn execute_data(
        &mut self,
        grid: &Grid,
        domain: usize,
        _label: &str,
    ) -> Result<Option<Grid>, PipelineError> {
        let name = self.active_variable.as_str();
        // Node-centered values, recentering zone data if that is where
        // the variable lives.
        let heights = match grid.point_data().get(name) {
            Some(arr) => arr.clone(),
            None => grid.cell_to_point_average(name).map_err(|e| {
                PipelineError::ElevationVariableUnavailable(Box::new(e))
            })?,
        };
        if heights.components() != 1 {
            return Err(PipelineError::ComponentMismatch {
                name: name.to_string(),
                expected: 1,
                actual: heights.components(),
            });
        }

        let mut out = grid.to_unstructured();
        let clamped = matches!(self.scaling, Scaling::Log)
            && heights.values().iter().any(|&v| v <= 0.0);
        if clamped {
            log::debug!(
                "elevate: domain {domain}: non-positive values clamped to 10^{} before log",
                self.min
            );
        }
        for (p, &v) in out.points.iter_mut().zip(heights.values()) {
            p[2] = self.scale(v);
        }
        out.point_data.set(heights);

        let out = Grid::Unstructured(out);
        if let Some(b) = out.bounds() {
            self.run_extents.merge(b);
        }
        Ok(Some(out))
    }

    fn post_execute(&mut self, info: &mut DataObjectInfo) {
        if let Some(b) = self.run_extents.get() {
            info.extents.merge(b);
        }
    }

    fn update_data_object_info(&self, info: &mut DataObjectInfo) {
        info.spatial_dimension = 3;
        info.invalidate_points();
    }

    fn release_data(&mut self) {
        self.run_extents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DataRequest, SilSpec};
    use crate::dataset::array::DataArray;
    use crate::dataset::grid::RectilinearGrid;

    fn flat_grid(values: Vec<f64>) -> Grid {
        let mut g = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0]);
        g.point_data.set(DataArray::scalar("height", values));
        Grid::Rectilinear(g)
    }

    fn height_contract() -> Contract {
        let req = DataRequest::new("height", 0, SilSpec::all_data()).unwrap();
        Contract::new(req)
    }

    #[test]
    fn linear_elevation_sets_z() {
        let mut f = ElevateFilter::new(Scaling::Linear, 0.0, 3.0);
        f.pre_execute(&height_contract());
        let out = f
            .execute_data(&flat_grid(vec![0.0, 1.0, 2.0, 3.0]), 0, "d0")
            .unwrap()
            .unwrap();
        let zs: Vec<f64> = (0..4).map(|i| out.point(i)[2]).collect();
        assert_eq!(zs, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(f.z_range(), Some([0.0, 3.0]));
    }

    #[test]
    fn log_of_zero_substitutes_ten_to_the_min() {
        // min = 0, so a 0 input becomes 10^0 = 1 and logs to 0, never -inf.
        let mut f = ElevateFilter::new(Scaling::Log, 0.0, 10.0);
        f.pre_execute(&height_contract());
        let out = f
            .execute_data(&flat_grid(vec![0.0, 1.0, 10.0, 100.0]), 0, "d0")
            .unwrap()
            .unwrap();
        let zs: Vec<f64> = (0..4).map(|i| out.point(i)[2]).collect();
        assert_eq!(zs, vec![0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn degenerate_skew_is_identity() {
        for s in [Scaling::Skew(1.0), Scaling::Skew(0.0), Scaling::Skew(-2.0)] {
            let mut f = ElevateFilter::new(s, 0.0, 5.0);
            f.pre_execute(&height_contract());
            let out = f
                .execute_data(&flat_grid(vec![0.25, 0.5, 0.75, 1.0]), 0, "d0")
                .unwrap()
                .unwrap();
            assert_eq!(out.point(3)[2], 1.0);
        }
    }

    #[test]
    fn skew_remaps_endpoints() {
        // k = (max-min)/(s-1); at v = 0 the remap gives min exactly.
        let mut f = ElevateFilter::new(Scaling::Skew(10.0), 2.0, 4.0);
        f.pre_execute(&height_contract());
        let out = f
            .execute_data(&flat_grid(vec![0.0, 0.0, 0.0, 1.0]), 0, "d0")
            .unwrap()
            .unwrap();
        assert!((out.point(0)[2] - 2.0).abs() < 1e-12);
        // v = 1: k·(10 − 1) + min = (max − min)·9/9 + min = max.
        assert!((out.point(3)[2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn zone_centered_input_is_recentered() {
        let mut g = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0]);
        g.cell_data.set(DataArray::scalar("height", vec![7.0]));
        let mut f = ElevateFilter::new(Scaling::Linear, 0.0, 10.0);
        f.pre_execute(&height_contract());
        let out = f
            .execute_data(&Grid::Rectilinear(g), 0, "d0")
            .unwrap()
            .unwrap();
        assert!((0..4).all(|i| out.point(i)[2] == 7.0));
        assert_eq!(out.point_data().get("height").unwrap().num_tuples(), 4);
    }

    #[test]
    fn missing_variable_is_wrapped() {
        let mut f = ElevateFilter::new(Scaling::Linear, 0.0, 1.0).by_variable("absent");
        f.pre_execute(&height_contract());
        let err = f
            .execute_data(&flat_grid(vec![0.0; 4]), 0, "d0")
            .map(|_| ())
            .unwrap_err();
        match err {
            PipelineError::ElevationVariableUnavailable(inner) => {
                assert!(matches!(*inner, PipelineError::MissingVariable(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_non_2d_input() {
        let f = ElevateFilter::new(Scaling::Linear, 0.0, 1.0);
        let info = DataObjectInfo::new(3, 3, crate::filter::Centering::Node);
        assert!(matches!(
            f.verify_input(&info),
            Err(PipelineError::InvalidDimension { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn secondary_variable_added_for_explicit_elevation() {
        let mut f = ElevateFilter::new(Scaling::Linear, 0.0, 1.0).by_variable("temperature");
        let c = f.modify_contract(height_contract());
        assert!(c
            .request()
            .secondary_variables_without_duplicates()
            .contains(&"temperature"));
    }

    /// Source whose data extents may or may not be cheaply known.
    struct ExtentSource {
        md: crate::filter::SourceMetadata,
        extents: Option<[f64; 2]>,
    }

    impl ExtentSource {
        fn new(extents: Option<[f64; 2]>) -> Self {
            Self {
                md: crate::filter::SourceMetadata::default(),
                extents,
            }
        }
    }

    impl DataSource for ExtentSource {
        fn metadata(&self) -> &crate::filter::SourceMetadata {
            &self.md
        }
        fn mesh(&self, _: usize, _: &DataRequest) -> Result<Option<Grid>, PipelineError> {
            Ok(None)
        }
        fn try_data_extents(&self, _variable: &str) -> Option<[f64; 2]> {
            self.extents
        }
    }

    #[test]
    fn unknown_extents_disable_load_balancing() {
        let mut f = ElevateFilter::new(Scaling::Log, 0.0, 1.0);
        let mut c = height_contract();
        assert!(c.should_use_load_balancing());
        f.perform_restriction(&mut c, &ExtentSource::new(None));
        assert!(!c.should_use_load_balancing());
    }

    #[test]
    fn known_extents_become_the_scaling_range() {
        // With extents [2, 5] the log clamp lifts v = 0 to 10^2.
        let mut f = ElevateFilter::new(Scaling::Log, 0.0, 1.0);
        let mut c = height_contract();
        f.perform_restriction(&mut c, &ExtentSource::new(Some([2.0, 5.0])));
        assert!(c.should_use_load_balancing());
        f.pre_execute(&c);
        let out = f
            .execute_data(&flat_grid(vec![0.0, 10.0, 100.0, 1000.0]), 0, "d0")
            .unwrap()
            .unwrap();
        assert_eq!(out.point(0)[2], 2.0);
        assert_eq!(out.point(3)[2], 3.0);
    }
}
