//! Pipeline driver: downward contract negotiation, upward per-domain
//! execution.
//!
//! The driver owns a data source (the database/reader contract) and an
//! ordered filter chain, source-side first. `update` reconciles the
//! contract top-to-bottom (last filter first, mirroring the consumer's
//! pull), then executes bottom-to-top per domain and assembles a
//! [`DataTree`] with one subtree per domain. Absent domains are valid
//! empty leaves throughout.

use crate::contract::{Contract, DataRequest};
use crate::dataset::grid::Grid;
use crate::dataset::tree::DataTree;
use crate::filter::info::{Centering, DataObjectInfo};
use crate::filter::Filter;
use crate::pipeline_error::PipelineError;

/// Metadata for one variable in the source catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableMetadata {
    pub name: String,
    pub centering: Centering,
    pub components: usize,
}

/// Catalog a source publishes before any request referencing its
/// variables is legal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMetadata {
    pub mesh_name: String,
    pub spatial_dimension: u8,
    pub topological_dimension: u8,
    pub num_domains: usize,
    pub variables: Vec<VariableMetadata>,
}

impl SourceMetadata {
    pub fn variable(&self, name: &str) -> Option<&VariableMetadata> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// The database/reader contract the pipeline consumes.
pub trait DataSource {
    /// Metadata catalog; must be complete before requests are issued.
    fn metadata(&self) -> &SourceMetadata;

    /// Domains this rank should process under the request's SIL
    /// restriction.
    fn domains(&self, request: &DataRequest) -> Vec<usize> {
        (0..self.metadata().num_domains)
            .filter(|&d| request.sil.uses_domain(d))
            .collect()
    }

    /// Produce the mesh (with requested variables attached) for one
    /// domain. `Ok(None)` means the domain holds no data — a valid
    /// result, not an error.
    fn mesh(&self, domain: usize, request: &DataRequest) -> Result<Option<Grid>, PipelineError>;

    /// Data (value) extents for a variable, if cheaply known before
    /// execution. `None` obliges callers to disable dynamic load
    /// balancing rather than guess.
    fn try_data_extents(&self, _variable: &str) -> Option<[f64; 2]> {
        None
    }

    /// Spatial extents, if cheaply known before execution.
    fn try_spatial_extents(&self) -> Option<[f64; 6]> {
        None
    }
}

/// An ordered filter chain over a data source.
pub struct Pipeline<S: DataSource> {
    source: S,
    filters: Vec<Box<dyn Filter>>,
    info: DataObjectInfo,
    pass: u64,
}

impl<S: DataSource> Pipeline<S> {
    pub fn new(source: S) -> Self {
        let md = source.metadata();
        let info = DataObjectInfo::new(
            md.spatial_dimension,
            md.topological_dimension,
            Centering::default(),
        );
        Self {
            source,
            filters: Vec::new(),
            info,
            pass: 0,
        }
    }

    /// Append a filter on the consumer side of the chain.
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn info(&self) -> &DataObjectInfo {
        &self.info
    }

    /// Run one full pass: contract negotiation root→source, then
    /// per-domain execution source→root.
    pub fn update(&mut self, mut contract: Contract) -> Result<DataTree, PipelineError> {
        self.pass += 1;
        contract.set_pass(self.pass);

        // Every pass starts from the source catalog, not from the
        // previous pass's published output: a stage that raised the
        // dimension last pass must not fail its own input check now,
        // and extents are recomputed rather than re-merged.
        let md = self.source.metadata();
        let source_info = DataObjectInfo::new(
            md.spatial_dimension,
            md.topological_dimension,
            Centering::default(),
        );

        // Input verification, source side first: each filter sees the
        // info its upstream produces.
        let mut probe = source_info.clone();
        for f in &self.filters {
            f.verify_input(&probe)?;
            f.update_data_object_info(&mut probe);
        }

        // Downward contract pass, root→source (consumer-most filter
        // first). Copy-on-forward: each stage consumes and returns.
        for f in self.filters.iter_mut().rev() {
            contract = f.modify_contract(contract);
            f.perform_restriction(&mut contract, &self.source);
        }

        for f in self.filters.iter_mut() {
            f.pre_execute(&contract);
        }

        // Upward execute pass, per domain in the order the source
        // presents them.
        let request = contract.request().clone();
        let mut domain_trees = Vec::new();
        for domain in self.source.domains(&request) {
            let label = format!("domain{domain}");
            let grid = self.source.mesh(domain, &request)?;
            let mut tree = DataTree::leaf(grid, domain, label);
            for f in self.filters.iter_mut() {
                tree = apply_to_tree(f.as_mut(), tree)?;
            }
            domain_trees.push(tree);
        }
        let output = DataTree::node(domain_trees);

        // Publish this pass's result into fresh output metadata.
        let mut info = source_info;
        for f in self.filters.iter_mut() {
            f.post_execute(&mut info);
            f.release_data();
        }
        for f in self.filters.iter() {
            f.update_data_object_info(&mut info);
        }
        self.info = info;
        Ok(output)
    }
}

/// Apply one filter across a dataset tree. Empty leaves short-circuit to
/// empty leaves; grid-bearing leaves may fan out into subtrees.
fn apply_to_tree(filter: &mut dyn Filter, tree: DataTree) -> Result<DataTree, PipelineError> {
    match tree {
        DataTree::Leaf {
            grid: None,
            domain,
            label,
        } => Ok(DataTree::leaf(None, domain, label)),
        DataTree::Leaf {
            grid: Some(grid),
            domain,
            label,
        } => filter.execute_data_tree(&grid, domain, &label),
        DataTree::Node { children } => {
            let out = children
                .into_iter()
                .map(|c| apply_to_tree(filter, c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DataTree::node(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::SilSpec;
    use crate::dataset::array::DataArray;
    use crate::dataset::grid::RectilinearGrid;

    /// Two-domain source; domain 1 never holds data.
    struct ToySource {
        md: SourceMetadata,
    }

    impl ToySource {
        fn new() -> Self {
            Self {
                md: SourceMetadata {
                    mesh_name: "mesh".into(),
                    spatial_dimension: 2,
                    topological_dimension: 2,
                    num_domains: 2,
                    variables: vec![VariableMetadata {
                        name: "t".into(),
                        centering: Centering::Node,
                        components: 1,
                    }],
                },
            }
        }
    }

    impl DataSource for ToySource {
        fn metadata(&self) -> &SourceMetadata {
            &self.md
        }

        fn mesh(&self, domain: usize, request: &DataRequest) -> Result<Option<Grid>, PipelineError> {
            if domain == 1 {
                return Ok(None);
            }
            let mut g =
                RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0]);
            if request.variable() == "t" {
                g.point_data
                    .set(DataArray::scalar("t", vec![0.0, 1.0, 2.0, 3.0]));
            }
            Ok(Some(Grid::Rectilinear(g)))
        }
    }

    /// Records lifecycle calls into a shared log; passes grids through
    /// unchanged.
    struct Probe {
        calls: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
    }

    impl Probe {
        fn new() -> (Self, std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>) {
            let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
            (
                Self {
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl Filter for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }
        fn modify_contract(&mut self, c: Contract) -> Contract {
            self.calls.borrow_mut().push("modify_contract");
            c
        }
        fn pre_execute(&mut self, _c: &Contract) {
            self.calls.borrow_mut().push("pre_execute");
        }
        fn execute_data(
            &mut self,
            grid: &Grid,
            _domain: usize,
            _label: &str,
        ) -> Result<Option<Grid>, PipelineError> {
            self.calls.borrow_mut().push("execute_data");
            Ok(Some(grid.clone()))
        }
        fn post_execute(&mut self, _info: &mut DataObjectInfo) {
            self.calls.borrow_mut().push("post_execute");
        }
        fn release_data(&mut self) {
            self.calls.borrow_mut().push("release_data");
        }
    }

    #[test]
    fn absent_domain_propagates_as_empty_leaf() {
        let mut p = Pipeline::new(ToySource::new());
        p.add_filter(Box::new(Probe::new().0));
        let req = DataRequest::new("t", 0, SilSpec::all_data()).unwrap();
        let tree = p.update(Contract::new(req)).unwrap();
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.leaves().len(), 1);
    }

    #[test]
    fn sil_restriction_limits_domains() {
        let mut p = Pipeline::new(ToySource::new());
        let req = DataRequest::new("t", 0, SilSpec::restricted_to_domains([1])).unwrap();
        let tree = p.update(Contract::new(req)).unwrap();
        assert_eq!(tree.num_leaves(), 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn lifecycle_order_per_pass() {
        let (probe, calls) = Probe::new();
        let mut p = Pipeline::new(ToySource::new());
        p.add_filter(Box::new(probe));
        let req = DataRequest::new("t", 0, SilSpec::all_data()).unwrap();
        p.update(Contract::new(req)).unwrap();
        // execute_data runs once: domain 1 is an empty leaf and is
        // short-circuited without reaching the filter.
        assert_eq!(
            &*calls.borrow(),
            &[
                "modify_contract",
                "pre_execute",
                "execute_data",
                "post_execute",
                "release_data"
            ]
        );
    }
}
