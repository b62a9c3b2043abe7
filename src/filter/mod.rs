//! Filter base: the abstract unit of pipeline work.
//!
//! A filter receives an input dataset per domain plus a contract and
//! produces an output per domain, with lifecycle hooks to modify the
//! contract on the way down and refashion output metadata on the way up.
//! The states run in strict order per pipeline pass:
//!
//! 1. `verify_input` — assert required input shape; failure is fatal.
//! 2. `modify_contract` — downward pass, root→source; copy-on-forward.
//! 3. `perform_restriction` — SIL/domain refinement; may try extents and
//!    must disable load balancing when they are unavailable.
//! 4. `pre_execute` — one-time per-pass setup after the contract is
//!    final; resets per-pass accumulators.
//! 5. `execute_data` / `execute_data_tree` — per domain, any order,
//!    independent; `None` output means "this domain legitimately
//!    produces nothing", not an error.
//! 6. `post_execute` — roll this rank's per-domain results into output
//!    metadata.
//! 7. `update_data_object_info` — declare changed invariants downstream.
//! 8. `release_data` — drop problem-size resources kept across passes.

pub mod coord_convert;
pub mod elevate;
pub mod info;
pub mod pipeline;
pub mod replicate;

pub use coord_convert::{CoordSystem, CoordinateConversionFilter, VectorTransformMethod};
pub use elevate::{ElevateFilter, Scaling};
pub use info::{Centering, DataObjectInfo};
pub use pipeline::{DataSource, Pipeline, SourceMetadata, VariableMetadata};
pub use replicate::ReplicateFilter;

use crate::contract::Contract;
use crate::dataset::grid::Grid;
use crate::dataset::tree::DataTree;
use crate::pipeline_error::PipelineError;

/// One pipeline stage. Implementations override the hooks they need;
/// defaults are pass-through.
pub trait Filter {
    /// Stage name for diagnostics.
    fn name(&self) -> &'static str;

    /// Assert required input shape. Failing is fatal for the pass.
    fn verify_input(&self, _info: &DataObjectInfo) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Downward contract pass: consume the incoming contract, return the
    /// revision this stage needs (add secondary variables, force ghost
    /// data or numbering, disable load balancing).
    fn modify_contract(&mut self, contract: Contract) -> Contract {
        contract
    }

    /// Refine the SIL/domain restriction. May consult the source for
    /// extents; if extents are unavailable now, the filter must call
    /// `contract.no_dynamic_load_balancing()` rather than guess.
    fn perform_restriction(&mut self, _contract: &mut Contract, _source: &dyn DataSource) {}

    /// One-time per-pass setup after the contract is finalized, before
    /// any `execute_data` call. Resets per-pass accumulators.
    fn pre_execute(&mut self, _contract: &Contract) {}

    /// Pure per-domain transform. Returning `Ok(None)` means this domain
    /// produces nothing downstream. Must not depend on cross-domain
    /// execution order.
    fn execute_data(
        &mut self,
        grid: &Grid,
        domain: usize,
        label: &str,
    ) -> Result<Option<Grid>, PipelineError>;

    /// Fan-out variant: one input domain may produce multiple output
    /// sub-trees. Default wraps `execute_data` in a single leaf.
    fn execute_data_tree(
        &mut self,
        grid: &Grid,
        domain: usize,
        label: &str,
    ) -> Result<DataTree, PipelineError> {
        Ok(DataTree::leaf(
            self.execute_data(grid, domain, label)?,
            domain,
            label,
        ))
    }

    /// Roll this rank's per-domain results into output metadata (extents
    /// union, running trackers).
    fn post_execute(&mut self, _info: &mut DataObjectInfo) {}

    /// Declare which invariants this stage changed for downstream
    /// consumers.
    fn update_data_object_info(&self, _info: &mut DataObjectInfo) {}

    /// Release problem-size resources retained across passes. Lightweight
    /// control state survives for re-execution.
    fn release_data(&mut self) {}
}
