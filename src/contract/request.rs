//! DataRequest: what one pipeline pass must produce.
//!
//! A request names a primary variable, its dependency (secondary)
//! variables, a timestep, a SIL restriction, and the structural policies
//! the consumer needs honored (numbering, ghost data, MIR,
//! discretization, missing-data handling). Filters mutate their own copy
//! during the downward contract pass and never after execution begins.

use crate::contract::policy::{
    AdmissibleDataTypes, DataType, DiscretizationPolicy, GhostPolicy, MirPolicy,
    MissingDataBehavior, NumberingPolicy,
};
use crate::contract::selection::DataSelectionRef;
use crate::contract::sil::SilSpec;
use crate::pipeline_error::PipelineError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Specification of one desired data product.
#[derive(Clone, Debug)]
pub struct DataRequest {
    variable: String,
    /// Variable name before any expression expansion rewrote it.
    original_variable: String,
    /// Ordered dependency variables; duplicates allowed.
    secondary_variables: Vec<String>,
    pub timestep: i64,
    pub sil: SilSpec,
    pub numbering: NumberingPolicy,
    pub ghost: GhostPolicy,
    pub mir: MirPolicy,
    pub discretization: DiscretizationPolicy,
    pub missing_data: MissingDataBehavior,
    pub velocity_must_be_continuous: bool,
    pub needs_native_precision: bool,
    admissible: AdmissibleDataTypes,
    selections: Vec<DataSelectionRef>,
}

impl DataRequest {
    /// Construct a request for `variable` at `timestep` under `sil`.
    ///
    /// # Errors
    /// `EmptyVariableName` if `variable` is empty; a request without a
    /// variable can never be satisfied.
    pub fn new(
        variable: impl Into<String>,
        timestep: i64,
        sil: SilSpec,
    ) -> Result<Self, PipelineError> {
        let variable = variable.into();
        if variable.is_empty() {
            return Err(PipelineError::EmptyVariableName);
        }
        Ok(Self {
            original_variable: variable.clone(),
            variable,
            secondary_variables: Vec::new(),
            timestep,
            sil,
            numbering: NumberingPolicy::default(),
            ghost: GhostPolicy::default(),
            mir: MirPolicy::default(),
            discretization: DiscretizationPolicy::default(),
            missing_data: MissingDataBehavior::default(),
            velocity_must_be_continuous: false,
            needs_native_precision: false,
            admissible: AdmissibleDataTypes::all(),
            selections: Vec::new(),
        })
    }

    /// Copy-constructor variant that rebinds the SIL restriction.
    pub fn with_sil(&self, sil: SilSpec) -> Self {
        let mut copy = self.clone();
        copy.sil = sil;
        copy
    }

    /// Copy-constructor variant that adds a secondary variable.
    pub fn with_secondary_variable(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.add_secondary_variable(name);
        copy
    }

    #[inline]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    #[inline]
    pub fn original_variable(&self) -> &str {
        &self.original_variable
    }

    /// Change the primary variable. No-op if the name is unchanged. Any
    /// secondary occurrence of the new primary is dropped to preserve the
    /// "secondary list never contains the primary" invariant.
    pub fn set_variable(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name.is_empty() || name == self.variable {
            return;
        }
        self.secondary_variables.retain(|s| *s != name);
        self.variable = name;
    }

    pub fn set_original_variable(&mut self, name: impl Into<String>) {
        self.original_variable = name.into();
    }

    /// Append a dependency variable. Skipped if it is the primary or
    /// already present.
    pub fn add_secondary_variable(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name == self.variable || self.secondary_variables.contains(&name) {
            return;
        }
        self.secondary_variables.push(name);
    }

    pub fn remove_secondary_variable(&mut self, name: &str) {
        self.secondary_variables.retain(|s| s != name);
    }

    pub fn remove_all_secondary_variables(&mut self) {
        self.secondary_variables.clear();
    }

    pub fn secondary_variables(&self) -> &[String] {
        &self.secondary_variables
    }

    /// The secondary list with duplicates removed, preserving first-seen
    /// order.
    pub fn secondary_variables_without_duplicates(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.secondary_variables
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .map(|s| s.as_str())
            .collect()
    }

    /// Order-independent set equality over {primary} ∪ secondary.
    pub fn variables_are_the_same(&self, other: &DataRequest) -> bool {
        let mine: BTreeSet<&str> = std::iter::once(self.variable.as_str())
            .chain(self.secondary_variables.iter().map(|s| s.as_str()))
            .collect();
        let theirs: BTreeSet<&str> = std::iter::once(other.variable.as_str())
            .chain(other.secondary_variables.iter().map(|s| s.as_str()))
            .collect();
        mine == theirs
    }

    // ---- data selections ----------------------------------------------

    /// Append a selection; the returned handle retrieves exactly this
    /// selection later.
    pub fn add_data_selection(&mut self, selection: DataSelectionRef) -> usize {
        self.selections.push(selection);
        self.selections.len() - 1
    }

    pub fn data_selection(&self, id: usize) -> Option<&DataSelectionRef> {
        self.selections.get(id)
    }

    pub fn num_data_selections(&self) -> usize {
        self.selections.len()
    }

    /// Clear all selections. Used when re-issuing a "general" request
    /// that must not carry a previous filter's private selection state.
    pub fn remove_all_data_selections(&mut self) {
        self.selections.clear();
    }

    // ---- admissible data types ----------------------------------------

    /// Reset to "all known types admissible".
    pub fn init_admissible_data_types(&mut self) {
        self.admissible = AdmissibleDataTypes::all();
    }

    /// Intersect the admissible set with `types`.
    pub fn update_admissible_data_types(
        &mut self,
        types: impl IntoIterator<Item = DataType>,
    ) -> Result<(), PipelineError> {
        self.admissible.restrict_to(types)
    }

    pub fn is_admissible_data_type(&self, t: DataType) -> bool {
        self.admissible.is_admissible(t)
    }
}

/// Field-complete equality: every semantically meaningful field
/// participates, including all tolerance/MIR/discretization fields.
/// Opaque selections compare by identity (same shared objects in the same
/// order). Call sites that want "same variables, ignore tuning" use
/// [`DataRequest::variables_are_the_same`].
impl PartialEq for DataRequest {
    fn eq(&self, other: &Self) -> bool {
        self.variable == other.variable
            && self.original_variable == other.original_variable
            && self.secondary_variables == other.secondary_variables
            && self.timestep == other.timestep
            && self.sil == other.sil
            && self.numbering == other.numbering
            && self.ghost == other.ghost
            && self.mir == other.mir
            && self.discretization == other.discretization
            && self.missing_data == other.missing_data
            && self.velocity_must_be_continuous == other.velocity_must_be_continuous
            && self.needs_native_precision == other.needs_native_precision
            && self.admissible == other.admissible
            && self.selections.len() == other.selections.len()
            && self
                .selections
                .iter()
                .zip(&other.selections)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}
