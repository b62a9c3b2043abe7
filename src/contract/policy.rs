//! Cohesive policy sub-structs composed into a [`DataRequest`].
//!
//! The historical design carried these as ~25 independent boolean/enum
//! flags with ad hoc equality semantics; here each concern (numbering,
//! ghost data, material interface reconstruction, discretization, missing
//! data) is a small struct with ordinary field-complete equality.
//!
//! [`DataRequest`]: crate::contract::request::DataRequest

use crate::pipeline_error::PipelineError;

/// What kind of ghost data a consumer needs at partition seams.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum GhostDataType {
    #[default]
    None,
    GhostZones,
    GhostNodes,
}

/// How downstream consumers must treat zones a reader could not supply.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MissingDataBehavior {
    /// Use the data as-is, no marker.
    #[default]
    Ignore,
    /// Physically delete missing zones before they reach plots.
    Remove,
    /// Keep the zones but attach a marker array so plots can query which
    /// cells are synthetic.
    Identify,
}

/// Zone/node numbering requirements.
///
/// The `may_require_*` flags let a filter defer the decision to the
/// database, which turns them into hard requirements only if it can
/// answer cheaply.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NumberingPolicy {
    pub need_zones: bool,
    pub need_nodes: bool,
    pub need_global_zones: bool,
    pub need_global_nodes: bool,
    pub may_require_zones: bool,
    pub may_require_nodes: bool,
    pub need_structured_indices: bool,
    /// `Some(level)` requests AMR indices down to the given level.
    pub need_amr_indices: Option<i32>,
}

/// Ghost-data requirements.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GhostPolicy {
    pub desired_ghost_type: GhostDataType,
    pub must_maintain_original_connectivity: bool,
}

/// Material-interface-reconstruction requirements and tuning.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MirPolicy {
    pub must_do_mir: bool,
    pub force_material_labels: bool,
    pub need_internal_surfaces: bool,
    pub boundary_surface_representation: bool,
    pub need_smooth_material_interfaces: bool,
    pub need_clean_zones_only: bool,
    pub simplify_heavily_mixed_zones: bool,
    /// Algorithm id, interpreted by the reader.
    pub algorithm: i32,
    pub iteration_count: i32,
    pub damping: f64,
    pub isovolume_fraction: f64,
    pub annealing_time: i32,
    pub max_materials_per_zone: i32,
}

impl Default for MirPolicy {
    fn default() -> Self {
        Self {
            must_do_mir: false,
            force_material_labels: false,
            need_internal_surfaces: false,
            boundary_surface_representation: false,
            need_smooth_material_interfaces: false,
            need_clean_zones_only: false,
            simplify_heavily_mixed_zones: false,
            algorithm: 0,
            iteration_count: 0,
            damping: 1.0,
            isovolume_fraction: 0.5,
            annealing_time: 0,
            max_materials_per_zone: 1,
        }
    }
}

/// Mesh-discretization sub-contract for CSG-backed sources. Pass-through
/// fields; the reader interprets them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DiscretizationPolicy {
    pub mode: i32,
    pub tolerance: f64,
    pub flat_tolerance: f64,
    pub boundary_only: bool,
    pub pass_native_csg: bool,
}

impl Default for DiscretizationPolicy {
    fn default() -> Self {
        Self {
            mode: 0,
            tolerance: 0.01,
            flat_tolerance: 0.025,
            boundary_only: false,
            pass_native_csg: false,
        }
    }
}

/// Output dataset representations a consumer can accept.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    Rectilinear,
    Structured,
    Unstructured,
    PolyData,
    Amr,
}

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::Rectilinear,
        DataType::Structured,
        DataType::Unstructured,
        DataType::PolyData,
        DataType::Amr,
    ];

    const fn bit(self) -> u32 {
        match self {
            DataType::Rectilinear => 1 << 0,
            DataType::Structured => 1 << 1,
            DataType::Unstructured => 1 << 2,
            DataType::PolyData => 1 << 3,
            DataType::Amr => 1 << 4,
        }
    }
}

/// Bitset of admissible output data types.
///
/// Starts with all types admissible; `restrict_to` *intersects* with the
/// caller's set (never widens), so each filter can only narrow what its
/// upstream producers may emit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AdmissibleDataTypes(u32);

impl Default for AdmissibleDataTypes {
    fn default() -> Self {
        Self::all()
    }
}

impl AdmissibleDataTypes {
    /// All known types admissible.
    pub fn all() -> Self {
        let mut bits = 0;
        for t in DataType::ALL {
            bits |= t.bit();
        }
        Self(bits)
    }

    /// Intersect the running set with `types`.
    ///
    /// # Errors
    /// `ImproperUse` if the intersection would be empty — a request that
    /// admits no output representation can never be satisfied.
    pub fn restrict_to(
        &mut self,
        types: impl IntoIterator<Item = DataType>,
    ) -> Result<(), PipelineError> {
        let mut mask = 0;
        for t in types {
            mask |= t.bit();
        }
        let next = self.0 & mask;
        if next == 0 {
            return Err(PipelineError::ImproperUse(
                "admissible data type restriction leaves no admissible types".into(),
            ));
        }
        self.0 = next;
        Ok(())
    }

    pub fn is_admissible(&self, t: DataType) -> bool {
        self.0 & t.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}
