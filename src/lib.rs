#![cfg_attr(docsrs, feature(doc_cfg))]
//! # viz-pipeline
//!
//! viz-pipeline is a lazily-evaluated, contract-driven pipeline core for
//! domain-parallel dataset processing in scientific visualization. A
//! consumer's request for derived data (a variable, a timestep, a
//! spatial/material restriction, structural requirements such as ghost
//! zones or zone numberings) propagates *down* a chain of filters to a
//! data source as a negotiated contract; per-domain datasets then flow
//! back *up*, are transformed filter by filter, and merge into a dataset
//! tree, while spatial extents, ghost policy, and load-balance mode stay
//! consistent across a distributed-memory execution.
//!
//! ## Features
//! - Contract model: data requests with cohesive ghost/numbering/material
//!   policies, SIL restrictions, and admissible-data-type narrowing
//! - Pluggable communicator backends (serial, threaded local groups) and
//!   a collective layer (reductions, broadcasts, rank-0 gathers) that is
//!   the identity at size 1
//! - Dataset model: rectilinear and unstructured grids, named attribute
//!   arrays, dataset trees whose leaves may legitimately hold no data
//! - Geometric transform filters: coordinate-system conversion with
//!   seam repair, unit-cell replication, surface elevation
//! - Volume decomposition accumulator emitting tets/pyramids/wedges/
//!   hexes/quads/tris with shared edge- and centroid-point reuse
//! - Material/domain partition tables for readers that feed the pipeline
//!
//! ## Determinism
//!
//! Collectives resolve ties by rank (lowest wins) and partitioners break
//! equal-load ties by bucket index, so repeated runs over the same inputs
//! produce identical results at any process count.

pub mod comm;
pub mod contract;
pub mod dataset;
pub mod decompose;
pub mod filter;
pub mod partition;
pub mod pipeline_error;

pub use pipeline_error::PipelineError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::comm::{Collective, Communicator, Extreme, LocalComm, NoComm, Wait};
    pub use crate::contract::{Contract, DataRequest, LoadBalanceMode, SilSpec};
    pub use crate::dataset::array::{AttributeSet, DataArray};
    pub use crate::dataset::extents::Extents;
    pub use crate::dataset::grid::{Grid, RectilinearGrid, UnstructuredGrid};
    pub use crate::dataset::tree::DataTree;
    pub use crate::decompose::{PointRef, VolumeFromVolume};
    pub use crate::filter::{
        CoordSystem, CoordinateConversionFilter, DataSource, ElevateFilter, Filter, Pipeline,
        ReplicateFilter, Scaling, SourceMetadata, VectorTransformMethod,
    };
    pub use crate::partition::{partition_weights, MaterialPartition};
    pub use crate::pipeline_error::PipelineError;
}
