//! PipelineError: unified error type for viz-pipeline public APIs.
//!
//! Every fallible public API in this crate reports through this enum.
//! Usage/contract errors (malformed reduction sizes, wrong input
//! dimensionality, empty variable names) are fatal to the current pipeline
//! pass. Data-availability gaps (a domain with no data, extents unknown
//! before execution) are *not* errors; they surface as `None`/`false`
//! returns at the call sites that can tolerate them.

use thiserror::Error;

/// Unified error type for viz-pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The collective layer was called with arguments that violate its
    /// protocol (e.g. an odd interleaved min/max buffer with `alt_size == 0`).
    #[error("improper use of the collective layer: {0}")]
    ImproperUse(String),

    /// A filter was handed input of the wrong spatial dimension.
    #[error("filter `{filter}` requires {expected}D input, got {actual}D")]
    InvalidDimension {
        filter: &'static str,
        expected: u8,
        actual: u8,
    },

    /// A requested variable is not present on the dataset or in the source
    /// metadata catalog.
    #[error("variable `{0}` not found")]
    MissingVariable(String),

    /// A data request was constructed with an empty variable name.
    #[error("data request variable name must be non-empty")]
    EmptyVariableName,

    /// A variable exists but its component count does not match what the
    /// consumer needs (e.g. a 1-component array used as a vector field).
    #[error("variable `{name}` has {actual} component(s), expected {expected}")]
    ComponentMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Point-to-point exchange with a peer failed or returned a malformed
    /// payload.
    #[error("communication with rank {neighbor} failed: {detail}")]
    CommError { neighbor: usize, detail: String },

    /// The weighted partitioner could not meet the balance tolerance.
    #[error("partition unbalanced: max={max_load}, min={min_load}, ratio {ratio:.3} > {tolerance:.3}")]
    Unbalanced {
        max_load: u64,
        min_load: u64,
        ratio: f64,
        tolerance: f64,
    },

    /// A geometric operation was handed degenerate or unsupported input.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A wire payload failed to decode (wrong length, bad UTF-8, version
    /// mismatch).
    #[error("malformed wire payload: {0}")]
    WireFormat(String),

    /// The elevation filter could not determine which variable to elevate
    /// by. Wraps the lower-level lookup failure with a user-facing
    /// diagnostic.
    #[error("could not determine which variable to elevate by")]
    ElevationVariableUnavailable(#[source] Box<PipelineError>),

    /// A shape accumulator referenced a point that does not exist yet
    /// (e.g. a centroid referencing a later centroid).
    #[error("decomposition referenced an unresolved point: {0}")]
    UnresolvedPoint(String),
}
