//! Data request / contract model: what a pipeline pass must produce,
//! negotiated top-down before any bottom-up execution.

#[allow(clippy::module_inception)]
pub mod contract;
pub mod policy;
pub mod request;
pub mod selection;
pub mod sil;

pub use contract::{Contract, LoadBalanceMode};
pub use policy::{
    AdmissibleDataTypes, DataType, DiscretizationPolicy, GhostDataType, GhostPolicy, MirPolicy,
    MissingDataBehavior, NumberingPolicy,
};
pub use request::DataRequest;
pub use selection::{DataSelection, DataSelectionRef, SpatialBoxSelection, ZoneRangeSelection};
pub use sil::{SilRestriction, SilSpec};
