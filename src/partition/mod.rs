//! Producer-side partitioning support for block-structured readers.

pub mod material;
pub mod weights;

pub use material::{MaterialPartition, read_material_info, read_material_info_replicated};
pub use weights::partition_weights;
