//! Volume decomposition: shape accumulation for filters that reshape
//! topology.

pub mod volume_from_volume;

pub use volume_from_volume::{CoordSource, PointRef, VolumeFromVolume};
