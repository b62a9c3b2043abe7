//! Metadata a filter publishes about its output.
//!
//! `DataObjectInfo` travels with the pipeline output: spatial/topological
//! dimension, variable centering, cumulative spatial extents, and the
//! invalidation flags filters raise when they change an invariant
//! downstream consumers may have cached ("points were transformed",
//! "zones were modified").

use crate::dataset::extents::Extents;

/// Where a variable's values live.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Centering {
    #[default]
    Node,
    Zone,
}

/// Output-level metadata declared by each pipeline stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataObjectInfo {
    pub spatial_dimension: u8,
    pub topological_dimension: u8,
    pub centering: Centering,
    /// Union of per-domain extents on *this rank only*; the global answer
    /// comes from a collective reduction when a consumer needs it.
    pub extents: Extents,
    /// Points were moved/transformed: cached transform matrices are
    /// invalid downstream.
    pub points_transformed: bool,
    /// Zones were deleted, split, or reordered: zone-validity metadata is
    /// invalid downstream.
    pub zones_modified: bool,
}

impl DataObjectInfo {
    pub fn new(spatial_dimension: u8, topological_dimension: u8, centering: Centering) -> Self {
        Self {
            spatial_dimension,
            topological_dimension,
            centering,
            ..Default::default()
        }
    }

    /// Raise the "points transformed" invalidation.
    pub fn invalidate_points(&mut self) {
        self.points_transformed = true;
    }

    /// Raise the "zones modified" invalidation.
    pub fn invalidate_zones(&mut self) {
        self.zones_modified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidations_are_sticky() {
        let mut info = DataObjectInfo::new(2, 2, Centering::Zone);
        assert!(!info.points_transformed);
        info.invalidate_points();
        info.invalidate_zones();
        assert!(info.points_transformed && info.zones_modified);
    }
}
