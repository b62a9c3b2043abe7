//! Opaque per-filter data selections carried on a request.
//!
//! A filter may append a selection describing a private restriction (a
//! spatial box, an index range) and later retrieve exactly that selection
//! via the integer handle returned at insertion time. The pipeline treats
//! selections as opaque; only the filter that added one interprets it.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// An opaque data selection. Implementors downcast via `as_any`.
pub trait DataSelection: Debug + Send + Sync {
    /// Stable selection-kind identifier (for logging/diagnostics).
    fn kind(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

/// Shared selection handle.
pub type DataSelectionRef = Arc<dyn DataSelection>;

/// Axis-aligned spatial box selection.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialBoxSelection {
    pub bounds: [f64; 6],
}

impl DataSelection for SpatialBoxSelection {
    fn kind(&self) -> &'static str {
        "spatial_box"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Contiguous index-range selection over a domain's zones.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneRangeSelection {
    pub first: usize,
    pub last: usize,
}

impl DataSelection for ZoneRangeSelection {
    fn kind(&self) -> &'static str {
        "zone_range"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_roundtrip() {
        let sel: DataSelectionRef = Arc::new(SpatialBoxSelection {
            bounds: [0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        });
        assert_eq!(sel.kind(), "spatial_box");
        let b = sel
            .as_any()
            .downcast_ref::<SpatialBoxSelection>()
            .expect("downcast");
        assert_eq!(b.bounds[1], 1.0);
    }
}
