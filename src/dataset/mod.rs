//! Dataset model: attribute arrays, grids, the per-domain dataset tree,
//! and cumulative spatial extents.

pub mod array;
pub mod cell;
pub mod extents;
pub mod grid;
pub mod tree;

pub use array::{AttributeSet, DataArray};
pub use cell::{Cell, CellShape};
pub use extents::Extents;
pub use grid::{Grid, RectilinearGrid, UnstructuredGrid};
pub use tree::DataTree;
