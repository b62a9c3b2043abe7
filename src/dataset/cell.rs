//! Cell shapes for unstructured grids.

/// The cell shapes the pipeline's decomposition and transform filters emit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CellShape {
    /// 2D simplex (triangle).
    Tri,
    /// 2D tensor-product cell (quad).
    Quad,
    /// 3D simplex (tet).
    Tet,
    /// 3D pyramid.
    Pyramid,
    /// 3D wedge/prism.
    Wedge,
    /// 3D tensor-product cell (hex).
    Hex,
}

impl CellShape {
    /// Number of vertices of this shape.
    pub const fn vertex_count(self) -> usize {
        match self {
            CellShape::Tri => 3,
            CellShape::Quad => 4,
            CellShape::Tet => 4,
            CellShape::Pyramid => 5,
            CellShape::Wedge => 6,
            CellShape::Hex => 8,
        }
    }

    /// Topological dimension of the cell.
    pub const fn dimension(self) -> u8 {
        match self {
            CellShape::Tri | CellShape::Quad => 2,
            CellShape::Tet | CellShape::Pyramid | CellShape::Wedge | CellShape::Hex => 3,
        }
    }
}

/// An unstructured cell: a shape plus its point connectivity.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    pub shape: CellShape,
    pub connectivity: Vec<usize>,
}

impl Cell {
    pub fn new(shape: CellShape, connectivity: Vec<usize>) -> Self {
        debug_assert_eq!(connectivity.len(), shape.vertex_count());
        Self {
            shape,
            connectivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_counts() {
        assert_eq!(CellShape::Tet.vertex_count(), 4);
        assert_eq!(CellShape::Pyramid.vertex_count(), 5);
        assert_eq!(CellShape::Wedge.vertex_count(), 6);
        assert_eq!(CellShape::Hex.vertex_count(), 8);
        assert_eq!(CellShape::Quad.vertex_count(), 4);
        assert_eq!(CellShape::Tri.vertex_count(), 3);
    }

    #[test]
    fn dimensions() {
        assert_eq!(CellShape::Tri.dimension(), 2);
        assert_eq!(CellShape::Hex.dimension(), 3);
    }
}
