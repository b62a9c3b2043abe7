//! Recursive per-domain dataset container.
//!
//! A tree node is either a leaf holding zero-or-one grid (with a domain
//! index and label) or an interior node with an ordered list of children.
//! A leaf with no grid is a *valid, meaningful* state — "this domain
//! produced no data" — and every tree operation propagates it without
//! treating it as an error.

use crate::dataset::array::AttributeSet;
use crate::dataset::cell::Cell;
use crate::dataset::grid::{Grid, UnstructuredGrid};
use crate::pipeline_error::PipelineError;

/// Recursive dataset container: one leaf per domain, interior nodes for
/// fan-out (e.g. one child per unit-cell replication image).
#[derive(Clone, Debug, PartialEq)]
pub enum DataTree {
    Leaf {
        grid: Option<Grid>,
        domain: usize,
        label: String,
    },
    Node {
        children: Vec<DataTree>,
    },
}

impl DataTree {
    pub fn leaf(grid: Option<Grid>, domain: usize, label: impl Into<String>) -> Self {
        DataTree::Leaf {
            grid,
            domain,
            label: label.into(),
        }
    }

    /// The canonical "this domain produced nothing" leaf.
    pub fn empty_leaf(domain: usize, label: impl Into<String>) -> Self {
        Self::leaf(None, domain, label)
    }

    pub fn node(children: Vec<DataTree>) -> Self {
        DataTree::Node { children }
    }

    /// Number of leaves, counting empty ones.
    pub fn num_leaves(&self) -> usize {
        match self {
            DataTree::Leaf { .. } => 1,
            DataTree::Node { children } => children.iter().map(|c| c.num_leaves()).sum(),
        }
    }

    /// True iff no leaf holds a grid.
    pub fn is_empty(&self) -> bool {
        match self {
            DataTree::Leaf { grid, .. } => grid.is_none(),
            DataTree::Node { children } => children.iter().all(|c| c.is_empty()),
        }
    }

    /// Visit every leaf in depth-first order, empty leaves included.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(Option<&'a Grid>, usize, &'a str)) {
        match self {
            DataTree::Leaf {
                grid,
                domain,
                label,
            } => f(grid.as_ref(), *domain, label),
            DataTree::Node { children } => {
                for c in children {
                    c.for_each_leaf(f);
                }
            }
        }
    }

    /// Collect references to all non-empty leaf grids in depth-first order.
    pub fn leaves(&self) -> Vec<(&Grid, usize, &str)> {
        let mut out = Vec::new();
        self.for_each_leaf(&mut |g, d, l| {
            if let Some(g) = g {
                out.push((g, d, l));
            }
        });
        out
    }

    /// Total point count over all non-empty leaves.
    pub fn num_points(&self) -> usize {
        self.leaves().iter().map(|(g, _, _)| g.num_points()).sum()
    }

    /// Append all non-empty leaves into a single unstructured grid:
    /// points concatenated, connectivity remapped, point/cell arrays
    /// merged positionally by name. Leaves lacking an array another leaf
    /// carries drop that array from the merged output.
    ///
    /// Returns `None` when every leaf is empty — the valid
    /// "nothing anywhere" result, not an error.
    pub fn append_leaves(&self) -> Result<Option<UnstructuredGrid>, PipelineError> {
        let leaves = self.leaves();
        if leaves.is_empty() {
            return Ok(None);
        }
        // Arrays carried by every leaf, in first-leaf order.
        let first = leaves[0].0;
        let common = |pick: fn(&Grid) -> &AttributeSet| -> Vec<String> {
            pick(first)
                .iter()
                .filter(|a| {
                    leaves
                        .iter()
                        .all(|(g, _, _)| pick(g).get(a.name()).map(|x| x.components()) == Some(a.components()))
                })
                .map(|a| a.name().to_string())
                .collect()
        };
        let point_names = common(Grid::point_data);
        let cell_names = common(Grid::cell_data);

        let mut out = UnstructuredGrid::default();
        for name in &point_names {
            out.point_data
                .set(first.point_data().try_get(name)?.empty_like(0));
        }
        for name in &cell_names {
            out.cell_data
                .set(first.cell_data().try_get(name)?.empty_like(0));
        }
        for (g, _, _) in &leaves {
            let u = g.to_unstructured();
            let offset = out.points.len();
            out.points.extend_from_slice(&u.points);
            for cell in &u.cells {
                out.cells.push(Cell::new(
                    cell.shape,
                    cell.connectivity.iter().map(|&p| p + offset).collect(),
                ));
            }
            for name in &point_names {
                let src = u.point_data.try_get(name)?;
                let dst = out.point_data.get_mut(name).expect("array preinserted");
                for i in 0..src.num_tuples() {
                    dst.push_tuple_from(src, i);
                }
            }
            for name in &cell_names {
                let src = u.cell_data.try_get(name)?;
                let dst = out.cell_data.get_mut(name).expect("array preinserted");
                for i in 0..src.num_tuples() {
                    dst.push_tuple_from(src, i);
                }
            }
        }
        out.field_data = first.field_data().clone();
        Ok(Some(out))
    }
}
