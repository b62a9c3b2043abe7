//! Named attribute arrays and attribute sets.
//!
//! A `DataArray` is a flat `f64` buffer of `tuples × components` values with
//! a name; an `AttributeSet` is an ordered collection of arrays (point data
//! or cell data on a grid). Insertion order is preserved for deterministic
//! iteration and I/O.

use crate::pipeline_error::PipelineError;

/// Well-known bookkeeping array names. Arrays with these names carry
/// indices/ids rather than field values and must never be geometrically
/// transformed, regardless of their component count.
pub const ORIGINAL_NODE_NUMBERS: &str = "original_node_numbers";
pub const ORIGINAL_CELL_NUMBERS: &str = "original_cell_numbers";
pub const SUBSET_IDS: &str = "subset_ids";
pub const GHOST_ZONES: &str = "ghost_zones";
pub const MISSING_DATA: &str = "missing_data";

/// Returns true iff `name` is one of the bookkeeping arrays excluded from
/// geometric (vector) transformation.
pub fn is_bookkeeping_array(name: &str) -> bool {
    matches!(
        name,
        ORIGINAL_NODE_NUMBERS | ORIGINAL_CELL_NUMBERS | SUBSET_IDS | GHOST_ZONES | MISSING_DATA
    )
}

/// A named, fixed-component-count array of `f64` values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataArray {
    name: String,
    components: usize,
    values: Vec<f64>,
}

impl DataArray {
    /// Create an array from raw values.
    ///
    /// # Errors
    /// Returns `InvalidGeometry` if `components == 0` or `values.len()` is
    /// not a multiple of `components`.
    pub fn new(
        name: impl Into<String>,
        components: usize,
        values: Vec<f64>,
    ) -> Result<Self, PipelineError> {
        if components == 0 {
            return Err(PipelineError::InvalidGeometry(
                "data array must have at least one component".into(),
            ));
        }
        if values.len() % components != 0 {
            return Err(PipelineError::InvalidGeometry(format!(
                "data array `{}`: {} values is not a multiple of {} components",
                name.into(),
                values.len(),
                components
            )));
        }
        Ok(Self {
            name: name.into(),
            components,
            values,
        })
    }

    /// An empty array with the same name and component count, with room
    /// reserved for `tuples` tuples.
    pub fn empty_like(&self, tuples: usize) -> Self {
        Self {
            name: self.name.clone(),
            components: self.components,
            values: Vec::with_capacity(tuples * self.components),
        }
    }

    /// One-component convenience constructor.
    pub fn scalar(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            components: 1,
            values,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    #[inline]
    pub fn num_tuples(&self) -> usize {
        self.values.len() / self.components
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Borrow tuple `i`.
    #[inline]
    pub fn tuple(&self, i: usize) -> &[f64] {
        &self.values[i * self.components..(i + 1) * self.components]
    }

    /// Mutable borrow of tuple `i`.
    #[inline]
    pub fn tuple_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.values[i * self.components..(i + 1) * self.components]
    }

    /// Append one tuple. Panics in debug builds if the arity is wrong.
    pub fn push_tuple(&mut self, tuple: &[f64]) {
        debug_assert_eq!(tuple.len(), self.components);
        self.values.extend_from_slice(tuple);
    }

    /// Append a copy of tuple `i` of `src` (same arity assumed).
    pub fn push_tuple_from(&mut self, src: &DataArray, i: usize) {
        self.values.extend_from_slice(src.tuple(i));
    }

    /// Append the edge interpolation `bp·T[a] + (1−bp)·T[b]`.
    ///
    /// This is the "interpolate edge" rule decomposition consumers rely on:
    /// the blend fraction weights the *first* endpoint.
    pub fn push_edge_interpolated(&mut self, src: &DataArray, a: usize, b: usize, bp: f64) {
        let ta = src.tuple(a);
        let tb = src.tuple(b);
        for c in 0..self.components {
            self.values.push(bp * ta[c] + (1.0 - bp) * tb[c]);
        }
    }

    /// Append the uniform-weight average of tuples at `ids` of `src`.
    pub fn push_uniform_average(&mut self, src: &DataArray, ids: &[usize]) {
        let w = 1.0 / ids.len() as f64;
        for c in 0..self.components {
            let sum: f64 = ids.iter().map(|&i| src.tuple(i)[c]).sum();
            self.values.push(sum * w);
        }
    }

    /// Append the uniform-weight average of this array's *own* tuples at
    /// `ids`. All ids must reference tuples appended before this call;
    /// decomposition centroids rely on this to average over earlier edge
    /// and centroid points.
    pub fn push_uniform_average_self(&mut self, ids: &[usize]) {
        let w = 1.0 / ids.len() as f64;
        let ncomp = self.components;
        for c in 0..ncomp {
            let sum: f64 = ids.iter().map(|&i| self.values[i * ncomp + c]).sum();
            self.values.push(sum * w);
        }
    }
}

/// Ordered collection of named arrays (the point data or cell data of a
/// grid, or per-dataset field data). Lookup is by name; iteration follows
/// insertion order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeSet {
    arrays: Vec<DataArray>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the array with the same name.
    pub fn set(&mut self, array: DataArray) {
        if let Some(existing) = self.arrays.iter_mut().find(|a| a.name == array.name) {
            *existing = array;
        } else {
            self.arrays.push(array);
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.arrays.iter_mut().find(|a| a.name == name)
    }

    /// Fallible lookup for consumers that require the array to exist.
    pub fn try_get(&self, name: &str) -> Result<&DataArray, PipelineError> {
        self.get(name)
            .ok_or_else(|| PipelineError::MissingVariable(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Option<DataArray> {
        let idx = self.arrays.iter().position(|a| a.name == name)?;
        Some(self.arrays.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataArray> {
        self.arrays.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DataArray> {
        self.arrays.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// A set of empty arrays mirroring the names/components of `self`,
    /// each with room for `tuples` tuples. Used when building transformed
    /// outputs tuple by tuple.
    pub fn empty_like(&self, tuples: usize) -> Self {
        Self {
            arrays: self.arrays.iter().map(|a| a.empty_like(tuples)).collect(),
        }
    }

    /// Zip mutable output arrays with their source arrays by position.
    /// `empty_like` guarantees positional correspondence.
    pub fn zip_like<'a>(
        &'a mut self,
        src: &'a AttributeSet,
    ) -> impl Iterator<Item = (&'a mut DataArray, &'a DataArray)> {
        self.arrays.iter_mut().zip(src.arrays.iter())
    }
}
