//! Cumulative spatial extents.
//!
//! Filters recompute their output extents in `post_execute` as the union of
//! per-domain results on *this rank only*; the global answer, when needed,
//! comes from running the interleaved representation through
//! [`Collective::unify_min_max`](crate::comm::collective::Collective::unify_min_max).

/// Running union of `[min, max]` pairs per axis. Starts cleared; merging
/// the first contribution sets it.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extents {
    bounds: Option<[f64; 6]>,
}

impl Extents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all accumulated contributions.
    pub fn clear(&mut self) {
        self.bounds = None;
    }

    pub fn is_set(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn get(&self) -> Option<[f64; 6]> {
        self.bounds
    }

    /// Replace the accumulated extents outright.
    pub fn set(&mut self, b: [f64; 6]) {
        self.bounds = Some(b);
    }

    /// Union with `[xmin, xmax, ymin, ymax, zmin, zmax]`.
    pub fn merge(&mut self, b: [f64; 6]) {
        match &mut self.bounds {
            None => self.bounds = Some(b),
            Some(cur) => {
                for a in 0..3 {
                    cur[2 * a] = cur[2 * a].min(b[2 * a]);
                    cur[2 * a + 1] = cur[2 * a + 1].max(b[2 * a + 1]);
                }
            }
        }
    }

    /// Union with a single point.
    pub fn merge_point(&mut self, p: [f64; 3]) {
        self.merge([p[0], p[0], p[1], p[1], p[2], p[2]]);
    }

    /// Interleaved `[min0, max0, min1, max1, min2, max2]` copy for the
    /// collective layer; cleared extents yield the sentinel pairs that
    /// never win a min/max comparison.
    pub fn to_interleaved(&self) -> Vec<f64> {
        match self.bounds {
            Some(b) => b.to_vec(),
            None => vec![
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
            ],
        }
    }
}
