//! Balanced weighted bin-packing.
//!
//! Assigns weighted items (materials, by element count) to `k` parts with
//! first-fit decreasing: heaviest first, each onto the currently
//! lightest part. Any reasonable balanced-partition algorithm satisfies
//! the reader contract; FFD keeps worst-case imbalance bounded and is
//! deterministic for reproducible partition tables.

use std::cmp::Reverse;

/// Assign each weighted item to one of `k` parts. Returns a vector
/// mapping item index to part index.
pub fn partition_weights(weights: &[u64], k: usize) -> Vec<usize> {
    assert!(k > 0, "number of parts must be >= 1");
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_unstable_by_key(|&i| Reverse(weights[i]));

    let mut loads = vec![0u64; k];
    let mut assignment = vec![0usize; n];
    for &idx in &order {
        let (part, _) = loads
            .iter()
            .enumerate()
            .min_by_key(|&(_, &w)| w)
            .expect("k >= 1");
        assignment[idx] = part;
        loads[part] += weights[idx];
    }

    let max_load = loads.iter().max().copied().unwrap_or(0);
    let min_load = loads.iter().min().copied().unwrap_or(0);
    log::debug!(
        "partition_weights: {n} items onto {k} parts, loads min={min_load} max={max_load}"
    );
    assignment
}
