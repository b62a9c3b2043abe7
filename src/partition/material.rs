//! Material partition tables for block-structured readers.
//!
//! A reader holding a flat per-element material array partitions the
//! *materials* (not individual elements) across processors as evenly as
//! possible by element count, while preserving the ability to reconstruct
//! original element ordering. The computation needs the full unpartitioned
//! material array, so it runs once on rank 0 and the five summary tables
//! are replicated to every rank.

use crate::comm::{Collective, Communicator};
use crate::partition::weights::partition_weights;
use crate::pipeline_error::PipelineError;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Per-mesh-group partition tables.
///
/// Invariants:
/// - `matsft` and `prtsft` are monotonically non-decreasing prefix sums;
/// - `matsft[nmat] == ne` (total element count);
/// - `matidx` is a permutation of `[0, ne)`, grouped by material with
///   material groups ordered by partition assignment;
/// - `part[p+1] - part[p]` is the element count of partition `p`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MaterialPartition {
    /// Materials present, in partition order.
    pub matid: Vec<i64>,
    /// Prefix-sum offsets into `matidx`, one per material in `matid`
    /// order, plus the trailing total.
    pub matsft: Vec<usize>,
    /// Prefix sum of materials per partition (`prtsft[p]..prtsft[p+1]`
    /// indexes `matid`).
    pub prtsft: Vec<usize>,
    /// Permutation: partition-ordered position → original element index.
    pub matidx: Vec<usize>,
    /// Element-count prefix sum per partition.
    pub part: Vec<usize>,
}

impl MaterialPartition {
    pub fn num_partitions(&self) -> usize {
        self.part.len().saturating_sub(1)
    }

    pub fn num_materials(&self) -> usize {
        self.matid.len()
    }

    pub fn num_elements(&self) -> usize {
        self.matidx.len()
    }

    /// Materials assigned to partition `p`.
    pub fn materials_of_partition(&self, p: usize) -> &[i64] {
        &self.matid[self.prtsft[p]..self.prtsft[p + 1]]
    }

    /// Original element indices of material slot `m` (index into
    /// `matid`).
    pub fn elements_of_material(&self, m: usize) -> &[usize] {
        &self.matidx[self.matsft[m]..self.matsft[m + 1]]
    }
}

/// Convert a flat per-element material array into balanced partition
/// tables. Materials are the atomic unit of partitioning; element order
/// within a material follows the original array.
pub fn read_material_info(mdat: &[i64], nparts: usize) -> MaterialPartition {
    assert!(nparts > 0, "number of partitions must be >= 1");
    // Element indices per material, in first-appearance-within-material
    // order; BTreeMap keys give a deterministic material ordering.
    let mut by_material: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (e, &m) in mdat.iter().enumerate() {
        by_material.entry(m).or_default().push(e);
    }
    let materials: Vec<i64> = by_material.keys().copied().collect();
    let weights: Vec<u64> = by_material.values().map(|v| v.len() as u64).collect();
    let assignment = partition_weights(&weights, nparts);

    // Material slots grouped by final partition assignment.
    let slot_order: Vec<usize> = (0..nparts)
        .flat_map(|p| {
            assignment
                .iter()
                .positions(|&a| a == p)
                .collect::<Vec<_>>()
        })
        .collect();

    let mut out = MaterialPartition {
        matid: Vec::with_capacity(materials.len()),
        matsft: Vec::with_capacity(materials.len() + 1),
        prtsft: Vec::with_capacity(nparts + 1),
        matidx: Vec::with_capacity(mdat.len()),
        part: Vec::with_capacity(nparts + 1),
    };
    out.matsft.push(0);
    out.prtsft.push(0);
    out.part.push(0);
    let mut slot_cursor = 0;
    for p in 0..nparts {
        let mut elements_in_part = 0;
        while slot_cursor < slot_order.len() && assignment[slot_order[slot_cursor]] == p {
            let slot = slot_order[slot_cursor];
            let m = materials[slot];
            let elems = &by_material[&m];
            out.matid.push(m);
            out.matidx.extend_from_slice(elems);
            out.matsft.push(out.matidx.len());
            elements_in_part += elems.len();
            slot_cursor += 1;
        }
        out.prtsft.push(out.matid.len());
        out.part.push(out.part[p] + elements_in_part);
    }
    out
}

/// Compute the partition tables on rank 0 and replicate them everywhere.
///
/// Rank 0 must supply the material array; other ranks pass `None` and
/// receive the tables via broadcast.
///
/// # Errors
/// `ImproperUse` if rank 0 has no material array.
pub fn read_material_info_replicated<C: Communicator>(
    coll: &Collective<'_, C>,
    mdat: Option<&[i64]>,
    nparts: usize,
) -> Result<MaterialPartition, PipelineError> {
    let mut tables = if coll.rank() == 0 {
        let mdat = mdat.ok_or_else(|| {
            PipelineError::ImproperUse("read_material_info_replicated: rank 0 has no data".into())
        })?;
        read_material_info(mdat, nparts)
    } else {
        MaterialPartition::default()
    };
    coll.broadcast_i64_vec(&mut tables.matid)?;
    coll.broadcast_usize_vec(&mut tables.matsft)?;
    coll.broadcast_usize_vec(&mut tables.prtsft)?;
    coll.broadcast_usize_vec(&mut tables.matidx)?;
    coll.broadcast_usize_vec(&mut tables.part)?;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(p: &MaterialPartition, mdat: &[i64]) {
        let ne = mdat.len();
        assert_eq!(p.num_elements(), ne);
        assert_eq!(*p.matsft.last().unwrap(), ne);
        assert_eq!(*p.part.last().unwrap(), ne);
        assert_eq!(*p.prtsft.last().unwrap(), p.matid.len());
        assert!(p.matsft.windows(2).all(|w| w[0] <= w[1]));
        assert!(p.prtsft.windows(2).all(|w| w[0] <= w[1]));
        assert!(p.part.windows(2).all(|w| w[0] <= w[1]));
        // matidx is a permutation of [0, ne).
        let mut seen = vec![false; ne];
        for &e in &p.matidx {
            assert!(!seen[e]);
            seen[e] = true;
        }
        assert!(seen.into_iter().all(|s| s));
        // Each material group holds exactly the elements of its material.
        for m in 0..p.num_materials() {
            for &e in p.elements_of_material(m) {
                assert_eq!(mdat[e], p.matid[m]);
            }
        }
    }

    #[test]
    fn two_materials_two_parts() {
        let mdat = vec![1, 1, 2, 1, 2, 2, 2];
        let p = read_material_info(&mdat, 2);
        check_invariants(&p, &mdat);
        assert_eq!(p.num_materials(), 2);
        // One material per partition; element order within a material is
        // the original order.
        assert_eq!(p.materials_of_partition(0).len(), 1);
        assert_eq!(p.materials_of_partition(1).len(), 1);
        let slot = p.matid.iter().position(|&m| m == 1).unwrap();
        assert_eq!(p.elements_of_material(slot), &[0, 1, 3]);
    }

    #[test]
    fn single_partition_keeps_everything() {
        let mdat = vec![5, 3, 5, 3, 9];
        let p = read_material_info(&mdat, 1);
        check_invariants(&p, &mdat);
        assert_eq!(p.num_partitions(), 1);
        assert_eq!(p.part, vec![0, 5]);
    }

    #[test]
    fn more_parts_than_materials_leaves_empty_parts() {
        let mdat = vec![1, 1, 1];
        let p = read_material_info(&mdat, 3);
        check_invariants(&p, &mdat);
        let nonempty = (0..3).filter(|&q| p.part[q + 1] > p.part[q]).count();
        assert_eq!(nonempty, 1);
    }

    #[test]
    fn replicated_serial_is_identity() {
        use crate::comm::NoComm;
        let comm = NoComm;
        let coll = Collective::new(&comm);
        let mdat = vec![1, 2, 1, 3];
        let direct = read_material_info(&mdat, 2);
        let replicated = read_material_info_replicated(&coll, Some(&mdat), 2).unwrap();
        assert_eq!(direct, replicated);
    }

    proptest::proptest! {
        #[test]
        fn prop_tables_hold_invariants(
            mdat in proptest::collection::vec(-3i64..6, 1..60),
            nparts in 1usize..6,
        ) {
            let p = read_material_info(&mdat, nparts);
            check_invariants(&p, &mdat);
            // Partition element counts agree between part and the
            // material groups assigned to each partition.
            for q in 0..nparts {
                let by_groups: usize = (p.prtsft[q]..p.prtsft[q + 1])
                    .map(|m| p.matsft[m + 1] - p.matsft[m])
                    .sum();
                proptest::prop_assert_eq!(by_groups, p.part[q + 1] - p.part[q]);
            }
        }
    }
}
