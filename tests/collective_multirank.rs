//! Collective-layer tests with real multi-rank groups.
//!
//! Each test spins up a `LocalComm` group on threads and runs the same
//! closure on every rank, the way a production pass runs the same
//! collective sequence on every process. Results come back indexed by
//! rank.

use std::sync::Arc;

use serial_test::serial;
use viz_pipeline::comm::collective::{Collective, Extreme};
use viz_pipeline::comm::communicator::LocalComm;
use viz_pipeline::comm::wire::{self, WireAttribute};
use viz_pipeline::pipeline_error::PipelineError;

fn run<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&Collective<'_, LocalComm>) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = LocalComm::group(size)
        .into_iter()
        .map(|comm| {
            let f = Arc::clone(&f);
            std::thread::spawn(move || {
                let coll = Collective::new(&comm);
                f(&coll)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("rank thread panicked"))
        .collect()
}

#[test]
#[serial]
fn sum_min_max_across_three_ranks() {
    let results = run(3, |coll| {
        let sum = coll.sum_i64(coll.rank() as i64 + 1).unwrap();
        let mut mins = [coll.rank() as f64, 10.0 - coll.rank() as f64];
        coll.min_across_all(&mut mins).unwrap();
        let mut maxs = [coll.rank() as f64];
        coll.max_across_all(&mut maxs).unwrap();
        (sum, mins, maxs[0])
    });
    for (sum, mins, max) in results {
        assert_eq!(sum, 6);
        assert_eq!(mins, [0.0, 8.0]);
        assert_eq!(max, 2.0);
    }
}

#[test]
#[serial]
fn unify_min_max_disagreeing_lengths_alt_size_negative_one() {
    // Rank 0 carries 2 interleaved pairs, rank 1 carries 3; alt_size -1
    // makes them agree on the longer length, padding rank 0 with
    // sentinel pairs that never win.
    let results = run(2, |coll| {
        let mut buf = if coll.rank() == 0 {
            vec![0.0, 1.0, 2.0, 3.0]
        } else {
            vec![10.0, -5.0, 1.0, 9.0, -2.0, 8.0]
        };
        coll.unify_min_max(&mut buf, -1).unwrap();
        buf
    });
    assert_eq!(results[0], vec![0.0, 1.0, 1.0, 9.0]);
    assert_eq!(results[1], vec![0.0, 1.0, 1.0, 9.0, -2.0, 8.0]);
}

#[test]
#[serial]
fn unify_min_max_rejects_odd_buffer() {
    let results = run(2, |coll| {
        let mut buf = vec![1.0, 2.0, 3.0];
        coll.unify_min_max(&mut buf, 0).err()
    });
    for err in results {
        assert!(matches!(err, Some(PipelineError::ImproperUse(_))));
    }
}

#[test]
#[serial]
fn extreme_value_ties_break_to_lowest_rank() {
    // Ranks 1 and 2 tie for the minimum; only rank 1 may claim it.
    let results = run(3, |coll| {
        let value = if coll.rank() == 0 { 5.0 } else { 1.0 };
        let has_min = coll
            .this_processor_has_extreme_value(value, Extreme::Min)
            .unwrap();
        let has_max = coll
            .this_processor_has_extreme_value(value, Extreme::Max)
            .unwrap();
        (has_min, has_max)
    });
    assert_eq!(results, vec![(false, true), (true, false), (false, false)]);
}

#[test]
#[serial]
fn all_equal_extreme_goes_to_rank_zero() {
    let results = run(3, |coll| {
        coll.this_processor_has_extreme_value(2.0, Extreme::Max)
            .unwrap()
    });
    assert_eq!(results, vec![true, false, false]);
}

#[test]
#[serial]
fn collect_max_to_root_only_root_reports_true() {
    let results = run(3, |coll| {
        let mut buf = [coll.rank() as f64, 10.0 - coll.rank() as f64];
        let at_root = coll.collect_max_to_root(&mut buf).unwrap();
        (at_root, buf)
    });
    assert!(results[0].0);
    assert_eq!(results[0].1, [2.0, 10.0]);
    assert!(!results[1].0 && !results[2].0);
}

#[test]
#[serial]
fn broadcasts_propagate_rank_zero_values() {
    let results = run(3, |coll| {
        let mut v = if coll.rank() == 0 { 42u64 } else { 0 };
        coll.broadcast_u64(&mut v).unwrap();
        let mut names = if coll.rank() == 0 {
            vec!["density".to_string(), "pressure".to_string()]
        } else {
            Vec::new()
        };
        coll.broadcast_string_vec(&mut names).unwrap();
        let mut xs = if coll.rank() == 0 {
            vec![1.5, -2.5]
        } else {
            vec![9.0; 7]
        };
        coll.broadcast_f64_vec(&mut xs).unwrap();
        (v, names, xs)
    });
    for (v, names, xs) in results {
        assert_eq!(v, 42);
        assert_eq!(names, vec!["density", "pressure"]);
        assert_eq!(xs, vec![1.5, -2.5]);
    }
}

#[test]
#[serial]
fn get_list_to_root_ships_from_lowest_holder() {
    let results = run(3, |coll| {
        let mut list = if coll.rank() == 2 {
            vec![7u64, 8, 9]
        } else {
            Vec::new()
        };
        let authoritative = coll.get_list_to_root(&mut list, 3).unwrap();
        (authoritative, list)
    });
    assert!(results[0].0);
    assert_eq!(results[0].1, vec![7, 8, 9]);
    assert!(!results[1].0 && !results[2].0);
}

#[test]
#[serial]
fn get_list_to_root_with_no_holder() {
    let results = run(2, |coll| {
        let mut list: Vec<u64> = vec![1];
        coll.get_list_to_root(&mut list, 5).unwrap()
    });
    assert_eq!(results, vec![false, false]);
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LabelAttr {
    id: u64,
    name: String,
}

impl WireAttribute for LabelAttr {
    fn encoded_len(&self) -> usize {
        8 + 8 + self.name.len()
    }
    fn encode(&self, out: &mut Vec<u8>) {
        wire::put_u64(out, self.id);
        wire::put_str(out, &self.name);
    }
    fn decode(buf: &[u8]) -> Result<Self, PipelineError> {
        let mut off = 0;
        let id = wire::take_u64(buf, &mut off)?;
        let name = wire::take_str(buf, &mut off)?;
        Ok(Self { id, name })
    }
}

#[test]
#[serial]
fn get_attribute_to_root_lowest_holder_wins() {
    // Ranks 1 and 3 both hold an attribute; rank 1's copy must win.
    let results = run(4, |coll| {
        let mut attr = match coll.rank() {
            1 => Some(LabelAttr {
                id: 1,
                name: "from-one".into(),
            }),
            3 => Some(LabelAttr {
                id: 3,
                name: "from-three".into(),
            }),
            _ => None,
        };
        let holds = coll.get_attribute_to_root(&mut attr).unwrap();
        (holds, attr)
    });
    assert!(results[0].0);
    assert_eq!(
        results[0].1,
        Some(LabelAttr {
            id: 1,
            name: "from-one".into()
        })
    );
    // Non-root holders keep their local copies but do not claim
    // authority.
    assert!(!results[1].0 && !results[3].0);
}

#[test]
#[serial]
fn get_attribute_to_root_prefers_roots_own_copy() {
    let results = run(2, |coll| {
        let mut attr = Some(LabelAttr {
            id: coll.rank() as u64,
            name: format!("rank{}", coll.rank()),
        });
        coll.get_attribute_to_root(&mut attr).unwrap();
        attr
    });
    assert_eq!(results[0].as_ref().unwrap().id, 0);
}

#[test]
#[serial]
fn get_float_array_to_root() {
    let results = run(3, |coll| {
        let mut buf = if coll.rank() == 2 {
            vec![1.0f32, 2.0, 3.0]
        } else {
            vec![0.0f32; 3]
        };
        let valid = coll.get_float_array_to_root(&mut buf, coll.rank() == 2).unwrap();
        (valid, buf)
    });
    assert!(results[0].0);
    assert_eq!(results[0].1, vec![1.0, 2.0, 3.0]);
    assert!(!results[1].0);
}

#[test]
#[serial]
fn collective_sequences_stay_in_lock_step() {
    // A realistic pass: several different collectives back to back, all
    // relying on the session tag allocator staying aligned across ranks.
    let results = run(2, |coll| {
        coll.barrier().unwrap();
        let total = coll.sum_usize(coll.rank() + 1).unwrap();
        let mut extents = vec![coll.rank() as f64, coll.rank() as f64 + 1.0];
        coll.unify_min_max(&mut extents, 0).unwrap();
        let mut name = if coll.rank() == 0 {
            "mesh".to_string()
        } else {
            String::new()
        };
        coll.broadcast_string(&mut name).unwrap();
        coll.barrier().unwrap();
        (total, extents, name)
    });
    for (total, extents, name) in results {
        assert_eq!(total, 3);
        assert_eq!(extents, vec![0.0, 2.0]);
        assert_eq!(name, "mesh");
    }
}
