//! Collective operations over a [`Communicator`].
//!
//! A [`Collective`] is a *session* object: it wraps a communicator
//! reference plus a session-scoped message-tag allocator. Every operation
//! is the identity when `size() == 1`, so pipeline code calls these
//! unconditionally and runs the same code path serial or distributed.
//!
//! ## Protocol invariant
//!
//! All participants must reach the same sequence of collective calls in
//! the same order. Tags are allocated per *communication phase* (one or
//! two phases per collective), and the `(sender, receiver)` pair
//! disambiguates messages within a phase, so a single collective cannot
//! collide with itself. A rank that skips a collective another rank
//! issues diverges the tag space and the run will hang — there is no
//! runtime detection, by design.

use crate::comm::communicator::{Communicator, Wait};
use crate::comm::wire::{self, WireAttribute};
use crate::pipeline_error::PipelineError;
use bytemuck::Pod;
use num_traits::Num;
use std::cell::Cell;

/// First tag handed out by a fresh session.
const TAG_FIRST: u16 = 64;
/// Tags wrap here; headroom below `u16::MAX` is reserved for backends.
const TAG_CEILING: u16 = 0xFFF0;

/// Which extreme [`Collective::this_processor_has_extreme_value`] tests.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Extreme {
    Min,
    Max,
}

/// Collective-operation session over a communicator.
pub struct Collective<'a, C: Communicator> {
    comm: &'a C,
    next_tag: Cell<u16>,
}

impl<'a, C: Communicator> Collective<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        Self {
            comm,
            next_tag: Cell::new(TAG_FIRST),
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.comm.size()
    }

    /// Allocate the next message tag, wrapping at the tag ceiling.
    ///
    /// Every participant must call this the same number of times in the
    /// same order; tag allocation is purely local, so divergent call
    /// sequences are not detected here — they surface later as misrouted
    /// or never-received messages.
    pub fn unique_tag(&self) -> u16 {
        let t = self.next_tag.get();
        let next = if t >= TAG_CEILING { TAG_FIRST } else { t + 1 };
        self.next_tag.set(next);
        t
    }

    // ---- point-to-point primitives -------------------------------------

    fn recv(&self, peer: usize, tag: u16, len: usize) -> Result<Vec<u8>, PipelineError> {
        self.comm
            .irecv(peer, tag, len)
            .wait()
            .ok_or_else(|| PipelineError::CommError {
                neighbor: peer,
                detail: format!("receive of {len} bytes (tag {tag}) failed"),
            })
    }

    /// Gather every rank's payload onto rank 0. Returns `Some(payloads)`
    /// (indexed by rank) on rank 0, `None` elsewhere.
    fn gather_to_root(&self, payload: &[u8]) -> Result<Option<Vec<Vec<u8>>>, PipelineError> {
        if self.size() == 1 {
            return Ok(Some(vec![payload.to_vec()]));
        }
        let t_len = self.unique_tag();
        let t_pay = self.unique_tag();
        if self.rank() != 0 {
            let len = (payload.len() as u64).to_le_bytes();
            self.comm.isend(0, t_len, &len).wait();
            self.comm.isend(0, t_pay, payload).wait();
            return Ok(None);
        }
        // Post all length receives, then drain; then payloads.
        let len_handles: Vec<_> = (1..self.size())
            .map(|r| (r, self.comm.irecv(r, t_len, wire::LEN_HEADER)))
            .collect();
        let mut lens = vec![0usize; self.size()];
        for (r, h) in len_handles {
            let bytes = h.wait().ok_or_else(|| PipelineError::CommError {
                neighbor: r,
                detail: "length header receive failed".into(),
            })?;
            let mut off = 0;
            lens[r] = wire::take_u64(&bytes, &mut off)? as usize;
        }
        let pay_handles: Vec<_> = (1..self.size())
            .map(|r| (r, self.comm.irecv(r, t_pay, lens[r])))
            .collect();
        let mut out = vec![Vec::new(); self.size()];
        out[0] = payload.to_vec();
        for (r, h) in pay_handles {
            out[r] = h.wait().ok_or_else(|| PipelineError::CommError {
                neighbor: r,
                detail: "payload receive failed".into(),
            })?;
        }
        Ok(Some(out))
    }

    /// Rank-0-authoritative broadcast. Rank 0 must pass `Some(payload)`;
    /// other ranks receive and return the broadcast bytes.
    fn broadcast_bytes(&self, payload: Option<&[u8]>) -> Result<Vec<u8>, PipelineError> {
        if self.rank() == 0 {
            let payload = payload.ok_or_else(|| {
                PipelineError::ImproperUse("broadcast root has no payload".into())
            })?;
            let t_len = self.unique_tag();
            let t_pay = self.unique_tag();
            let len = (payload.len() as u64).to_le_bytes();
            for r in 1..self.size() {
                self.comm.isend(r, t_len, &len).wait();
                self.comm.isend(r, t_pay, payload).wait();
            }
            Ok(payload.to_vec())
        } else {
            let t_len = self.unique_tag();
            let t_pay = self.unique_tag();
            let bytes = self.recv(0, t_len, wire::LEN_HEADER)?;
            let mut off = 0;
            let len = wire::take_u64(&bytes, &mut off)? as usize;
            self.recv(0, t_pay, len)
        }
    }

    /// Reduce-then-broadcast: gather every rank's equal-length `buf` onto
    /// rank 0, fold with `combine`, broadcast the result back into `buf`.
    fn all_reduce_with<T, F>(&self, buf: &mut [T], mut combine: F) -> Result<(), PipelineError>
    where
        T: Pod,
        F: FnMut(&mut [T], &[T]),
    {
        if self.size() == 1 {
            return Ok(());
        }
        let gathered = self.gather_to_root(wire::cast_slice(buf))?;
        let result = if let Some(payloads) = gathered {
            let mut acc: Vec<T> = wire::decode_pod_vec(&payloads[0])?;
            for (r, p) in payloads.iter().enumerate().skip(1) {
                let other: Vec<T> = wire::decode_pod_vec(p)?;
                if other.len() != acc.len() {
                    return Err(PipelineError::ImproperUse(format!(
                        "reduction buffer length mismatch: rank 0 has {}, rank {r} has {}",
                        acc.len(),
                        other.len()
                    )));
                }
                combine(&mut acc, &other);
            }
            self.broadcast_bytes(Some(wire::cast_slice(&acc)))?
        } else {
            self.broadcast_bytes(None)?
        };
        let decoded: Vec<T> = wire::decode_pod_vec(&result)?;
        if decoded.len() != buf.len() {
            return Err(PipelineError::ImproperUse(format!(
                "reduction buffer length mismatch: local {} vs broadcast {}",
                buf.len(),
                decoded.len()
            )));
        }
        buf.copy_from_slice(&decoded);
        Ok(())
    }

    // ---- reductions ----------------------------------------------------

    /// Synchronization point: no rank leaves before every rank arrives.
    pub fn barrier(&self) -> Result<(), PipelineError> {
        if self.size() == 1 {
            return Ok(());
        }
        self.gather_to_root(&[0u8])?;
        self.broadcast_bytes(if self.rank() == 0 { Some(&[0u8]) } else { None })?;
        Ok(())
    }

    /// Element-wise sum across all participants; every rank gets the
    /// result.
    pub fn sum_across_all<T>(&self, buf: &mut [T]) -> Result<(), PipelineError>
    where
        T: Pod + Num + Copy,
    {
        self.all_reduce_with(buf, |acc, other| {
            for (a, &b) in acc.iter_mut().zip(other) {
                *a = *a + b;
            }
        })
    }

    /// Element-wise minimum across all participants.
    pub fn min_across_all<T>(&self, buf: &mut [T]) -> Result<(), PipelineError>
    where
        T: Pod + PartialOrd + Copy,
    {
        self.all_reduce_with(buf, |acc, other| {
            for (a, &b) in acc.iter_mut().zip(other) {
                if b < *a {
                    *a = b;
                }
            }
        })
    }

    /// Element-wise maximum across all participants.
    pub fn max_across_all<T>(&self, buf: &mut [T]) -> Result<(), PipelineError>
    where
        T: Pod + PartialOrd + Copy,
    {
        self.all_reduce_with(buf, |acc, other| {
            for (a, &b) in acc.iter_mut().zip(other) {
                if b > *a {
                    *a = b;
                }
            }
        })
    }

    pub fn sum_f64(&self, v: f64) -> Result<f64, PipelineError> {
        let mut b = [v];
        self.sum_across_all(&mut b)?;
        Ok(b[0])
    }

    pub fn sum_i64(&self, v: i64) -> Result<i64, PipelineError> {
        let mut b = [v];
        self.sum_across_all(&mut b)?;
        Ok(b[0])
    }

    pub fn sum_usize(&self, v: usize) -> Result<usize, PipelineError> {
        Ok(self.sum_i64(v as i64)? as usize)
    }

    pub fn max_u64(&self, v: u64) -> Result<u64, PipelineError> {
        let mut b = [v];
        self.max_across_all(&mut b)?;
        Ok(b[0])
    }

    /// Reduce an interleaved `[min0, max0, min1, max1, ...]` buffer:
    /// pairwise min on even indices, max on odd.
    ///
    /// `alt_size` semantics:
    /// - `0`: use `buf.len()` directly; the length must be even.
    /// - `n > 0`: pad the buffer up to `n` with `(+inf, -inf)` sentinel
    ///   pairs before reducing, then truncate back. Used when
    ///   participants may disagree on array length and have agreed on a
    ///   common padded size out of band.
    /// - `-1`: first max-reduce the length itself so all participants
    ///   agree, then proceed as `> 0`.
    ///
    /// Sentinel pairs never win a comparison against real data.
    pub fn unify_min_max(&self, buf: &mut Vec<f64>, alt_size: i64) -> Result<(), PipelineError> {
        let original_len = buf.len();
        let target = match alt_size {
            0 => {
                if original_len % 2 != 0 {
                    return Err(PipelineError::ImproperUse(format!(
                        "unify_min_max: interleaved buffer length {original_len} is odd"
                    )));
                }
                original_len
            }
            n if n > 0 => n as usize,
            -1 => self.max_u64(original_len as u64)? as usize,
            n => {
                return Err(PipelineError::ImproperUse(format!(
                    "unify_min_max: alt_size {n} is not 0, -1, or positive"
                )));
            }
        };
        if target < original_len || target % 2 != 0 {
            return Err(PipelineError::ImproperUse(format!(
                "unify_min_max: padded size {target} incompatible with buffer length {original_len}"
            )));
        }
        while buf.len() < target {
            let sentinel = if buf.len() % 2 == 0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
            buf.push(sentinel);
        }
        self.all_reduce_with(buf, |acc, other| {
            for (i, (a, &b)) in acc.iter_mut().zip(other).enumerate() {
                if i % 2 == 0 {
                    if b < *a {
                        *a = b;
                    }
                } else if b > *a {
                    *a = b;
                }
            }
        })?;
        buf.truncate(original_len);
        Ok(())
    }

    /// Every participant learns whether *it* holds the global extreme.
    /// Ties break toward the lowest rank.
    pub fn this_processor_has_extreme_value(
        &self,
        value: f64,
        extreme: Extreme,
    ) -> Result<bool, PipelineError> {
        if self.size() == 1 {
            return Ok(true);
        }
        let gathered = self.gather_to_root(wire::cast_slice(&[value]))?;
        let winner = if let Some(payloads) = gathered {
            let mut best_rank = 0u64;
            let mut best: f64 = {
                let v: Vec<f64> = wire::decode_pod_vec(&payloads[0])?;
                v[0]
            };
            for (r, p) in payloads.iter().enumerate().skip(1) {
                let v: Vec<f64> = wire::decode_pod_vec(p)?;
                let better = match extreme {
                    Extreme::Min => v[0] < best,
                    Extreme::Max => v[0] > best,
                };
                if better {
                    best = v[0];
                    best_rank = r as u64;
                }
            }
            self.broadcast_bytes(Some(&best_rank.to_le_bytes()))?
        } else {
            self.broadcast_bytes(None)?
        };
        let mut off = 0;
        let winner = wire::take_u64(&winner, &mut off)?;
        Ok(winner == self.rank() as u64)
    }

    /// Element-wise maximum reduction onto rank 0 only. Returns whether
    /// *this* rank now holds the up-to-date buffer (true only on rank 0).
    pub fn collect_max_to_root<T>(&self, buf: &mut [T]) -> Result<bool, PipelineError>
    where
        T: Pod + PartialOrd + Copy,
    {
        if self.size() == 1 {
            return Ok(true);
        }
        if let Some(payloads) = self.gather_to_root(wire::cast_slice(buf))? {
            for (r, p) in payloads.iter().enumerate().skip(1) {
                let other: Vec<T> = wire::decode_pod_vec(p)?;
                if other.len() != buf.len() {
                    return Err(PipelineError::ImproperUse(format!(
                        "collect buffer length mismatch: rank 0 has {}, rank {r} has {}",
                        buf.len(),
                        other.len()
                    )));
                }
                for (a, &b) in buf.iter_mut().zip(&other) {
                    if b > *a {
                        *a = b;
                    }
                }
            }
        }
        Ok(self.rank() == 0)
    }

    // ---- broadcasts ----------------------------------------------------

    fn broadcast_pod_slice<T: Pod>(&self, buf: &mut [T]) -> Result<(), PipelineError> {
        if self.size() == 1 {
            return Ok(());
        }
        let bytes = if self.rank() == 0 {
            self.broadcast_bytes(Some(wire::cast_slice(buf)))?
        } else {
            self.broadcast_bytes(None)?
        };
        let decoded: Vec<T> = wire::decode_pod_vec(&bytes)?;
        if decoded.len() != buf.len() {
            return Err(PipelineError::WireFormat(format!(
                "broadcast length mismatch: local {} vs root {}",
                buf.len(),
                decoded.len()
            )));
        }
        buf.copy_from_slice(&decoded);
        Ok(())
    }

    fn broadcast_pod_vec<T: Pod>(&self, v: &mut Vec<T>) -> Result<(), PipelineError> {
        if self.size() == 1 {
            return Ok(());
        }
        let bytes = if self.rank() == 0 {
            self.broadcast_bytes(Some(wire::cast_slice(v)))?
        } else {
            self.broadcast_bytes(None)?
        };
        *v = wire::decode_pod_vec(&bytes)?;
        Ok(())
    }

    pub fn broadcast_u64(&self, v: &mut u64) -> Result<(), PipelineError> {
        let mut b = [*v];
        self.broadcast_pod_slice(&mut b)?;
        *v = b[0];
        Ok(())
    }

    pub fn broadcast_i64(&self, v: &mut i64) -> Result<(), PipelineError> {
        let mut b = [*v];
        self.broadcast_pod_slice(&mut b)?;
        *v = b[0];
        Ok(())
    }

    pub fn broadcast_f64(&self, v: &mut f64) -> Result<(), PipelineError> {
        let mut b = [*v];
        self.broadcast_pod_slice(&mut b)?;
        *v = b[0];
        Ok(())
    }

    pub fn broadcast_u64_vec(&self, v: &mut Vec<u64>) -> Result<(), PipelineError> {
        self.broadcast_pod_vec(v)
    }

    pub fn broadcast_i64_vec(&self, v: &mut Vec<i64>) -> Result<(), PipelineError> {
        self.broadcast_pod_vec(v)
    }

    pub fn broadcast_f64_vec(&self, v: &mut Vec<f64>) -> Result<(), PipelineError> {
        self.broadcast_pod_vec(v)
    }

    /// Non-root ranks are resized to the broadcast length.
    pub fn broadcast_usize_vec(&self, v: &mut Vec<usize>) -> Result<(), PipelineError> {
        let mut wide: Vec<u64> = v.iter().map(|&x| x as u64).collect();
        self.broadcast_pod_vec(&mut wide)?;
        *v = wide.into_iter().map(|x| x as usize).collect();
        Ok(())
    }

    pub fn broadcast_string(&self, s: &mut String) -> Result<(), PipelineError> {
        if self.size() == 1 {
            return Ok(());
        }
        let bytes = if self.rank() == 0 {
            self.broadcast_bytes(Some(s.as_bytes()))?
        } else {
            self.broadcast_bytes(None)?
        };
        *s = String::from_utf8(bytes)
            .map_err(|e| PipelineError::WireFormat(format!("invalid UTF-8: {e}")))?;
        Ok(())
    }

    pub fn broadcast_string_vec(&self, v: &mut Vec<String>) -> Result<(), PipelineError> {
        if self.size() == 1 {
            return Ok(());
        }
        let bytes = if self.rank() == 0 {
            let mut out = Vec::new();
            wire::put_u64(&mut out, v.len() as u64);
            for s in v.iter() {
                wire::put_str(&mut out, s);
            }
            self.broadcast_bytes(Some(&out))?
        } else {
            self.broadcast_bytes(None)?
        };
        let mut off = 0;
        let n = wire::take_u64(&bytes, &mut off)? as usize;
        let mut strings = Vec::with_capacity(n);
        for _ in 0..n {
            strings.push(wire::take_str(&bytes, &mut off)?);
        }
        *v = strings;
        Ok(())
    }

    pub fn broadcast_string_vec_vec(&self, v: &mut Vec<Vec<String>>) -> Result<(), PipelineError> {
        if self.size() == 1 {
            return Ok(());
        }
        let bytes = if self.rank() == 0 {
            let mut out = Vec::new();
            wire::put_u64(&mut out, v.len() as u64);
            for inner in v.iter() {
                wire::put_u64(&mut out, inner.len() as u64);
                for s in inner {
                    wire::put_str(&mut out, s);
                }
            }
            self.broadcast_bytes(Some(&out))?
        } else {
            self.broadcast_bytes(None)?
        };
        let mut off = 0;
        let n = wire::take_u64(&bytes, &mut off)? as usize;
        let mut outer = Vec::with_capacity(n);
        for _ in 0..n {
            let m = wire::take_u64(&bytes, &mut off)? as usize;
            let mut inner = Vec::with_capacity(m);
            for _ in 0..m {
                inner.push(wire::take_str(&bytes, &mut off)?);
            }
            outer.push(inner);
        }
        *v = outer;
        Ok(())
    }

    // ---- gathers to root -----------------------------------------------

    /// Some unknown subset of ranks hold a complete copy of `list`; ship
    /// one complete copy to rank 0 (from the lowest-ranked holder).
    /// Returns whether the calling rank now holds the authoritative list
    /// (true only on rank 0, and only if some rank held it).
    pub fn get_list_to_root(
        &self,
        list: &mut Vec<u64>,
        expected_total: usize,
    ) -> Result<bool, PipelineError> {
        let complete = list.len() == expected_total;
        if self.size() == 1 {
            return Ok(complete);
        }
        let mut flags = vec![0u8; 1];
        flags[0] = complete as u8;
        let gathered = self.gather_to_root(&flags)?;
        let owner = if let Some(payloads) = gathered {
            let owner = payloads
                .iter()
                .position(|p| p.first().copied() == Some(1))
                .map(|r| r as u64)
                .unwrap_or(u64::MAX);
            let b = self.broadcast_bytes(Some(&owner.to_le_bytes()))?;
            let mut off = 0;
            wire::take_u64(&b, &mut off)?
        } else {
            let b = self.broadcast_bytes(None)?;
            let mut off = 0;
            wire::take_u64(&b, &mut off)?
        };
        // Phase for the point-to-point ship; allocated on every rank so
        // the tag spaces stay aligned even when only two ranks use it.
        let t_ship = self.unique_tag();
        if owner == u64::MAX {
            log::debug!("get_list_to_root: no rank holds a complete list of {expected_total}");
            return Ok(false);
        }
        if owner == self.rank() as u64 && self.rank() != 0 {
            self.comm.isend(0, t_ship, wire::cast_slice(list)).wait();
        }
        if self.rank() == 0 && owner != 0 {
            let bytes = self.recv(owner as usize, t_ship, expected_total * 8)?;
            *list = wire::decode_pod_vec(&bytes)?;
        }
        Ok(self.rank() == 0)
    }

    /// Gather an opaque serializable attribute object from whichever rank
    /// has it onto rank 0, using a 3-message protocol per non-root rank
    /// (has-flag, size, payload). The lowest-ranked holder wins; rank 0's
    /// own copy, when present, takes precedence. Returns whether this
    /// rank now holds the attribute (true only on rank 0 when any rank
    /// had it).
    pub fn get_attribute_to_root<A: WireAttribute>(
        &self,
        attr: &mut Option<A>,
    ) -> Result<bool, PipelineError> {
        if self.size() == 1 {
            return Ok(attr.is_some());
        }
        let t_has = self.unique_tag();
        let t_size = self.unique_tag();
        let t_pay = self.unique_tag();
        if self.rank() != 0 {
            let (has, payload) = match attr {
                Some(a) => {
                    let mut out = Vec::with_capacity(a.encoded_len());
                    a.encode(&mut out);
                    (1u8, out)
                }
                None => (0u8, Vec::new()),
            };
            self.comm.isend(0, t_has, &[has]).wait();
            self.comm
                .isend(0, t_size, &(payload.len() as u64).to_le_bytes())
                .wait();
            self.comm.isend(0, t_pay, &payload).wait();
            return Ok(false);
        }
        for r in 1..self.size() {
            let has = self.recv(r, t_has, 1)?;
            let size_bytes = self.recv(r, t_size, wire::LEN_HEADER)?;
            let mut off = 0;
            let size = wire::take_u64(&size_bytes, &mut off)? as usize;
            let payload = self.recv(r, t_pay, size)?;
            // Drain every rank's messages; only decode the first holder.
            if attr.is_none() && has.first().copied() == Some(1) {
                *attr = Some(A::decode(&payload)?);
            }
        }
        Ok(attr.is_some())
    }

    /// Gather a fixed-size float buffer from whichever rank has it onto
    /// rank 0 (same 3-message protocol as `get_attribute_to_root`).
    /// `has` says whether the calling rank's buffer holds valid data.
    /// Returns whether this rank now holds valid data.
    pub fn get_float_array_to_root(
        &self,
        buf: &mut [f32],
        has: bool,
    ) -> Result<bool, PipelineError> {
        if self.size() == 1 {
            return Ok(has);
        }
        let t_has = self.unique_tag();
        let t_size = self.unique_tag();
        let t_pay = self.unique_tag();
        if self.rank() != 0 {
            let payload: &[u8] = if has { wire::cast_slice(buf) } else { &[] };
            self.comm.isend(0, t_has, &[has as u8]).wait();
            self.comm
                .isend(0, t_size, &(payload.len() as u64).to_le_bytes())
                .wait();
            self.comm.isend(0, t_pay, payload).wait();
            return Ok(false);
        }
        let mut filled = has;
        for r in 1..self.size() {
            let has_flag = self.recv(r, t_has, 1)?;
            let size_bytes = self.recv(r, t_size, wire::LEN_HEADER)?;
            let mut off = 0;
            let size = wire::take_u64(&size_bytes, &mut off)? as usize;
            let payload = self.recv(r, t_pay, size)?;
            if !filled && has_flag.first().copied() == Some(1) {
                if size != buf.len() * core::mem::size_of::<f32>() {
                    return Err(PipelineError::CommError {
                        neighbor: r,
                        detail: format!(
                            "float array size mismatch: expected {} bytes, got {size}",
                            buf.len() * 4
                        ),
                    });
                }
                let decoded: Vec<f32> = wire::decode_pod_vec(&payload)?;
                buf.copy_from_slice(&decoded);
                filled = true;
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    //! Size-1 identity properties; multi-rank behavior is covered by the
    //! `collective_multirank` integration tests.
    use super::*;
    use crate::comm::communicator::NoComm;

    fn serial() -> NoComm {
        NoComm
    }

    #[test]
    fn sum_of_one_is_itself() {
        let comm = serial();
        let coll = Collective::new(&comm);
        assert_eq!(coll.sum_f64(4.25).unwrap(), 4.25);
        assert_eq!(coll.sum_i64(-3).unwrap(), -3);
        let mut buf = [1.0f64, 2.0, 3.0];
        coll.sum_across_all(&mut buf).unwrap();
        assert_eq!(buf, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn unify_min_max_identity_at_size_one() {
        let comm = serial();
        let coll = Collective::new(&comm);
        let mut buf = vec![0.0, 1.0, -2.0, 5.0];
        coll.unify_min_max(&mut buf, 0).unwrap();
        assert_eq!(buf, vec![0.0, 1.0, -2.0, 5.0]);
    }

    #[test]
    fn unify_min_max_odd_size_is_improper_use() {
        let comm = serial();
        let coll = Collective::new(&comm);
        let mut buf = vec![0.0, 1.0, 2.0];
        let err = coll.unify_min_max(&mut buf, 0).unwrap_err();
        assert!(matches!(err, PipelineError::ImproperUse(_)));
    }

    #[test]
    fn unify_min_max_padding_truncates_back() {
        let comm = serial();
        let coll = Collective::new(&comm);
        let mut buf = vec![3.0, 4.0];
        coll.unify_min_max(&mut buf, 6).unwrap();
        assert_eq!(buf, vec![3.0, 4.0]);
    }

    #[test]
    fn broadcast_is_identity_at_size_one() {
        let comm = serial();
        let coll = Collective::new(&comm);
        let mut s = String::from("mesh");
        coll.broadcast_string(&mut s).unwrap();
        assert_eq!(s, "mesh");
        let mut v = vec![1u64, 2, 3];
        coll.broadcast_u64_vec(&mut v).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn extreme_value_trivially_mine_at_size_one() {
        let comm = serial();
        let coll = Collective::new(&comm);
        assert!(coll.this_processor_has_extreme_value(7.0, Extreme::Min).unwrap());
        assert!(coll.this_processor_has_extreme_value(7.0, Extreme::Max).unwrap());
    }

    #[test]
    fn collect_at_size_one_holds_result() {
        let comm = serial();
        let coll = Collective::new(&comm);
        let mut buf = [5.0f64];
        assert!(coll.collect_max_to_root(&mut buf).unwrap());
        assert_eq!(buf, [5.0]);
    }

    #[test]
    fn tags_are_monotone_and_wrap() {
        let comm = serial();
        let coll = Collective::new(&comm);
        let a = coll.unique_tag();
        let b = coll.unique_tag();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn get_list_identity_at_size_one() {
        let comm = serial();
        let coll = Collective::new(&comm);
        let mut list = vec![1u64, 2, 3];
        assert!(coll.get_list_to_root(&mut list, 3).unwrap());
        assert!(!coll.get_list_to_root(&mut list, 5).unwrap());
    }
}
