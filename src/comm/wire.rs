//! Fixed little-endian wire helpers for the collective layer.
//!
//! Everything the collective layer ships point-to-point is either a Pod
//! slice (cast in place) or a length-prefixed byte stream built with the
//! `put_*`/`take_*` codec below. All multi-byte integers are
//! little-endian on the wire.

use crate::pipeline_error::PipelineError;
use bytemuck::Pod;
use static_assertions::const_assert_eq;

/// Size of the fixed length header that precedes every variable-length
/// payload.
pub const LEN_HEADER: usize = core::mem::size_of::<u64>();
const_assert_eq!(LEN_HEADER, 8);

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Decode a byte payload into an owned Pod vector.
///
/// # Errors
/// `WireFormat` if the payload length is not a multiple of the element
/// size.
pub fn decode_pod_vec<T: Pod>(bytes: &[u8]) -> Result<Vec<T>, PipelineError> {
    let elem = core::mem::size_of::<T>();
    if elem == 0 || bytes.len() % elem != 0 {
        return Err(PipelineError::WireFormat(format!(
            "payload of {} bytes is not a whole number of {}-byte elements",
            bytes.len(),
            elem
        )));
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

pub fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn take_u64(buf: &[u8], off: &mut usize) -> Result<u64, PipelineError> {
    let end = *off + 8;
    let bytes = buf.get(*off..end).ok_or_else(|| {
        PipelineError::WireFormat(format!("truncated u64 at offset {}", *off))
    })?;
    *off = end;
    Ok(u64::from_le_bytes(bytes.try_into().expect("8-byte slice")))
}

pub fn put_str(out: &mut Vec<u8>, s: &str) {
    put_u64(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

pub fn take_str(buf: &[u8], off: &mut usize) -> Result<String, PipelineError> {
    let len = take_u64(buf, off)? as usize;
    let end = *off + len;
    let bytes = buf.get(*off..end).ok_or_else(|| {
        PipelineError::WireFormat(format!("truncated string of {len} bytes at offset {}", *off))
    })?;
    *off = end;
    let s = std::str::from_utf8(bytes)
        .map_err(|e| PipelineError::WireFormat(format!("invalid UTF-8: {e}")))?;
    Ok(s.to_string())
}

/// The attribute-group serialization contract: anything gathered through
/// [`Collective::get_attribute_to_root`](crate::comm::collective::Collective::get_attribute_to_root)
/// must encode itself to a byte buffer and decode back.
pub trait WireAttribute: Sized {
    /// Exact number of bytes `encode` will append.
    fn encoded_len(&self) -> usize;
    /// Append this object's wire form to `out`.
    fn encode(&self, out: &mut Vec<u8>);
    /// Decode from a payload produced by `encode`.
    fn decode(buf: &[u8]) -> Result<Self, PipelineError>;
}
