//! Thin façade over point-to-point message passing.
//!
//! Messages are contiguous byte slices. All handles are waitable but
//! non-blocking; the collective layer calls `.wait()` before it trusts a
//! buffer. Backends: [`NoComm`] for serial runs (rank 0 of 1, every
//! collective degenerates to identity) and [`LocalComm`] for in-process
//! multi-rank execution (one thread per rank over a shared mailbox), used
//! by the multi-participant tests.

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This participant's index in `[0, size)`.
    fn rank(&self) -> usize;
    /// Number of participants.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of exactly `len` bytes from `peer`. The payload
    /// comes back through [`Wait::wait`].
    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for pure serial runs and unit tests.
///
/// The collective layer short-circuits before any send/receive at size 1,
/// so these methods are never reached in practice.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _len: usize) {}
}

type Key = (usize, usize, u16); // (src, dst, tag)

/// In-process multi-rank communicator over a shared mailbox.
///
/// A group of `LocalComm` handles shares one mailbox; each handle is one
/// rank, expected to run on its own thread. State is owned by the group
/// (no process-wide statics), so independent groups in one test binary do
/// not interfere.
#[derive(Clone, Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<DashMap<Key, Bytes>>,
}

impl LocalComm {
    /// Create a communicator group of `size` ranks sharing one mailbox.
    pub fn group(size: usize) -> Vec<LocalComm> {
        assert!(size > 0, "communicator group must have at least one rank");
        let mailbox = Arc::new(DashMap::new());
        (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

/// Receive handle backed by a polling thread.
pub struct LocalHandle {
    buf: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.buf.lock().take()
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        // Buffered send: completes immediately, the mailbox holds the data
        // until the matching receive consumes it.
        self.mailbox
            .insert((self.rank, peer, tag), Bytes::from(buf.to_vec()));
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> LocalHandle {
        let key = (peer, self.rank, tag);
        let mailbox = Arc::clone(&self.mailbox);
        let buf = Arc::new(Mutex::new(None));
        let buf_clone = Arc::clone(&buf);
        let handle = std::thread::spawn(move || {
            loop {
                if let Some((_, bytes)) = mailbox.remove(&key) {
                    *buf_clone.lock() = Some(bytes[..len.min(bytes.len())].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            buf,
            handle: Some(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_comm_is_rank_zero_of_one() {
        let c = NoComm;
        assert_eq!(c.rank(), 0);
        assert_eq!(c.size(), 1);
        let h = c.isend(0, 1, &[1, 2, 3]);
        assert!(h.wait().is_none());
    }

    #[test]
    fn local_roundtrip_two_ranks() {
        let group = LocalComm::group(2);
        let c0 = group[0].clone();
        let c1 = group[1].clone();

        let recv = c1.irecv(0, 7, 4);
        c0.isend(1, 7, &[1, 2, 3, 4]);
        let data = recv.wait().expect("expected data from rank 0");
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn groups_are_isolated() {
        let a = LocalComm::group(2);
        let b = LocalComm::group(2);
        a[0].isend(1, 3, &[9]);
        // The message sits in group a's mailbox; group b sees nothing.
        let recv = a[1].irecv(0, 3, 1);
        assert_eq!(recv.wait().unwrap(), vec![9]);
        assert!(b[1].mailbox.is_empty());
    }

    #[test]
    fn tags_do_not_cross() {
        let group = LocalComm::group(2);
        group[0].isend(1, 1, &[1]);
        group[0].isend(1, 2, &[2]);
        let r2 = group[1].irecv(0, 2, 1);
        let r1 = group[1].irecv(0, 1, 1);
        assert_eq!(r2.wait().unwrap(), vec![2]);
        assert_eq!(r1.wait().unwrap(), vec![1]);
    }
}
