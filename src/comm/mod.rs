//! Parallel collective layer: communicator façade, wire codec, and
//! collective operations.
//!
//! Every other component may call into this module; it carries no
//! pipeline-specific knowledge. All collectives are identity operations
//! when running with a single participant, so pipeline code is written
//! once and runs unchanged serial or distributed.

pub mod collective;
pub mod communicator;
pub mod wire;

pub use collective::{Collective, Extreme};
pub use communicator::{Communicator, LocalComm, NoComm, Wait};
pub use wire::WireAttribute;
