//! Per-node protocol engine for a reverse-path multicast overlay built on
//! top of a distance-vector unicast substrate: neighbor liveness (HELLO),
//! separately-computed in/out hop distances (IN-DISTANCE, DVECTOR), and
//! soft-state multicast trees refreshed by reverse-path JOINs (JOIN, DATA).
//!
//! This crate is the core only: it performs no file or network I/O and owns
//! no clock. [`engine::Engine`] is a pure `Protocol<NodeEvent>` — see
//! `src/bin/node.rs` for the runtime shell that drives it over a real file
//! transport, and [`simulate::Simulate`] for an in-process harness used by
//! tests.

pub mod config;
pub mod distance;
pub mod engine;
pub mod message;
pub mod multicast;
pub mod protocol;
pub mod simulate;
pub mod transport;
pub mod unicast;

pub use distance::Distance;
pub use engine::{Engine, EngineConfig, Mode, NodeEffect, NodeEvent};
pub use message::{CodecError, Message};
pub use multicast::MulticastTable;
pub use protocol::Protocol;
pub use simulate::Simulate;
pub use unicast::UnicastTable;

/// Node identifiers are integers in `[0, MAX_NODES)`, matching `node.py`'s
/// fixed-size routing-table arrays.
pub const MAX_NODES: usize = 10;
