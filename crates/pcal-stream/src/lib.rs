//! # pcal-stream
//!
//! The decision stream: an append-only ledger of every governance decision,
//! bounded by `max_decisions` with oldest-first eviction. Every other PCAL
//! component reads from it.

pub mod signature;
pub mod stream;

pub use signature::{compute_signature, verify_signature};
pub use stream::DecisionStream;
