//! # pcal-memory
//!
//! Long-lived platform memory: recurring decision patterns, the incident
//! provenance graph, repeated mistakes and point-in-time snapshots.

pub mod graph;
pub mod memory;
mod patterns;

pub use graph::ProvenanceGraph;
pub use memory::PlatformMemory;
