//! # pcal-core
//!
//! Foundation crate for the Platform Command & Accountability Layer.
//! Defines the decision model, derived governance entities, configuration,
//! the error type and the clock abstraction shared by every other crate.

pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PcalConfig;
pub use errors::{PcalError, PcalResult};
