//! # pcal
//!
//! Platform Command & Accountability Layer.
//!
//! Records every governance decision the platform makes, reconstructs who
//! was responsible for it, remembers recurring risk, links incidents back to
//! their causes and feeds confidence adjustments back to decision producers.
//! The layer is advisory: it never makes or vetoes a decision.
//!
//! [`PcalRuntime`] wires the five components together from one validated
//! [`PcalConfig`] and one shared [`Clock`].

pub mod observability;
pub mod runtime;

pub use pcal_authority::AuthorityChainResolver;
pub use pcal_core::models;
pub use pcal_core::{Clock, ManualClock, PcalConfig, PcalError, PcalResult, SystemClock};
pub use pcal_feedback::FeedbackLoop;
pub use pcal_memory::PlatformMemory;
pub use pcal_narrative::{render_markdown, NarrativeGenerator};
pub use pcal_stream::{verify_signature, DecisionStream};
pub use runtime::{MaintenanceReport, PcalRuntime};
