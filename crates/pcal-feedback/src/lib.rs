//! # pcal-feedback
//!
//! Closes the loop between platform memory and decision producers. A fixed
//! rule set turns findings into recommendations, and per-source confidence
//! multipliers are kept for producers to read back before they score their
//! next decision. Nothing here alters a producer directly.

pub mod feedback_loop;
pub mod rules;

pub use feedback_loop::FeedbackLoop;
pub use rules::{RuleHit, RuleInputs, RuleSettings};
