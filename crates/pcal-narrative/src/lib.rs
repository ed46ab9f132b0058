//! # pcal-narrative
//!
//! Answers a closed set of operator questions in plain language and scores
//! how safe the platform has been recently. Stateless: every narrative and
//! report is computed on demand from the other components.

mod compose;
pub mod generator;
pub mod render;
pub mod risk;

pub use generator::NarrativeGenerator;
pub use render::render_markdown;
