//! # pcal-authority
//!
//! Reconstructs who is responsible for a decision. Approvals and overrides
//! are recorded here and joined with the decision ledger on demand; nothing
//! about a decision is ever written back to the ledger.

mod accountability;
pub mod resolver;

pub use resolver::AuthorityChainResolver;
