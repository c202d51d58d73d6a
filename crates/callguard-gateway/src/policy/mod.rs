//! Validation layer: requirement evaluation and the per-protocol decision.
//!
//! Default deny: unknown protocols, inactive registrations, unknown selectors,
//! undecodable calldata and predicate errors all resolve to `Decision::Deny`.

pub mod engine;
pub mod evaluator;

pub use engine::{decide, Decision, DenyReason};
pub use evaluator::evaluate;
