//! callguard gateway library entry.
//!
//! Condition model and store, the validation engine, the protocol registry,
//! built-in implementations, config bootstrap and the HTTP surface. Consumed
//! by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod condition;
pub mod config;
pub mod export;
pub mod obs;
pub mod ops;
pub mod plugins;
pub mod policy;
pub mod registry;
pub mod router;
pub mod store;
pub mod transport;

pub use condition::{Condition, ConditionSpec, Requirement, RequirementKind};
pub use policy::{Decision, DenyReason};
pub use registry::{ProtocolEntry, RegistrationState, Registry};
