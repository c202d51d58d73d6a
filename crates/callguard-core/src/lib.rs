//! callguard core: ABI calldata codec, the implementation plug-in contract, and
//! the shared error surface.
//!
//! This crate defines everything that touches raw call payloads and the
//! interface predicate providers implement. It carries no transport or runtime
//! dependencies so it can be reused by the gateway, by wallets that build
//! calldata, and by plug-in crates.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed calldata surfaces as `DecodeError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod abi;
pub mod error;
pub mod plugin;

/// Shared result type.
pub use error::{CallGuardError, Result};
