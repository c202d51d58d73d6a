//! Built-in implementations.

pub mod address_sets;

pub use address_sets::AddressSets;
