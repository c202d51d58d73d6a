//! Multi-tenant protocol registry.
//!
//! Maps an origin name to its `ProtocolEntry` and drives the registration
//! state machine `Unregistered -> Pending -> Registered`. With
//! `RegistrationMode::SinglePhase` the middle state is skipped. Entries are
//! never removed.

pub mod entry;

use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use callguard_core::error::{CallGuardError, Result};

pub use crate::config::schema::{RegistrationMode, RegistrationPolicy};
use crate::policy::{Decision, DenyReason};
pub use entry::{ProtocolEntry, ProtocolSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationState {
    Unregistered,
    Pending,
    Registered,
}

impl RegistrationState {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationState::Unregistered => "unregistered",
            RegistrationState::Pending => "pending",
            RegistrationState::Registered => "registered",
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory of protocols. Share via `Arc`.
#[derive(Debug, Default)]
pub struct Registry {
    protocols: DashMap<String, Arc<ProtocolEntry>>,
    policy: RegistrationPolicy,
}

impl Registry {
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self {
            protocols: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &RegistrationPolicy {
        &self.policy
    }

    /// Create the protocol with an empty store.
    ///
    /// Two-phase mode leaves it `Pending`; single-phase mode activates it
    /// immediately.
    pub fn start_registration(&self, origin_name: &str, owner: Address) -> Result<Arc<ProtocolEntry>> {
        let origin_name = origin_name.trim();
        if origin_name.is_empty() {
            return Err(CallGuardError::BadRequest("origin name must be non-empty".into()));
        }

        let state = match self.policy.mode {
            RegistrationMode::TwoPhase => RegistrationState::Pending,
            RegistrationMode::SinglePhase => RegistrationState::Registered,
        };

        match self.protocols.entry(origin_name.to_string()) {
            Entry::Occupied(_) => Err(CallGuardError::AlreadyRegistered(origin_name.to_string())),
            Entry::Vacant(slot) => {
                let entry = Arc::new(ProtocolEntry::new(origin_name, owner, state));
                slot.insert(Arc::clone(&entry));
                tracing::info!(origin = origin_name, %owner, %state, "registration started");
                Ok(entry)
            }
        }
    }

    /// Owner-only `Pending -> Registered`.
    pub fn finish_registration(&self, origin_name: &str, caller: &Address) -> Result<()> {
        self.resolve_store(origin_name)?.finish(caller, &self.policy)
    }

    /// Entry for mutations and reads. `NotFound` if never registered.
    pub fn resolve_store(&self, origin_name: &str) -> Result<Arc<ProtocolEntry>> {
        self.protocols
            .get(origin_name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| CallGuardError::NotFound(origin_name.to_string()))
    }

    pub fn owner_of(&self, origin_name: &str) -> Result<Address> {
        Ok(self.resolve_store(origin_name)?.owner())
    }

    pub fn registration_state(&self, origin_name: &str) -> RegistrationState {
        self.protocols
            .get(origin_name)
            .map(|e| e.value().state())
            .unwrap_or(RegistrationState::Unregistered)
    }

    pub fn is_registered(&self, origin_name: &str) -> bool {
        self.registration_state(origin_name) == RegistrationState::Registered
    }

    /// Sorted origin names.
    pub fn origin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.protocols.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    pub fn decide(&self, origin_name: &str, target: &Address, calldata: &Bytes) -> Decision {
        // Release the shard guard before predicates run.
        let entry = self.protocols.get(origin_name).map(|e| Arc::clone(e.value()));
        match entry {
            Some(entry) => entry.decide(target, calldata),
            None => {
                tracing::debug!(origin = origin_name, "unknown protocol");
                Decision::Deny(DenyReason::UnknownProtocol)
            }
        }
    }

    /// `true` iff some condition for the call's selector fully matches.
    /// Never errors: every failure is a deny.
    pub fn validate(&self, origin_name: &str, target: &Address, calldata: &Bytes) -> bool {
        self.decide(origin_name, target, calldata).is_allowed()
    }
}
