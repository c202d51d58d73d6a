//! One protocol: owner, registration state, condition store, implementations.
//!
//! State lives in a copy-on-write snapshot. Writers clone the current
//! snapshot, apply the whole mutation and swap it in under the write lock;
//! readers clone the `Arc` and evaluate without holding any lock, so a
//! validation never sees half of a batch and predicates never run under the
//! lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use alloy_primitives::Address;
use bytes::Bytes;

use callguard_core::error::{CallGuardError, Result};
use callguard_core::plugin::Implementation;

use super::RegistrationState;
use crate::condition::{Condition, ConditionSpec};
use crate::config::schema::RegistrationPolicy;
use crate::export::{ConditionRecord, ConditionsReport, ProtocolSummary};
use crate::policy::{self, Decision, DenyReason};
use crate::store::ConditionStore;

/// Immutable view of a protocol at one point in time.
#[derive(Clone)]
pub struct ProtocolSnapshot {
    state: RegistrationState,
    store: ConditionStore,
    implementations: BTreeMap<String, Arc<dyn Implementation>>,
}

impl ProtocolSnapshot {
    fn new(state: RegistrationState) -> Self {
        Self {
            state,
            store: ConditionStore::new(),
            implementations: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn store(&self) -> &ConditionStore {
        &self.store
    }

    pub fn implementation(&self, id: &str) -> Option<&Arc<dyn Implementation>> {
        self.implementations.get(id)
    }

    pub fn implementation_ids(&self) -> Vec<String> {
        self.implementations.keys().cloned().collect()
    }

    /// The condition's implementation must be set and answer every predicate.
    fn check_bindings(&self, condition: &Condition) -> Result<()> {
        let implementation = self
            .implementations
            .get(condition.implementation_id())
            .ok_or_else(|| {
                CallGuardError::UnknownImplementation(condition.implementation_id().to_string())
            })?;

        for req in condition.requirements() {
            if !implementation.has_predicate(&req.predicate) {
                return Err(CallGuardError::UnknownPredicate(format!(
                    "{} (implementation {}, condition {})",
                    req.predicate,
                    condition.implementation_id(),
                    condition.id()
                )));
            }
        }
        Ok(())
    }

    fn add(&mut self, spec: ConditionSpec) -> Result<Arc<Condition>> {
        let condition = self.store.add(spec)?;
        self.check_bindings(&condition)?;
        Ok(condition)
    }

    fn add_batch(&mut self, specs: Vec<ConditionSpec>) -> Result<Vec<Arc<Condition>>> {
        let added = self.store.add_batch(specs)?;
        for condition in &added {
            self.check_bindings(condition)?;
        }
        Ok(added)
    }
}

pub struct ProtocolEntry {
    origin_name: String,
    owner: Address,
    snapshot: RwLock<Arc<ProtocolSnapshot>>,
}

impl fmt::Debug for ProtocolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolEntry")
            .field("origin_name", &self.origin_name)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl ProtocolEntry {
    pub(crate) fn new(origin_name: &str, owner: Address, state: RegistrationState) -> Self {
        Self {
            origin_name: origin_name.to_string(),
            owner,
            snapshot: RwLock::new(Arc::new(ProtocolSnapshot::new(state))),
        }
    }

    pub fn name(&self) -> &str {
        &self.origin_name
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Current snapshot. `None` only if a writer panicked mid-swap.
    pub fn snapshot(&self) -> Option<Arc<ProtocolSnapshot>> {
        self.snapshot.read().ok().map(|guard| Arc::clone(&*guard))
    }

    pub fn state(&self) -> RegistrationState {
        self.snapshot()
            .map(|s| s.state())
            .unwrap_or(RegistrationState::Unregistered)
    }

    fn authorize(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            tracing::warn!(origin = %self.origin_name, %caller, "mutation by non-owner rejected");
            return Err(CallGuardError::Unauthorized(format!(
                "{caller} is not the owner of {}",
                self.origin_name
            )));
        }
        Ok(())
    }

    /// Owner-only copy-on-write mutation. Nothing is published if `f` fails.
    fn mutate<T>(
        &self,
        caller: &Address,
        f: impl FnOnce(&mut ProtocolSnapshot) -> Result<T>,
    ) -> Result<T> {
        self.authorize(caller)?;
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| CallGuardError::Internal("protocol state lock poisoned".into()))?;
        let mut next = ProtocolSnapshot::clone(&guard);
        let out = f(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }

    /// Pending -> Registered.
    pub(crate) fn finish(&self, caller: &Address, policy: &RegistrationPolicy) -> Result<()> {
        let origin = self.origin_name.as_str();
        self.mutate(caller, |s| match s.state {
            RegistrationState::Pending => {
                if policy.require_conditions_on_finish && s.store.is_empty() {
                    return Err(CallGuardError::InvalidState(format!(
                        "{origin} has no conditions; add at least one before finishing registration"
                    )));
                }
                s.state = RegistrationState::Registered;
                Ok(())
            }
            RegistrationState::Registered => Err(CallGuardError::AlreadyRegistered(origin.to_string())),
            RegistrationState::Unregistered => Err(CallGuardError::InvalidState(format!(
                "{origin} has not started registration"
            ))),
        })?;
        tracing::info!(origin, "registration finished");
        Ok(())
    }

    /// Append one condition; returns its id.
    pub fn add_condition(&self, caller: &Address, spec: ConditionSpec) -> Result<String> {
        let condition = self.mutate(caller, |s| s.add(spec))?;
        tracing::info!(origin = %self.origin_name, condition = %condition.id(), "condition added");
        Ok(condition.id().to_string())
    }

    /// Append a batch atomically; returns the ids in order.
    pub fn add_conditions(&self, caller: &Address, specs: Vec<ConditionSpec>) -> Result<Vec<String>> {
        let ids = self.mutate(caller, |s| {
            s.add_batch(specs)
                .map(|added| added.iter().map(|c| c.id().to_string()).collect::<Vec<_>>())
        })?;
        tracing::info!(origin = %self.origin_name, added = ids.len(), "conditions added");
        Ok(ids)
    }

    pub fn delete_condition(&self, caller: &Address, id: &str) -> Result<()> {
        self.mutate(caller, |s| s.store.delete(id).map(|_| ()))?;
        tracing::info!(origin = %self.origin_name, condition = id, "condition deleted");
        Ok(())
    }

    pub fn delete_all_conditions(&self, caller: &Address) -> Result<()> {
        self.mutate(caller, |s| {
            s.store.clear_all();
            Ok(())
        })?;
        tracing::info!(origin = %self.origin_name, "all conditions deleted");
        Ok(())
    }

    /// Set or replace the implementation registered under `id`.
    ///
    /// Replacing an implementation does not re-check stored conditions; a
    /// predicate that disappears denies at evaluation time.
    pub fn set_implementation(
        &self,
        caller: &Address,
        id: &str,
        implementation: Arc<dyn Implementation>,
    ) -> Result<()> {
        if id.trim().is_empty() {
            return Err(CallGuardError::BadRequest("implementation id must be non-empty".into()));
        }
        self.mutate(caller, |s| {
            s.implementations.insert(id.to_string(), implementation);
            Ok(())
        })?;
        tracing::info!(origin = %self.origin_name, implementation = id, "implementation set");
        Ok(())
    }

    pub fn implementation_by_id(&self, id: &str) -> Option<Arc<dyn Implementation>> {
        self.snapshot()?.implementation(id).cloned()
    }

    pub fn implementation_ids(&self) -> Vec<String> {
        self.snapshot()
            .map(|s| s.implementation_ids())
            .unwrap_or_default()
    }

    pub fn conditions_length(&self) -> usize {
        self.snapshot().map(|s| s.store().len()).unwrap_or(0)
    }

    pub fn condition(&self, id: &str) -> Option<Arc<Condition>> {
        self.snapshot()?.store().get(id).cloned()
    }

    /// Full structured listing of the stored conditions.
    pub fn conditions_export(&self) -> Result<ConditionsReport> {
        let snapshot = self.unavailable_as_internal()?;
        Ok(ConditionsReport {
            origin_name: self.origin_name.clone(),
            owner: self.owner,
            state: snapshot.state(),
            conditions_length: snapshot.store().len(),
            conditions: snapshot.store().iter().map(|c| ConditionRecord::from(&**c)).collect(),
        })
    }

    /// `conditions_export` as pretty-printed JSON.
    pub fn conditions_json(&self) -> Result<String> {
        let report = self.conditions_export()?;
        serde_json::to_string_pretty(&report)
            .map_err(|e| CallGuardError::Internal(format!("serialize conditions failed: {e}")))
    }

    pub fn summary(&self) -> Result<ProtocolSummary> {
        let snapshot = self.unavailable_as_internal()?;
        Ok(ProtocolSummary {
            origin_name: self.origin_name.clone(),
            owner: self.owner,
            state: snapshot.state(),
            conditions_length: snapshot.store().len(),
            implementations: snapshot.implementation_ids(),
        })
    }

    pub fn decide(&self, target: &Address, calldata: &Bytes) -> Decision {
        match self.snapshot() {
            Some(snapshot) => policy::decide(&snapshot, &self.origin_name, target, calldata),
            None => {
                tracing::warn!(origin = %self.origin_name, "protocol state unavailable; denying");
                Decision::Deny(DenyReason::Unavailable)
            }
        }
    }

    fn unavailable_as_internal(&self) -> Result<Arc<ProtocolSnapshot>> {
        self.snapshot()
            .ok_or_else(|| CallGuardError::Internal("protocol state lock poisoned".into()))
    }
}
