//! Address allow-list implementation.
//!
//! Each named set is one predicate (`isVault`, `isZapInContract`, ...) that
//! holds for the target, or an address argument, when the address is a member.
//! Membership is maintained by the protocol owner through `set_member`, outside
//! the condition store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use alloy_primitives::Address;

use callguard_core::error::{CallGuardError, EvalError, Result};
use callguard_core::plugin::{Implementation, Subject};

#[derive(Debug, Default)]
pub struct AddressSets {
    sets: RwLock<BTreeMap<String, BTreeSet<Address>>>,
}

impl AddressSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declare a predicate with its initial members.
    pub fn with_set<I>(self, predicate: &str, members: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        if let Ok(mut sets) = self.sets.write() {
            sets.entry(predicate.to_string()).or_default().extend(members);
        }
        self
    }

    /// Add or remove `address` from `predicate`'s set. Declares the predicate
    /// if it does not exist yet.
    pub fn set_member(&self, predicate: &str, address: Address, allowed: bool) -> Result<()> {
        if predicate.trim().is_empty() {
            return Err(CallGuardError::BadRequest("predicate name must be non-empty".into()));
        }
        let mut sets = self
            .sets
            .write()
            .map_err(|_| CallGuardError::Internal("address set lock poisoned".into()))?;
        let set = sets.entry(predicate.to_string()).or_default();
        if allowed {
            set.insert(address);
        } else {
            set.remove(&address);
        }
        tracing::debug!(predicate, %address, allowed, "address set updated");
        Ok(())
    }

    pub fn is_member(&self, predicate: &str, address: &Address) -> bool {
        self.sets
            .read()
            .map(|sets| sets.get(predicate).is_some_and(|s| s.contains(address)))
            .unwrap_or(false)
    }

    pub fn members(&self, predicate: &str) -> Vec<Address> {
        self.sets
            .read()
            .ok()
            .and_then(|sets| sets.get(predicate).map(|s| s.iter().copied().collect()))
            .unwrap_or_default()
    }
}

impl Implementation for AddressSets {
    fn predicate_names(&self) -> Vec<String> {
        self.sets
            .read()
            .map(|sets| sets.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn has_predicate(&self, name: &str) -> bool {
        self.sets
            .read()
            .map(|sets| sets.contains_key(name))
            .unwrap_or(false)
    }

    fn check(&self, predicate: &str, subject: Subject<'_>) -> std::result::Result<bool, EvalError> {
        let address = subject.as_address().ok_or_else(|| EvalError::TypeMismatch {
            predicate: predicate.to_string(),
            expected: "address",
        })?;
        // Poisoned lock: deny.
        let Ok(sets) = self.sets.read() else {
            return Ok(false);
        };
        let set = sets
            .get(predicate)
            .ok_or_else(|| EvalError::UnknownPredicate(predicate.to_string()))?;
        Ok(set.contains(address))
    }
}
