//! Implementation plug-in contract.
//!
//! An implementation exposes named boolean predicates. A requirement names one
//! predicate and applies it either to the call target or to one decoded
//! argument. Predicates are registered in a table at construction time and
//! resolved by name; a name that was never registered is an error, never an
//! implicit allow.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;

use crate::abi::Value;
use crate::error::EvalError;

/// What a predicate is applied to.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// The call's target address.
    Target(&'a Address),
    /// One decoded argument.
    Param(&'a Value),
}

impl<'a> Subject<'a> {
    pub fn as_address(&self) -> Option<&'a Address> {
        match self {
            Subject::Target(address) => Some(address),
            Subject::Param(value) => value.as_address(),
        }
    }
}

/// Provider of named predicates. Predicates must be side-effect free and must
/// not call back into the registry.
pub trait Implementation: Send + Sync {
    /// Names of every predicate this implementation answers.
    fn predicate_names(&self) -> Vec<String>;

    fn has_predicate(&self, name: &str) -> bool {
        self.predicate_names().iter().any(|n| n == name)
    }

    /// Evaluate `predicate` against `subject`.
    fn check(&self, predicate: &str, subject: Subject<'_>) -> Result<bool, EvalError>;
}

type AddressFn = dyn Fn(&Address) -> bool + Send + Sync;
type ValueFn = dyn Fn(&Value) -> bool + Send + Sync;

#[derive(Clone)]
enum Predicate {
    /// Accepts the target or an address-typed argument.
    Address(Arc<AddressFn>),
    /// Accepts any decoded value; a target is presented as `Value::Address`.
    Value(Arc<ValueFn>),
}

/// Implementation backed by a name -> closure table.
#[derive(Clone, Default)]
pub struct PredicateSet {
    predicates: BTreeMap<String, Predicate>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address predicate.
    pub fn address<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Address) -> bool + Send + Sync + 'static,
    {
        self.predicates
            .insert(name.to_string(), Predicate::Address(Arc::new(f)));
        self
    }

    /// Register a predicate over arbitrary decoded values.
    pub fn value<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.predicates
            .insert(name.to_string(), Predicate::Value(Arc::new(f)));
        self
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Debug for PredicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateSet")
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Implementation for PredicateSet {
    fn predicate_names(&self) -> Vec<String> {
        self.predicates.keys().cloned().collect()
    }

    fn has_predicate(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    fn check(&self, predicate: &str, subject: Subject<'_>) -> Result<bool, EvalError> {
        let entry = self
            .predicates
            .get(predicate)
            .ok_or_else(|| EvalError::UnknownPredicate(predicate.to_string()))?;

        match (entry, subject) {
            (Predicate::Address(f), subject) => {
                let address = subject.as_address().ok_or_else(|| EvalError::TypeMismatch {
                    predicate: predicate.to_string(),
                    expected: "address",
                })?;
                Ok(f(address))
            }
            (Predicate::Value(f), Subject::Target(address)) => Ok(f(&Value::Address(*address))),
            (Predicate::Value(f), Subject::Param(value)) => Ok(f(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use alloy_primitives::U256;

    fn vault() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn set() -> PredicateSet {
        let v = vault();
        PredicateSet::new()
            .address("isVault", move |a| *a == v)
            .value("isNonZero", |value| value.as_uint().is_some_and(|u| !u.is_zero()))
    }

    #[test]
    fn address_predicate_applies_to_target_and_param() {
        let set = set();
        assert!(set.check("isVault", Subject::Target(&vault())).unwrap());
        assert!(!set.check("isVault", Subject::Target(&Address::ZERO)).unwrap());
        assert!(set
            .check("isVault", Subject::Param(&Value::Address(vault())))
            .unwrap());
    }

    #[test]
    fn address_predicate_rejects_non_address_param() {
        let err = set()
            .check("isVault", Subject::Param(&Value::Uint(U256::from(1u8))))
            .unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }

    #[test]
    fn unknown_predicate_is_an_error() {
        let err = set().check("isMarket", Subject::Target(&vault())).unwrap_err();
        assert_eq!(err, EvalError::UnknownPredicate("isMarket".into()));
    }

    #[test]
    fn value_predicate_sees_decoded_values() {
        let set = set();
        assert!(set
            .check("isNonZero", Subject::Param(&Value::Uint(U256::from(3u8))))
            .unwrap());
        assert!(!set.check("isNonZero", Subject::Target(&vault())).unwrap());
        assert_eq!(set.predicate_names(), vec!["isNonZero", "isVault"]);
    }
}
