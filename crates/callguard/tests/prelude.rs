//! End-to-end use through the facade with a closure-backed implementation.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use alloy_primitives::{Address, U256};

use callguard::prelude::*;

fn owner() -> Address {
    Address::repeat_byte(0x0e)
}
fn market() -> Address {
    Address::repeat_byte(0xcc)
}

fn markets() -> Arc<PredicateSet> {
    let m = market();
    Arc::new(
        PredicateSet::new()
            .address("isMarket", move |a| *a == m)
            .value("isSmallAmount", |v| {
                v.as_uint().is_some_and(|u| *u <= U256::from(1_000_000u64))
            }),
    )
}

fn mint(amount: u64) -> bytes::Bytes {
    let sig = MethodSignature::parse("mint", &["uint256".to_string()]).unwrap();
    encode_call(&sig, &[Value::Uint(U256::from(amount))]).unwrap()
}

#[test]
fn closure_predicates_gate_target_and_value() {
    let registry = Registry::default();
    let entry = registry.start_registration("iron-bank", owner()).unwrap();
    entry.set_implementation(&owner(), "markets", markets()).unwrap();
    entry
        .add_condition(
            &owner(),
            ConditionSpec::new("markets", "mint", &["uint256"])
                .with_id("mint-small")
                .require(Requirement::target("isMarket"))
                .require(Requirement::param("isSmallAmount", 0)),
        )
        .unwrap();
    registry.finish_registration("iron-bank", &owner()).unwrap();

    assert_eq!(mint(5).len(), 36);
    assert_eq!(
        registry.decide("iron-bank", &market(), &mint(5)),
        Decision::Allow {
            condition_id: "mint-small".into()
        }
    );
    assert!(!registry.validate("iron-bank", &market(), &mint(2_000_000)));
    assert!(!registry.validate("iron-bank", &Address::ZERO, &mint(5)));
}

#[test]
fn address_predicate_on_numeric_argument_denies() {
    let registry = Registry::default();
    let entry = registry.start_registration("iron-bank", owner()).unwrap();
    entry.set_implementation(&owner(), "markets", markets()).unwrap();
    entry
        .add_condition(
            &owner(),
            ConditionSpec::new("markets", "mint", &["uint256"])
                .require(Requirement::param("isMarket", 0)),
        )
        .unwrap();
    registry.finish_registration("iron-bank", &owner()).unwrap();

    assert_eq!(
        registry.decide("iron-bank", &market(), &mint(5)),
        Decision::Deny(DenyReason::NoMatch)
    );
}
