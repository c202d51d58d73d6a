#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use alloy_primitives::Address;

use callguard_core::error::{CallGuardError, ErrorClass};
use callguard_core::plugin::Implementation;
use callguard_gateway::config::{RegistrationMode, RegistrationPolicy};
use callguard_gateway::plugins::AddressSets;
use callguard_gateway::{ConditionSpec, RegistrationState, Registry, Requirement};

fn owner() -> Address {
    Address::repeat_byte(0x0e)
}
fn stranger() -> Address {
    Address::repeat_byte(0x99)
}

fn approve() -> ConditionSpec {
    ConditionSpec::new("impl", "approve", &["address", "uint256"])
        .require(Requirement::target("isVaultToken"))
        .require(Requirement::param("isVault", 0))
}

fn sets() -> Arc<AddressSets> {
    Arc::new(
        AddressSets::new()
            .with_set("isVault", [])
            .with_set("isVaultToken", []),
    )
}

#[test]
fn two_phase_state_machine() {
    let registry = Registry::default();
    assert_eq!(registry.registration_state("demo"), RegistrationState::Unregistered);

    let entry = registry.start_registration("demo", owner()).unwrap();
    assert_eq!(entry.state(), RegistrationState::Pending);
    assert_eq!(registry.owner_of("demo").unwrap(), owner());
    assert!(!registry.is_registered("demo"));

    let err = registry.start_registration("demo", stranger()).unwrap_err();
    assert!(matches!(err, CallGuardError::AlreadyRegistered(_)));
    assert_eq!(registry.owner_of("demo").unwrap(), owner());

    registry.finish_registration("demo", &owner()).unwrap();
    assert!(registry.is_registered("demo"));

    let err = registry.finish_registration("demo", &owner()).unwrap_err();
    assert!(matches!(err, CallGuardError::AlreadyRegistered(_)));
    assert_eq!(err.class(), ErrorClass::State);
}

#[test]
fn single_phase_activates_on_start() {
    let registry = Registry::new(RegistrationPolicy {
        mode: RegistrationMode::SinglePhase,
        require_conditions_on_finish: false,
    });
    let entry = registry.start_registration("demo", owner()).unwrap();
    assert_eq!(entry.state(), RegistrationState::Registered);
    assert!(matches!(
        registry.finish_registration("demo", &owner()).unwrap_err(),
        CallGuardError::AlreadyRegistered(_)
    ));

    // Owner can still populate the store after activation.
    entry.set_implementation(&owner(), "impl", sets()).unwrap();
    entry.add_condition(&owner(), approve()).unwrap();
    assert_eq!(entry.conditions_length(), 1);
}

#[test]
fn finish_can_require_conditions() {
    let registry = Registry::new(RegistrationPolicy {
        mode: RegistrationMode::TwoPhase,
        require_conditions_on_finish: true,
    });
    let entry = registry.start_registration("demo", owner()).unwrap();

    let err = registry.finish_registration("demo", &owner()).unwrap_err();
    assert!(matches!(err, CallGuardError::InvalidState(_)));
    assert_eq!(entry.state(), RegistrationState::Pending);

    entry.set_implementation(&owner(), "impl", sets()).unwrap();
    entry.add_condition(&owner(), approve()).unwrap();
    registry.finish_registration("demo", &owner()).unwrap();
    assert_eq!(entry.state(), RegistrationState::Registered);
}

#[test]
fn mutations_require_the_owner() {
    let registry = Registry::default();
    let entry = registry.start_registration("demo", owner()).unwrap();
    entry.set_implementation(&owner(), "impl", sets()).unwrap();
    entry.add_condition(&owner(), approve().with_id("a")).unwrap();

    let attempts = [
        entry.set_implementation(&stranger(), "impl", sets()),
        entry.add_condition(&stranger(), approve()).map(|_| ()),
        entry.add_conditions(&stranger(), vec![approve()]).map(|_| ()),
        entry.delete_condition(&stranger(), "a"),
        entry.delete_all_conditions(&stranger()),
        registry.finish_registration("demo", &stranger()),
    ];
    for result in attempts {
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Authorization, "{err}");
    }
    assert_eq!(entry.conditions_length(), 1);
    assert_eq!(entry.state(), RegistrationState::Pending);
}

#[test]
fn unknown_protocol_is_not_found() {
    let registry = Registry::default();
    assert!(matches!(
        registry.resolve_store("ghost").unwrap_err(),
        CallGuardError::NotFound(_)
    ));
    assert!(registry.owner_of("ghost").is_err());
    assert!(registry.finish_registration("ghost", &owner()).is_err());
    assert!(registry.start_registration("  ", owner()).is_err());
}

#[test]
fn add_checks_implementation_and_predicates() {
    let registry = Registry::default();
    let entry = registry.start_registration("demo", owner()).unwrap();

    let err = entry.add_condition(&owner(), approve()).unwrap_err();
    assert!(matches!(err, CallGuardError::UnknownImplementation(_)));

    entry.set_implementation(&owner(), "impl", sets()).unwrap();
    let err = entry
        .add_condition(&owner(), approve().require(Requirement::target("isMarket")))
        .unwrap_err();
    assert!(matches!(err, CallGuardError::UnknownPredicate(_)));
    assert_eq!(err.class(), ErrorClass::Configuration);

    let err = entry
        .add_condition(&owner(), approve().require(Requirement::param("isVault", 2)))
        .unwrap_err();
    assert!(matches!(err, CallGuardError::InvalidRequirement(_)));

    let err = entry
        .add_condition(&owner(), ConditionSpec::new("impl", "approve", &["adress"]))
        .unwrap_err();
    assert!(matches!(err, CallGuardError::InvalidType(_)));

    assert_eq!(entry.conditions_length(), 0);
}

#[test]
fn conditions_can_be_looked_up_and_deleted() {
    let registry = Registry::default();
    let entry = registry.start_registration("demo", owner()).unwrap();
    entry.set_implementation(&owner(), "impl", sets()).unwrap();

    let ids = entry
        .add_conditions(&owner(), vec![approve().with_id("a"), approve()])
        .unwrap();
    assert_eq!(ids, vec!["a", "approve(address,uint256)#1"]);

    let a = entry.condition("a").unwrap();
    assert_eq!(a.signature().signature(), "approve(address,uint256)");

    let err = entry.add_condition(&owner(), approve().with_id("a")).unwrap_err();
    assert!(matches!(err, CallGuardError::DuplicateId(_)));

    entry.delete_condition(&owner(), "a").unwrap();
    assert!(entry.condition("a").is_none());
    assert!(matches!(
        entry.delete_condition(&owner(), "a").unwrap_err(),
        CallGuardError::ConditionNotFound(_)
    ));
    assert_eq!(entry.conditions_length(), 1);
}

#[test]
fn implementations_are_listed_and_resolved() {
    let registry = Registry::default();
    let entry = registry.start_registration("demo", owner()).unwrap();
    entry.set_implementation(&owner(), "vaults", sets()).unwrap();
    entry.set_implementation(&owner(), "markets", sets()).unwrap();

    assert_eq!(entry.implementation_ids(), vec!["markets", "vaults"]);
    let vaults = entry.implementation_by_id("vaults").unwrap();
    assert!(vaults.has_predicate("isVault"));
    assert!(entry.implementation_by_id("zaps").is_none());
    assert!(entry.set_implementation(&owner(), "", sets()).is_err());
}

#[test]
fn export_lists_every_condition() {
    let registry = Registry::default();
    let entry = registry.start_registration("demo", owner()).unwrap();
    entry.set_implementation(&owner(), "impl", sets()).unwrap();
    entry
        .add_conditions(
            &owner(),
            vec![
                approve().with_id("approve-vault"),
                ConditionSpec::new("impl", "claim", &[]).with_id("claim"),
            ],
        )
        .unwrap();

    let report = entry.conditions_export().unwrap();
    assert_eq!(report.origin_name, "demo");
    assert_eq!(report.conditions_length, 2);
    assert_eq!(report.conditions[0].id, "approve-vault");
    assert_eq!(report.conditions[0].signature, "approve(address,uint256)");
    assert_eq!(report.conditions[1].requirements.len(), 0);

    let json: serde_json::Value = serde_json::from_str(&entry.conditions_json().unwrap()).unwrap();
    assert_eq!(json["originName"], "demo");
    assert_eq!(json["state"], "pending");
    assert_eq!(json["conditions"][0]["selector"], "0x095ea7b3");
    assert_eq!(json["conditions"][0]["implementationId"], "impl");
    assert_eq!(json["conditions"][0]["requirements"][1]["kind"], "param");
    assert_eq!(json["conditions"][0]["requirements"][1]["argIndex"], 0);
    assert!(json["conditions"][0]["requirements"][0].get("argIndex").is_none());
}

#[test]
fn origin_names_are_sorted() {
    let registry = Registry::default();
    registry.start_registration("zeta", owner()).unwrap();
    registry.start_registration("alpha", owner()).unwrap();
    assert_eq!(registry.origin_names(), vec!["alpha", "zeta"]);
    assert_eq!(registry.len(), 2);
}
