//! Audit export of a protocol's rule set.
//!
//! The report is a complete, stable JSON structure: every stored condition in
//! insertion order with its id, implementation, signature, selector and
//! requirements.

use alloy_primitives::Address;
use serde::Serialize;

use callguard_core::abi::Selector;

use crate::condition::{Condition, Requirement};
use crate::registry::RegistrationState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsReport {
    pub origin_name: String,
    pub owner: Address,
    pub state: RegistrationState,
    pub conditions_length: usize,
    pub conditions: Vec<ConditionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    pub id: String,
    pub implementation_id: String,
    pub method_name: String,
    pub param_types: Vec<String>,
    pub signature: String,
    pub selector: Selector,
    pub requirements: Vec<Requirement>,
}

impl From<&Condition> for ConditionRecord {
    fn from(c: &Condition) -> Self {
        Self {
            id: c.id().to_string(),
            implementation_id: c.implementation_id().to_string(),
            method_name: c.signature().name().to_string(),
            param_types: c.signature().params().iter().map(ToString::to_string).collect(),
            signature: c.signature().signature(),
            selector: c.selector(),
            requirements: c.requirements().to_vec(),
        }
    }
}

/// One line of `GET /v1/protocols`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSummary {
    pub origin_name: String,
    pub owner: Address,
    pub state: RegistrationState,
    pub conditions_length: usize,
    pub implementations: Vec<String>,
}
