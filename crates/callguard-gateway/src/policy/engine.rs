use std::fmt;

use alloy_primitives::Address;
use bytes::Bytes;
use serde::Serialize;

use callguard_core::abi::{decode_call, Selector};

use super::evaluator::evaluate;
use crate::condition::Condition;
use crate::registry::{ProtocolSnapshot, RegistrationState};

/// Verdict of one validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// First condition whose requirements all passed.
    Allow { condition_id: String },
    Deny(DenyReason),
}

/// Why a call was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    UnknownProtocol,
    NotRegistered,
    /// Shorter than a selector.
    MalformedCalldata,
    /// No condition for the selector.
    NoConditions,
    /// Candidates existed but none matched.
    NoMatch,
    /// Protocol state could not be read.
    Unavailable,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::UnknownProtocol => "unknown_protocol",
            DenyReason::NotRegistered => "not_registered",
            DenyReason::MalformedCalldata => "malformed_calldata",
            DenyReason::NoConditions => "no_conditions",
            DenyReason::NoMatch => "no_match",
            DenyReason::Unavailable => "unavailable",
        }
    }
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    /// `"allowed"` or the deny reason; used as a metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::Allow { .. } => "allowed",
            Decision::Deny(reason) => reason.as_str(),
        }
    }

    pub fn condition_id(&self) -> Option<&str> {
        match self {
            Decision::Allow { condition_id } => Some(condition_id),
            Decision::Deny(_) => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow { condition_id } => write!(f, "allowed by {condition_id}"),
            Decision::Deny(reason) => write!(f, "denied: {}", reason.as_str()),
        }
    }
}

/// Evaluate a call against one protocol snapshot.
///
/// OR across the selector's candidates (first full match wins), AND across a
/// candidate's requirements. Every error folds into "this candidate fails".
pub fn decide(
    snapshot: &ProtocolSnapshot,
    origin: &str,
    target: &Address,
    calldata: &Bytes,
) -> Decision {
    let Ok(selector) = Selector::from_calldata(calldata) else {
        tracing::debug!(origin, len = calldata.len(), "calldata shorter than a selector");
        return Decision::Deny(DenyReason::MalformedCalldata);
    };

    if snapshot.state() != RegistrationState::Registered {
        tracing::debug!(origin, state = %snapshot.state(), "protocol not registered");
        return Decision::Deny(DenyReason::NotRegistered);
    }

    let candidates = snapshot.store().conditions_for_selector(&selector);
    if candidates.is_empty() {
        tracing::debug!(origin, %selector, "no condition for selector");
        return Decision::Deny(DenyReason::NoConditions);
    }

    for condition in candidates {
        if matches_condition(snapshot, origin, condition, target, calldata) {
            return Decision::Allow {
                condition_id: condition.id().to_string(),
            };
        }
    }

    Decision::Deny(DenyReason::NoMatch)
}

fn matches_condition(
    snapshot: &ProtocolSnapshot,
    origin: &str,
    condition: &Condition,
    target: &Address,
    calldata: &Bytes,
) -> bool {
    let Some(implementation) = snapshot.implementation(condition.implementation_id()) else {
        tracing::warn!(
            origin,
            condition = %condition.id(),
            implementation = %condition.implementation_id(),
            "condition references a missing implementation"
        );
        return false;
    };

    let args = match decode_call(condition.signature(), calldata) {
        Ok(args) => args,
        Err(e) => {
            tracing::debug!(origin, condition = %condition.id(), error = %e, "calldata does not decode");
            return false;
        }
    };

    for req in condition.requirements() {
        match evaluate(req, target, &args, &**implementation) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    origin,
                    condition = %condition.id(),
                    %target,
                    kind = %req.kind,
                    predicate = %req.predicate,
                    "requirement failed"
                );
                return false;
            }
            Err(e) => {
                tracing::warn!(origin, condition = %condition.id(), error = %e, "requirement error");
                return false;
            }
        }
    }
    true
}
