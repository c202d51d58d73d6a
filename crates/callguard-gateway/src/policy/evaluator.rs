//! Requirement evaluation against one decoded call.

use alloy_primitives::Address;

use callguard_core::abi::Value;
use callguard_core::error::EvalError;
use callguard_core::plugin::{Implementation, Subject};

use crate::condition::{Requirement, RequirementKind};

/// Apply one requirement's predicate to the target or to one argument.
///
/// An out-of-range argument index is reported even though conditions are
/// bounds-checked when added.
pub fn evaluate(
    req: &Requirement,
    target: &Address,
    args: &[Value],
    implementation: &dyn Implementation,
) -> Result<bool, EvalError> {
    let subject = match req.kind {
        RequirementKind::Target => Subject::Target(target),
        RequirementKind::Param => {
            let index = req.arg_index.unwrap_or(usize::MAX);
            let value = args.get(index).ok_or(EvalError::IndexOutOfRange {
                index,
                len: args.len(),
            })?;
            Subject::Param(value)
        }
    };
    implementation.check(&req.predicate, subject)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use alloy_primitives::U256;
    use callguard_core::plugin::PredicateSet;

    fn vault() -> Address {
        Address::repeat_byte(0x11)
    }

    fn implementation() -> PredicateSet {
        let v = vault();
        PredicateSet::new().address("isVault", move |a| *a == v)
    }

    #[test]
    fn target_requirement_checks_target() {
        let imp = implementation();
        let req = Requirement::target("isVault");
        assert!(evaluate(&req, &vault(), &[], &imp).unwrap());
        assert!(!evaluate(&req, &Address::ZERO, &[], &imp).unwrap());
    }

    #[test]
    fn param_requirement_checks_indexed_argument() {
        let imp = implementation();
        let args = vec![Value::Uint(U256::from(1u8)), Value::Address(vault())];
        assert!(evaluate(&Requirement::param("isVault", 1), &Address::ZERO, &args, &imp).unwrap());
        assert_eq!(
            evaluate(&Requirement::param("isVault", 0), &Address::ZERO, &args, &imp).unwrap_err(),
            EvalError::TypeMismatch {
                predicate: "isVault".into(),
                expected: "address"
            }
        );
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let imp = implementation();
        let err = evaluate(&Requirement::param("isVault", 3), &vault(), &[], &imp).unwrap_err();
        assert_eq!(err, EvalError::IndexOutOfRange { index: 3, len: 0 });
    }

    #[test]
    fn unknown_predicate_is_an_error() {
        let imp = implementation();
        let err = evaluate(&Requirement::target("isMarket"), &vault(), &[], &imp).unwrap_err();
        assert_eq!(err, EvalError::UnknownPredicate("isMarket".into()));
    }
}
