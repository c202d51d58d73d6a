//! callguard: calldata allow-listing for managed accounts.
//!
//! Single dependency entry point. `core` holds the ABI codec and the
//! implementation plug-in contract, `gateway` the condition registry,
//! validation engine and HTTP service. Most embedders only need the prelude:
//!
//! ```ignore
//! use callguard::prelude::*;
//!
//! let registry = Registry::default();
//! let entry = registry.start_registration("demo", owner)?;
//! entry.set_implementation(&owner, "vaults", Arc::new(AddressSets::new().with_set("isVault", [vault])))?;
//! entry.add_condition(&owner, ConditionSpec::new("vaults", "deposit", &["uint256"])
//!     .require(Requirement::target("isVault")))?;
//! registry.finish_registration("demo", &owner)?;
//! assert!(registry.validate("demo", &vault, &calldata));
//! ```

pub mod core {
    pub use callguard_core::*;
}

pub mod gateway {
    pub use callguard_gateway::*;
}

pub mod prelude {
    pub use callguard_core::abi::{encode_call, MethodSignature, Selector, Value};
    pub use callguard_core::error::{CallGuardError, ErrorClass, Result};
    pub use callguard_core::plugin::{Implementation, PredicateSet, Subject};
    pub use callguard_gateway::plugins::AddressSets;
    pub use callguard_gateway::{
        ConditionSpec, Decision, DenyReason, ProtocolEntry, RegistrationState, Registry,
        Requirement,
    };
}
