//! Shared error types across callguard crates.

use thiserror::Error;

use crate::abi::Selector;

/// Stable error classes surfaced to callers (HTTP status, logs, metrics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad requirement index, duplicate id, unknown predicate/implementation.
    Configuration,
    /// Malformed or truncated calldata.
    Decode,
    /// Caller is not the protocol owner.
    Authorization,
    /// Operation invalid for the current registration state.
    State,
    /// Unknown protocol or condition.
    NotFound,
    /// Invalid input outside the rule model (config files, request bodies).
    BadRequest,
    /// Internal error.
    Internal,
}

impl ErrorClass {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Configuration => "CONFIGURATION",
            ErrorClass::Decode => "DECODE",
            ErrorClass::Authorization => "AUTHORIZATION",
            ErrorClass::State => "STATE",
            ErrorClass::NotFound => "NOT_FOUND",
            ErrorClass::BadRequest => "BAD_REQUEST",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Calldata decoding failure. Always local to one condition: the condition
/// does not match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("calldata truncated: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },
    #[error("selector mismatch: expected {expected}, got {actual}")]
    SelectorMismatch { expected: Selector, actual: Selector },
    #[error("invalid offset {offset} at byte {position}")]
    InvalidOffset { position: usize, offset: String },
    #[error("invalid {kind} value at byte {position}")]
    InvalidValue { kind: String, position: usize },
    #[error("invalid utf-8 in string at byte {position}")]
    InvalidUtf8 { position: usize },
    #[error("type nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("decoded arguments exceed {limit} bytes")]
    BudgetExceeded { limit: usize },
}

/// Parameter type string rejected by the ABI grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid abi type `{input}`: {reason}")]
pub struct TypeParseError {
    pub input: String,
    pub reason: String,
}

impl TypeParseError {
    pub(crate) fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Calldata encoding failure (caller supplied values that do not fit the types).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("expected {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("value does not fit abi type {0}")]
    TypeMismatch(String),
}

/// Requirement evaluation failure. Always folds into deny.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown predicate: {0}")]
    UnknownPredicate(String),
    #[error("unknown implementation: {0}")]
    UnknownImplementation(String),
    #[error("argument index {index} out of range ({len} arguments)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("predicate {predicate} expects {expected}")]
    TypeMismatch {
        predicate: String,
        expected: &'static str,
    },
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CallGuardError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum CallGuardError {
    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),
    #[error("duplicate condition id: {0}")]
    DuplicateId(String),
    #[error(transparent)]
    InvalidType(#[from] TypeParseError),
    #[error("unknown implementation: {0}")]
    UnknownImplementation(String),
    #[error("unknown predicate: {0}")]
    UnknownPredicate(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("protocol already registered: {0}")]
    AlreadyRegistered(String),
    #[error("invalid registration state: {0}")]
    InvalidState(String),
    #[error("protocol not found: {0}")]
    NotFound(String),
    #[error("condition not found: {0}")]
    ConditionNotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl CallGuardError {
    /// Map the error onto its stable class.
    pub fn class(&self) -> ErrorClass {
        match self {
            CallGuardError::InvalidRequirement(_)
            | CallGuardError::DuplicateId(_)
            | CallGuardError::InvalidType(_)
            | CallGuardError::UnknownImplementation(_)
            | CallGuardError::UnknownPredicate(_) => ErrorClass::Configuration,
            CallGuardError::Decode(_) | CallGuardError::Encode(_) => ErrorClass::Decode,
            CallGuardError::Unauthorized(_) => ErrorClass::Authorization,
            CallGuardError::AlreadyRegistered(_) | CallGuardError::InvalidState(_) => {
                ErrorClass::State
            }
            CallGuardError::NotFound(_) | CallGuardError::ConditionNotFound(_) => {
                ErrorClass::NotFound
            }
            CallGuardError::BadRequest(_) | CallGuardError::UnsupportedVersion => {
                ErrorClass::BadRequest
            }
            CallGuardError::Internal(_) => ErrorClass::Internal,
        }
    }
}

impl From<EvalError> for CallGuardError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::UnknownPredicate(p) => CallGuardError::UnknownPredicate(p),
            EvalError::UnknownImplementation(i) => CallGuardError::UnknownImplementation(i),
            other => CallGuardError::InvalidRequirement(other.to_string()),
        }
    }
}
