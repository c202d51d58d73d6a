//! Decoded argument values.

use alloy_primitives::{Address, I256, U256};
use bytes::Bytes;

/// One decoded argument slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Address(Address),
    Bool(bool),
    Uint(U256),
    Int(I256),
    /// `bytesN`, exactly N bytes.
    FixedBytes(Bytes),
    Bytes(Bytes),
    String(String),
    /// Both `T[]` and `T[k]`.
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Value::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<&U256> {
        match self {
            Value::Uint(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) | Value::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Short kind label used in logs and type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Address(_) => "address",
            Value::Bool(_) => "bool",
            Value::Uint(_) => "uint",
            Value::Int(_) => "int",
            Value::FixedBytes(_) => "fixed bytes",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
        }
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a)
    }
}

impl From<U256> for Value {
    fn from(u: U256) -> Self {
        Value::Uint(u)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
