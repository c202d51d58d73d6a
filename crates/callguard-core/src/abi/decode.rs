//! Calldata decoding (panic-free).
//!
//! Parsing rules:
//! - Never index the payload buffer: every word read goes through a bounds-checked `get`.
//! - Offsets and lengths are range-checked before anything is allocated for them.
//! - Never `unwrap()` / `expect()` / `panic!()`.
//!
//! - Work is charged against a budget proportional to the payload, so tail
//!   offsets that alias the same data cannot inflate a small payload.
//!
//! Byte positions in errors are relative to the argument region (after the selector).

use std::cell::Cell;
use std::iter;

use alloy_primitives::{Address, I256, U256};
use bytes::Bytes;

use super::types::{MethodSignature, ParamType, Selector, MAX_TYPE_DEPTH, SELECTOR_LEN};
use super::value::Value;
use crate::error::DecodeError;

const WORD: usize = 32;

/// Decoded bytes allowed per payload byte.
const BUDGET_FACTOR: usize = 4;

/// Verify the leading selector against `signature`, then decode every declared argument.
pub fn decode_call(signature: &MethodSignature, calldata: &Bytes) -> Result<Vec<Value>, DecodeError> {
    let actual = Selector::from_calldata(calldata)?;
    let expected = signature.selector();
    if actual != expected {
        return Err(DecodeError::SelectorMismatch { expected, actual });
    }
    decode_params(signature.params(), calldata.slice(SELECTOR_LEN..))
}

/// Decode an argument region (no selector) against the declared types.
pub fn decode_params(types: &[ParamType], data: Bytes) -> Result<Vec<Value>, DecodeError> {
    Decoder::new(data).decode_sequence(types.iter(), types.len(), 0, 0)
}

struct Decoder {
    data: Bytes,
    limit: usize,
    // Bytes still allowed: one word per scalar or length, plus copied payloads.
    remaining: Cell<usize>,
}

impl Decoder {
    fn new(data: Bytes) -> Self {
        let limit = data.len().saturating_mul(BUDGET_FACTOR);
        Self {
            data,
            limit,
            remaining: Cell::new(limit),
        }
    }

    fn charge(&self, amount: usize) -> Result<(), DecodeError> {
        let left = self
            .remaining
            .get()
            .checked_sub(amount)
            .ok_or(DecodeError::BudgetExceeded { limit: self.limit })?;
        self.remaining.set(left);
        Ok(())
    }

    fn available(&self) -> usize {
        self.data.len()
    }

    fn word(&self, position: usize) -> Result<[u8; WORD], DecodeError> {
        let end = position.checked_add(WORD).ok_or(DecodeError::Truncated {
            needed: usize::MAX,
            available: self.available(),
        })?;
        let slice = self.data.get(position..end).ok_or(DecodeError::Truncated {
            needed: end,
            available: self.available(),
        })?;
        let mut word = [0u8; WORD];
        word.copy_from_slice(slice);
        Ok(word)
    }

    /// Read a word that must hold a small unsigned integer (offset or length).
    fn read_usize(&self, position: usize) -> Result<usize, DecodeError> {
        let word = self.word(position)?;
        let invalid = || DecodeError::InvalidOffset {
            position,
            offset: format!("0x{}", hex::encode(word)),
        };
        if word[..24].iter().any(|b| *b != 0) {
            return Err(invalid());
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&word[24..]);
        usize::try_from(u64::from_be_bytes(low)).map_err(|_| invalid())
    }

    /// Decode `count` values laid out as a tuple starting at `base`.
    fn decode_sequence<'t>(
        &self,
        types: impl Iterator<Item = &'t ParamType>,
        count: usize,
        base: usize,
        depth: usize,
    ) -> Result<Vec<Value>, DecodeError> {
        let mut values = Vec::with_capacity(count.min(self.available() / WORD + 1));
        let mut head = base;
        for ty in types {
            if ty.is_dynamic() {
                let offset = self.read_usize(head)?;
                let start = base
                    .checked_add(offset)
                    .filter(|start| *start <= self.available())
                    .ok_or_else(|| DecodeError::InvalidOffset {
                        position: head,
                        offset: offset.to_string(),
                    })?;
                values.push(self.decode_at(ty, start, depth + 1)?);
                head = head.saturating_add(WORD);
            } else {
                values.push(self.decode_at(ty, head, depth + 1)?);
                head = head.saturating_add(ty.head_size());
            }
        }
        Ok(values)
    }

    fn decode_at(&self, ty: &ParamType, position: usize, depth: usize) -> Result<Value, DecodeError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(DecodeError::TooDeep(MAX_TYPE_DEPTH));
        }
        let invalid = || DecodeError::InvalidValue {
            kind: ty.to_string(),
            position,
        };

        match ty {
            ParamType::Address => {
                self.charge(WORD)?;
                let word = self.word(position)?;
                if word[..12].iter().any(|b| *b != 0) {
                    return Err(invalid());
                }
                Ok(Value::Address(Address::from_slice(&word[12..])))
            }
            ParamType::Bool => {
                self.charge(WORD)?;
                let word = self.word(position)?;
                if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                    return Err(invalid());
                }
                Ok(Value::Bool(word[31] == 1))
            }
            ParamType::Uint(bits) => {
                self.charge(WORD)?;
                let value = U256::from_be_bytes(self.word(position)?);
                if !fits_unsigned(value, *bits) {
                    return Err(invalid());
                }
                Ok(Value::Uint(value))
            }
            ParamType::Int(bits) => {
                self.charge(WORD)?;
                let raw = U256::from_be_bytes(self.word(position)?);
                if !fits_signed(raw, *bits) {
                    return Err(invalid());
                }
                Ok(Value::Int(I256::from_raw(raw)))
            }
            ParamType::FixedBytes(width) => {
                self.charge(WORD)?;
                let word = self.word(position)?;
                let (data, padding) = word.split_at((*width).min(WORD));
                if *width == 0 || *width > WORD || padding.iter().any(|b| *b != 0) {
                    return Err(invalid());
                }
                Ok(Value::FixedBytes(Bytes::copy_from_slice(data)))
            }
            ParamType::Bytes => self.dynamic_bytes(position).map(Value::Bytes),
            ParamType::String => {
                let raw = self.dynamic_bytes(position)?;
                let text = std::str::from_utf8(&raw)
                    .map_err(|_| DecodeError::InvalidUtf8 { position })?;
                Ok(Value::String(text.to_string()))
            }
            ParamType::Array(inner) => {
                let len = self.read_usize(position)?;
                self.charge(WORD)?;
                let start = position.saturating_add(WORD);
                // Every element needs at least one head slot; reject lengths the payload cannot hold.
                let needed = len
                    .checked_mul(inner.head_size().max(WORD))
                    .and_then(|n| n.checked_add(start))
                    .unwrap_or(usize::MAX);
                if needed > self.available() {
                    return Err(DecodeError::Truncated {
                        needed,
                        available: self.available(),
                    });
                }
                self.decode_sequence(iter::repeat(inner.as_ref()).take(len), len, start, depth)
                    .map(Value::Array)
            }
            ParamType::FixedArray(inner, len) => self
                .decode_sequence(iter::repeat(inner.as_ref()).take(*len), *len, position, depth)
                .map(Value::Array),
            ParamType::Tuple(items) => self
                .decode_sequence(items.iter(), items.len(), position, depth)
                .map(Value::Tuple),
        }
    }

    fn dynamic_bytes(&self, position: usize) -> Result<Bytes, DecodeError> {
        let len = self.read_usize(position)?;
        let start = position.saturating_add(WORD);
        let end = start.checked_add(len).unwrap_or(usize::MAX);
        if end > self.available() {
            return Err(DecodeError::Truncated {
                needed: end,
                available: self.available(),
            });
        }
        self.charge(WORD.saturating_add(len))?;
        Ok(self.data.slice(start..end))
    }
}

pub(crate) fn fits_unsigned(value: U256, bits: usize) -> bool {
    bits >= 256 || (value >> bits) == U256::ZERO
}

/// Two's-complement word is a valid `intN` iff bits above N-1 are a pure sign extension.
pub(crate) fn fits_signed(raw: U256, bits: usize) -> bool {
    if bits >= 256 || bits == 0 {
        return bits >= 256;
    }
    let high = raw >> (bits - 1);
    high == U256::ZERO || high == (U256::MAX >> (bits - 1))
}
