//! Calldata encoding for callers that build transactions (and for test fixtures).

use alloy_primitives::U256;
use bytes::Bytes;

use super::decode::{fits_signed, fits_unsigned};
use super::types::{MethodSignature, ParamType};
use super::value::Value;
use crate::error::EncodeError;

/// `selector ++ encode(params)`.
pub fn encode_call(signature: &MethodSignature, values: &[Value]) -> Result<Bytes, EncodeError> {
    let mut out = signature.selector().0.to_vec();
    out.extend(encode_params(signature.params(), values)?);
    Ok(Bytes::from(out))
}

/// Encode an argument region (no selector).
pub fn encode_params(types: &[ParamType], values: &[Value]) -> Result<Vec<u8>, EncodeError> {
    if types.len() != values.len() {
        return Err(EncodeError::ArityMismatch {
            expected: types.len(),
            actual: values.len(),
        });
    }
    let pairs: Vec<_> = types.iter().zip(values).collect();
    encode_sequence(&pairs)
}

fn encode_sequence(pairs: &[(&ParamType, &Value)]) -> Result<Vec<u8>, EncodeError> {
    let head_len: usize = pairs.iter().map(|(ty, _)| ty.head_size()).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (ty, value) in pairs {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encode_value(ty, value)?);
        } else {
            head.extend(encode_value(ty, value)?);
        }
    }
    head.extend(tail);
    Ok(head)
}

fn encode_value(ty: &ParamType, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mismatch = || EncodeError::TypeMismatch(ty.to_string());

    match (ty, value) {
        (ParamType::Address, Value::Address(address)) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(address.as_slice());
            Ok(word.to_vec())
        }
        (ParamType::Bool, Value::Bool(flag)) => Ok(usize_word(usize::from(*flag)).to_vec()),
        (ParamType::Uint(bits), Value::Uint(v)) if fits_unsigned(*v, *bits) => {
            Ok(v.to_be_bytes::<32>().to_vec())
        }
        (ParamType::Int(bits), Value::Int(v)) if fits_signed(v.into_raw(), *bits) => {
            Ok(v.into_raw().to_be_bytes::<32>().to_vec())
        }
        (ParamType::FixedBytes(width), Value::FixedBytes(data))
            if data.len() == *width && *width <= 32 =>
        {
            let mut word = [0u8; 32];
            word[..*width].copy_from_slice(data);
            Ok(word.to_vec())
        }
        (ParamType::Bytes, Value::Bytes(data)) => Ok(encode_dynamic_bytes(data)),
        (ParamType::String, Value::String(text)) => Ok(encode_dynamic_bytes(text.as_bytes())),
        (ParamType::Array(inner), Value::Array(items)) => {
            let mut out = usize_word(items.len()).to_vec();
            let pairs: Vec<_> = items.iter().map(|item| (inner.as_ref(), item)).collect();
            out.extend(encode_sequence(&pairs)?);
            Ok(out)
        }
        (ParamType::FixedArray(inner, len), Value::Array(items)) if items.len() == *len => {
            let pairs: Vec<_> = items.iter().map(|item| (inner.as_ref(), item)).collect();
            encode_sequence(&pairs)
        }
        (ParamType::Tuple(types), Value::Tuple(items)) if types.len() == items.len() => {
            let pairs: Vec<_> = types.iter().zip(items).collect();
            encode_sequence(&pairs)
        }
        _ => Err(mismatch()),
    }
}

fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let padded = data.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(32 + padded);
    out.extend_from_slice(&usize_word(data.len()));
    out.extend_from_slice(data);
    out.resize(32 + padded, 0);
    out
}

fn usize_word(n: usize) -> [u8; 32] {
    U256::from(n).to_be_bytes::<32>()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use alloy_primitives::Address;

    #[test]
    fn encodes_approve_layout() {
        let signature = MethodSignature::parse(
            "approve",
            &["address".to_string(), "uint256".to_string()],
        )
        .unwrap();
        let data = encode_call(
            &signature,
            &[Value::Address(Address::repeat_byte(0x22)), Value::Uint(U256::from(5u64))],
        )
        .unwrap();
        let expected = format!(
            "095ea7b3{}{}{}{:02x}",
            "00".repeat(12),
            "22".repeat(20),
            "00".repeat(31),
            5
        );
        assert_eq!(hex::encode(&data), expected);
    }

    #[test]
    fn rejects_wrong_arity_and_types() {
        let types = vec![ParamType::Address];
        assert_eq!(
            encode_params(&types, &[]).unwrap_err(),
            EncodeError::ArityMismatch { expected: 1, actual: 0 }
        );
        assert!(encode_params(&types, &[Value::Bool(true)]).is_err());
        assert!(encode_params(&[ParamType::Uint(8)], &[Value::Uint(U256::from(256u64))]).is_err());
    }

    #[test]
    fn dynamic_bytes_are_padded_to_words() {
        let out = encode_params(&[ParamType::Bytes], &[Value::Bytes(Bytes::from_static(b"abc"))]).unwrap();
        assert_eq!(out.len(), 32 * 3);
    }
}
