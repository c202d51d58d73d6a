//! ABI type grammar, canonical signatures, and selector derivation.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::keccak256;
use serde::{Serialize, Serializer};

use crate::error::{DecodeError, TypeParseError};

/// Maximum nesting of arrays/tuples accepted by the grammar and the decoder.
pub const MAX_TYPE_DEPTH: usize = 16;

/// Selector width in bytes.
pub const SELECTOR_LEN: usize = 4;

/// Declared parameter type of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Address,
    Bool,
    /// `uintN`, N in bits.
    Uint(usize),
    /// `intN`, N in bits.
    Int(usize),
    /// `bytesN`, N in bytes (1..=32).
    FixedBytes(usize),
    Bytes,
    String,
    /// `T[]`
    Array(Box<ParamType>),
    /// `T[k]`
    FixedArray(Box<ParamType>, usize),
    /// `(T1,T2,..)`
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Whether the value lives in the tail region (head holds an offset).
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(items) => items.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head region.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            ParamType::FixedArray(inner, len) => inner.head_size().saturating_mul(*len),
            ParamType::Tuple(items) => items
                .iter()
                .fold(0usize, |acc, t| acc.saturating_add(t.head_size())),
            _ => 32,
        }
    }

    fn parse_at_depth(raw: &str, depth: usize) -> Result<Self, TypeParseError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(TypeParseError::new(raw, "nesting too deep"));
        }
        let s = raw.trim();
        if s.is_empty() {
            return Err(TypeParseError::new(raw, "empty type"));
        }

        if s.ends_with(']') {
            let open = s
                .rfind('[')
                .ok_or_else(|| TypeParseError::new(raw, "unbalanced array suffix"))?;
            let inner = Self::parse_at_depth(&s[..open], depth + 1)?;
            let size = &s[open + 1..s.len() - 1];
            if size.is_empty() {
                return Ok(ParamType::Array(Box::new(inner)));
            }
            let len: usize = size
                .parse()
                .map_err(|_| TypeParseError::new(raw, format!("invalid array length `{size}`")))?;
            if len == 0 {
                return Err(TypeParseError::new(raw, "fixed array length must be > 0"));
            }
            return Ok(ParamType::FixedArray(Box::new(inner), len));
        }

        if let Some(body) = s.strip_prefix('(') {
            let body = body
                .strip_suffix(')')
                .ok_or_else(|| TypeParseError::new(raw, "unbalanced tuple"))?;
            let items = split_top_level(body)
                .ok_or_else(|| TypeParseError::new(raw, "unbalanced tuple"))?
                .into_iter()
                .map(|item| Self::parse_at_depth(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            if items.is_empty() {
                return Err(TypeParseError::new(raw, "empty tuple"));
            }
            return Ok(ParamType::Tuple(items));
        }

        match s {
            "address" => return Ok(ParamType::Address),
            "bool" => return Ok(ParamType::Bool),
            "bytes" => return Ok(ParamType::Bytes),
            "string" => return Ok(ParamType::String),
            "uint" => return Ok(ParamType::Uint(256)),
            "int" => return Ok(ParamType::Int(256)),
            _ => {}
        }

        if let Some(bits) = s.strip_prefix("uint") {
            return parse_bits(raw, bits).map(ParamType::Uint);
        }
        if let Some(bits) = s.strip_prefix("int") {
            return parse_bits(raw, bits).map(ParamType::Int);
        }
        if let Some(width) = s.strip_prefix("bytes") {
            let n: usize = width
                .parse()
                .map_err(|_| TypeParseError::new(raw, "invalid bytesN width"))?;
            if !(1..=32).contains(&n) {
                return Err(TypeParseError::new(raw, "bytesN width must be 1..=32"));
            }
            return Ok(ParamType::FixedBytes(n));
        }

        Err(TypeParseError::new(raw, "unknown type"))
    }
}

fn parse_bits(raw: &str, bits: &str) -> Result<usize, TypeParseError> {
    let n: usize = bits
        .parse()
        .map_err(|_| TypeParseError::new(raw, "invalid integer width"))?;
    if n == 0 || n > 256 || n % 8 != 0 {
        return Err(TypeParseError::new(
            raw,
            "integer width must be a multiple of 8 in 8..=256",
        ));
    }
    Ok(n)
}

/// Split a tuple body on commas at nesting depth zero.
/// Returns `None` on unbalanced parentheses.
fn split_top_level(body: &str) -> Option<Vec<&str>> {
    if body.trim().is_empty() {
        return Some(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&body[start..]);
    Some(parts)
}

impl FromStr for ParamType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_at_depth(s, 0)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => f.write_str("address"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Uint(bits) => write!(f, "uint{bits}"),
            ParamType::Int(bits) => write!(f, "int{bits}"),
            ParamType::FixedBytes(n) => write!(f, "bytes{n}"),
            ParamType::Bytes => f.write_str("bytes"),
            ParamType::String => f.write_str("string"),
            ParamType::Array(inner) => write!(f, "{inner}[]"),
            ParamType::FixedArray(inner, len) => write!(f, "{inner}[{len}]"),
            ParamType::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Fixed-width method discriminator: first 4 bytes of keccak-256 over the
/// canonical signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector(pub [u8; SELECTOR_LEN]);

impl Selector {
    /// Derive the selector of a canonical signature string.
    pub fn from_signature(signature: &str) -> Self {
        let hash = keccak256(signature.as_bytes());
        let mut out = [0u8; SELECTOR_LEN];
        out.copy_from_slice(&hash.as_slice()[..SELECTOR_LEN]);
        Selector(out)
    }

    /// Read the selector from the leading bytes of a call payload.
    pub fn from_calldata(calldata: &[u8]) -> Result<Self, DecodeError> {
        let head = calldata.get(..SELECTOR_LEN).ok_or(DecodeError::Truncated {
            needed: SELECTOR_LEN,
            available: calldata.len(),
        })?;
        let mut out = [0u8; SELECTOR_LEN];
        out.copy_from_slice(head);
        Ok(Selector(out))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Selector {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact = s.trim().to_lowercase();
        let digits = compact.strip_prefix("0x").unwrap_or(&compact);
        let bytes = hex::decode(digits).map_err(|e| TypeParseError::new(s, e.to_string()))?;
        let arr: [u8; SELECTOR_LEN] = bytes
            .try_into()
            .map_err(|_| TypeParseError::new(s, "selector must be exactly 4 bytes"))?;
        Ok(Selector(arr))
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Method identity: name plus ordered parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    name: String,
    params: Vec<ParamType>,
}

impl MethodSignature {
    pub fn new(name: &str, params: Vec<ParamType>) -> Result<Self, TypeParseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TypeParseError::new(name, "method name must be non-empty"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(TypeParseError::new(name, "method name must be an identifier"));
        }
        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    /// Build from a method name and raw type strings (`["address", "uint"]`).
    pub fn parse(name: &str, param_types: &[String]) -> Result<Self, TypeParseError> {
        let params = param_types
            .iter()
            .map(|t| t.parse())
            .collect::<Result<Vec<ParamType>, _>>()?;
        Self::new(name, params)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Canonical signature string, e.g. `approve(address,uint256)`.
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({params})", self.name)
    }

    pub fn selector(&self) -> Selector {
        Selector::from_signature(&self.signature())
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
