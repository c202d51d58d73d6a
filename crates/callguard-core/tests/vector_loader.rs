//! JSON test vector loader shared by calldata tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub method: String,
    pub param_types: Vec<String>,
    pub calldata: PayloadData,
    #[serde(default)]
    pub expect: Option<ExpectDecoded>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectDecoded {
    /// `Value::kind()` of every decoded argument, in order.
    pub kinds: Vec<String>,
    /// Argument index -> expected address (lowercase hex).
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct PayloadData {
    pub encoding: String,
    pub data: String,
}

impl PayloadData {
    pub fn decode(&self) -> Vec<u8> {
        match self.encoding.as_str() {
            "hex" => hex::decode(&self.data).expect("invalid hex in test vector"),
            other => panic!("unsupported encoding: {other}"),
        }
    }
}
