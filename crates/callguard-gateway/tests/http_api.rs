//! HTTP handler tests (handlers called directly, no socket).

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use alloy_primitives::{Address, U256};
use axum::body::to_bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use callguard_core::abi::{encode_call, MethodSignature, Value};
use callguard_gateway::app_state::AppState;
use callguard_gateway::config;
use callguard_gateway::transport::http::{self, ValidateRequest, ValidateResponse};

const VAULT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const TOKEN: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

fn state() -> AppState {
    let yaml = format!(
        r#"
version: 1
protocols:
  - origin_name: "demo"
    owner: "0x0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e"
    activate: true
    implementations:
      - id: impl
        address_sets:
          isVault: ["{VAULT}"]
          isVaultToken: ["{TOKEN}"]
    conditions:
      - id: approve-vault
        implementation_id: impl
        method_name: approve
        param_types: ["address", "uint256"]
        requirements:
          - ["target", "isVaultToken"]
          - ["param", "isVault", "0"]
"#
    );
    AppState::new(config::load_from_str(&yaml).unwrap()).unwrap()
}

fn approve_hex(spender: &str) -> String {
    let sig = MethodSignature::parse("approve", &["address".to_string(), "uint256".to_string()]).unwrap();
    let data = encode_call(
        &sig,
        &[Value::Address(spender.parse::<Address>().unwrap()), Value::Uint(U256::MAX)],
    )
    .unwrap();
    format!("0x{}", hex::encode(data))
}

async fn body_json(res: Response) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn call_validate(state: &AppState, origin: &str, target: &str, calldata: String) -> Response {
    let req = ValidateRequest {
        origin_name: origin.to_string(),
        target: target.to_string(),
        calldata,
    };
    http::validate(State(state.clone()), Ok(Json(req))).await
}

#[tokio::test]
async fn validate_allows_and_denies() {
    let state = state();

    let res = call_validate(&state, "demo", TOKEN, approve_hex(VAULT)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: ValidateResponse = serde_json::from_value(body_json(res).await).unwrap();
    assert_eq!(
        body,
        ValidateResponse {
            allowed: true,
            reason: "allowed".into(),
            condition_id: Some("approve-vault".into()),
        }
    );

    let res = call_validate(&state, "demo", VAULT, approve_hex(VAULT)).await;
    let body = body_json(res).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "no_match");
    assert!(body.get("condition_id").is_none());

    let res = call_validate(&state, "ghost", TOKEN, approve_hex(VAULT)).await;
    assert_eq!(body_json(res).await["reason"], "unknown_protocol");

    let m = state.metrics();
    assert_eq!(m.validations.get(&[("origin", "demo"), ("outcome", "allowed")]), 1);
    assert_eq!(m.validations.get(&[("origin", "unknown"), ("outcome", "unknown_protocol")]), 1);
}

#[tokio::test]
async fn validate_rejects_malformed_input() {
    let state = state();

    let res = call_validate(&state, "demo", "0x1234", approve_hex(VAULT)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"]["class"], "BAD_REQUEST");

    let res = call_validate(&state, "demo", TOKEN, "0xzz".to_string()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.metrics().request_errors.get(&[("kind", "input")]), 2);
}

#[tokio::test]
async fn protocol_listing_and_export() {
    let state = state();

    let res = http::list_protocols(State(state.clone())).await;
    let list = body_json(res).await;
    assert_eq!(list[0]["originName"], "demo");
    assert_eq!(list[0]["state"], "registered");
    assert_eq!(list[0]["conditionsLength"], 1);

    let res = http::get_protocol(State(state.clone()), Path("ghost".to_string())).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["error"]["class"], "NOT_FOUND");

    let res = http::get_conditions(State(state.clone()), Path("demo".to_string())).await;
    assert_eq!(res.status(), StatusCode::OK);
    let report = body_json(res).await;
    assert_eq!(report["conditions"][0]["id"], "approve-vault");
    assert_eq!(report["conditions"][0]["selector"], "0x095ea7b3");
}

#[tokio::test]
async fn ops_endpoints() {
    let state = state();
    let _ = call_validate(&state, "demo", TOKEN, approve_hex(VAULT)).await;

    let res = callguard_gateway::ops::metrics(State(state.clone())).await;
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("callguard_validations_total{origin=\"demo\",outcome=\"allowed\"} 1"));
    assert!(text.contains("callguard_protocols_registered 1"));
    assert!(text.contains("callguard_conditions 1"));
    assert!(text.contains("callguard_rule_mutations_total{op=\"add_condition\",origin=\"demo\"} 1"));

    state.set_draining();
    let res = callguard_gateway::ops::readyz(State(state.clone())).await.into_response();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}
