//! JSON handlers.
//!
//! - `POST /v1/validate`                   : verdict for one call
//! - `GET  /v1/protocols`                  : protocol summaries
//! - `GET  /v1/protocols/:origin`          : one summary
//! - `GET  /v1/protocols/:origin/conditions`: audit export

use std::str::FromStr;
use std::time::Instant;

use alloy_primitives::Address;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

use callguard_core::error::{CallGuardError, ErrorClass};

use crate::app_state::AppState;
use crate::export::ProtocolSummary;
use crate::policy::{Decision, DenyReason};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateRequest {
    #[serde(alias = "originName")]
    pub origin_name: String,
    /// `0x`-prefixed address.
    pub target: String,
    /// Hex calldata, `0x` prefix optional.
    pub calldata: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidateResponse {
    pub allowed: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
}

fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Configuration | ErrorClass::Decode | ErrorClass::BadRequest => {
            StatusCode::BAD_REQUEST
        }
        ErrorClass::Authorization => StatusCode::FORBIDDEN,
        ErrorClass::State => StatusCode::CONFLICT,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &CallGuardError) -> Response {
    let class = err.class();
    let body = json!({
        "error": {
            "class": class.as_str(),
            "message": err.to_string(),
        }
    });
    (status_for(class), Json(body)).into_response()
}

fn parse_target(raw: &str) -> Result<Address, CallGuardError> {
    Address::from_str(raw.trim())
        .map_err(|e| CallGuardError::BadRequest(format!("invalid target address: {e}")))
}

fn parse_calldata(raw: &str) -> Result<Bytes, CallGuardError> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| CallGuardError::BadRequest(format!("invalid calldata hex: {e}")))
}

pub async fn validate(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            state.metrics().request_errors.inc(&[("kind", "json")]);
            let err = CallGuardError::BadRequest(rejection.body_text());
            return error_response(&err);
        }
    };

    let parsed = parse_target(&req.target)
        .and_then(|target| parse_calldata(&req.calldata).map(|calldata| (target, calldata)));
    let (target, calldata) = match parsed {
        Ok(v) => v,
        Err(e) => {
            state.metrics().request_errors.inc(&[("kind", "input")]);
            return error_response(&e);
        }
    };

    let started = Instant::now();
    let decision = state.registry().decide(&req.origin_name, &target, &calldata);
    let elapsed = started.elapsed();

    // Unknown origins share one label so callers cannot grow the label set.
    let origin = match &decision {
        Decision::Deny(DenyReason::UnknownProtocol) => "unknown",
        _ => req.origin_name.as_str(),
    };
    let metrics = state.metrics();
    metrics
        .validations
        .inc(&[("origin", origin), ("outcome", decision.outcome())]);
    metrics.validation_duration.observe(&[("origin", origin)], elapsed);

    tracing::debug!(origin, %target, outcome = decision.outcome(), "validate");

    let body = ValidateResponse {
        allowed: decision.is_allowed(),
        reason: decision.outcome().to_string(),
        condition_id: decision.condition_id().map(str::to_string),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn list_protocols(State(state): State<AppState>) -> Response {
    let registry = state.registry();
    let summaries: Result<Vec<ProtocolSummary>, CallGuardError> = registry
        .origin_names()
        .iter()
        .map(|name| registry.resolve_store(name).and_then(|e| e.summary()))
        .collect();
    match summaries {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_protocol(State(state): State<AppState>, Path(origin): Path<String>) -> Response {
    match state.registry().resolve_store(&origin).and_then(|e| e.summary()) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_conditions(State(state): State<AppState>, Path(origin): Path<String>) -> Response {
    match state
        .registry()
        .resolve_store(&origin)
        .and_then(|e| e.conditions_export())
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(&e),
    }
}
