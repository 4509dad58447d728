use crate::app::registry_service::StorageFailure;
use crate::domain::model::{h256_from_hex, Address};
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use primitive_types::H256;
use serde_json::Value as JsonValue;

pub fn ok(data: JsonValue) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}

pub fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::err(message))).into_response()
}

/// Path/body addresses must be `0x` + 40 hex digits.
pub fn parse_address(raw: &str) -> Result<Address, Response> {
    raw.trim().parse::<Address>().map_err(|e| {
        error(
            StatusCode::BAD_REQUEST,
            format!("Invalid address '{}': {}", raw, e),
        )
    })
}

pub fn parse_h256_list(raw: &[String]) -> Result<Vec<H256>, Response> {
    raw.iter()
        .map(|s| {
            h256_from_hex(s).map_err(|e| {
                error(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid proof element '{}': {}", s, e),
                )
            })
        })
        .collect()
}

/// 503 for an operation that could not read or write the store.
pub fn storage_unavailable(failure: &StorageFailure) -> Response {
    error(
        StatusCode::SERVICE_UNAVAILABLE,
        format!("Allowlist storage is unavailable ({})", failure.operation),
    )
}
