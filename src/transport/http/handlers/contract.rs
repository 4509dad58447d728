use crate::app::operation_lock::OperationKind;
use crate::transport::http::handlers::common::{error, ok};
use crate::transport::http::types::{json_422, AppState, WhitelistOnlyRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::info;

#[utoipa::path(
    get,
    path = "/api/whitelist-only",
    responses(
        (status = 200, description = "Whether mint preparation requires allowlist membership", body = ApiResponse)
    )
)]
pub async fn get_whitelist_only_handler(State(state): State<AppState>) -> impl IntoResponse {
    ok(json!({
        "whitelist_only": state.whitelist_only.load(Ordering::SeqCst),
        "onchain": state.contract.is_some(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/whitelist-only",
    request_body = WhitelistOnlyRequest,
    responses(
        (status = 200, description = "Flag updated (on the contract too, when one is configured)", body = ApiResponse),
        (status = 409, description = "Another allowlist operation is running", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse),
        (status = 502, description = "Contract call failed", body = ApiResponse)
    )
)]
pub async fn set_whitelist_only_handler(
    State(state): State<AppState>,
    request: Result<Json<WhitelistOnlyRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"enabled\"?: true}").into_response(),
    };

    let _guard = match state.locks.try_acquire(OperationKind::Whitelist) {
        Ok(guard) => guard,
        Err(e) => return error(StatusCode::CONFLICT, e.to_string()),
    };

    let current = match state.contract.as_ref() {
        Some(contract) => match contract.whitelist_only().await {
            Ok(v) => v,
            Err(e) => {
                return error(
                    StatusCode::BAD_GATEWAY,
                    format!("whitelistOnly call failed: {:#}", e),
                )
            }
        },
        None => state.whitelist_only.load(Ordering::SeqCst),
    };
    let enabled = request.enabled.unwrap_or(!current);

    if let Some(contract) = state.contract.as_ref() {
        if enabled != current {
            if let Err(e) = contract.set_whitelist_only(enabled).await {
                return error(
                    StatusCode::BAD_GATEWAY,
                    format!("setWhitelistOnly failed: {:#}", e),
                );
            }
        }
    }
    state.whitelist_only.store(enabled, Ordering::SeqCst);
    info!(enabled, "whitelist-only mode updated");

    ok(json!({ "whitelist_only": enabled, "previous": current }))
}
