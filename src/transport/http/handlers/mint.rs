use crate::app::mint::{prepare_mint, MintError};
use crate::transport::http::handlers::common::{error, ok};
use crate::transport::http::types::{json_422, AppState, PrepareMintRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;

#[utoipa::path(
    post,
    path = "/api/mint/prepare",
    request_body = PrepareMintRequest,
    responses(
        (status = 200, description = "Arguments for the contract's mint call", body = ApiResponse),
        (status = 400, description = "Malformed minter or empty token URI", body = ApiResponse),
        (status = 403, description = "Minter is not allowlisted", body = ApiResponse),
        (status = 409, description = "A mint is already being prepared", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn prepare_mint_handler(
    State(state): State<AppState>,
    request: Result<Json<PrepareMintRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{\"minter\": \"0x...\", \"token_uri\": \"...\"}").into_response()
        }
    };

    match prepare_mint(
        state.registry.as_ref(),
        &state.locks,
        &request.minter,
        &request.token_uri,
        state.whitelist_only.load(Ordering::SeqCst),
    )
    .await
    {
        Ok(mint) => ok(json!(mint)),
        Err(e @ MintError::Busy(_)) => error(StatusCode::CONFLICT, e.to_string()),
        Err(e @ MintError::NotAllowlisted(_)) => error(StatusCode::FORBIDDEN, e.to_string()),
        Err(e @ MintError::StorageUnavailable(_)) => {
            error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e @ (MintError::InvalidAddress(_) | MintError::EmptyTokenUri)) => {
            error(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}
