use crate::transport::http::handlers::common::{error, ok, parse_address, storage_unavailable};
use crate::transport::http::types::{json_422, AppState, MembershipRequestBody};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/requests",
    responses(
        (status = 200, description = "Pending membership requests", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn list_requests_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.try_pending_requests().await {
        Ok(requests) => ok(json!({ "count": requests.len(), "requests": requests })),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = MembershipRequestBody,
    responses(
        (status = 200, description = "Request recorded", body = ApiResponse),
        (status = 400, description = "Malformed address", body = ApiResponse),
        (status = 409, description = "Address already has a pending request", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn create_request_handler(
    State(state): State<AppState>,
    request: Result<Json<MembershipRequestBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{\"address\": \"0x...\", \"reason\"?: \"...\"}").into_response()
        }
    };
    let address = match parse_address(&request.address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    match state
        .registry
        .try_request_membership(&address.to_string(), &request.reason)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return error(
                StatusCode::CONFLICT,
                format!("{} already has a pending request", address),
            )
        }
        Err(e) => return storage_unavailable(&e),
    }

    match state.registry.try_pending_requests().await {
        Ok(requests) => {
            let created = requests.into_iter().find(|r| r.address == address);
            ok(json!({ "request": created }))
        }
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/approve",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request approved and address allowlisted", body = ApiResponse),
        (status = 404, description = "No such request", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn approve_request_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.try_approve_request(&id).await {
        Ok(true) => ok(json!({ "id": id, "approved": true })),
        Ok(false) => error(StatusCode::NOT_FOUND, format!("No request with id {}", id)),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request dropped without allowlisting", body = ApiResponse),
        (status = 404, description = "No such request", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn resolve_request_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.try_resolve_request(&id).await {
        Ok(true) => ok(json!({ "id": id, "resolved": true })),
        Ok(false) => error(StatusCode::NOT_FOUND, format!("No request with id {}", id)),
        Err(e) => storage_unavailable(&e),
    }
}
