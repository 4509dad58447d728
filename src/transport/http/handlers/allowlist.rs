use crate::transport::http::handlers::common::{error, ok, parse_address, storage_unavailable};
use crate::transport::http::types::{json_422, AddAddressesRequest, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/allowlist",
    responses(
        (status = 200, description = "All allowlisted addresses in insertion order", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn list_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.try_addresses().await {
        Ok(addresses) => ok(json!({ "count": addresses.len(), "addresses": addresses })),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/allowlist",
    request_body = AddAddressesRequest,
    responses(
        (status = 200, description = "Addresses added (duplicates are reported, not rejected)", body = ApiResponse),
        (status = 400, description = "Malformed address or empty request", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn add_handler(
    State(state): State<AppState>,
    request: Result<Json<AddAddressesRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{\"address\": \"0x...\"} or {\"addresses\": [\"0x...\"]}")
                .into_response()
        }
    };

    match (request.address, request.addresses.is_empty()) {
        (Some(single), true) => {
            let address = match parse_address(&single) {
                Ok(a) => a,
                Err(resp) => return resp,
            };
            match state.registry.try_add(&address.to_string()).await {
                Ok(added) => ok(json!({ "address": address, "added": added })),
                Err(e) => storage_unavailable(&e),
            }
        }
        (None, false) => match state.registry.try_add_batch(&request.addresses).await {
            Ok(added) => ok(json!({ "requested": request.addresses.len(), "added": added })),
            Err(e) => storage_unavailable(&e),
        },
        (None, true) => error(StatusCode::BAD_REQUEST, "No address supplied"),
        (Some(_), false) => error(
            StatusCode::BAD_REQUEST,
            "Supply either `address` or `addresses`, not both",
        ),
    }
}

#[utoipa::path(
    get,
    path = "/api/allowlist/{address}",
    params(("address" = String, Path, description = "0x-prefixed 20-byte address")),
    responses(
        (status = 200, description = "Membership check", body = ApiResponse),
        (status = 400, description = "Malformed address", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn contains_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.registry.try_contains(&address.to_string()).await {
        Ok(allowlisted) => ok(json!({ "address": address, "allowlisted": allowlisted })),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/allowlist/{address}",
    params(("address" = String, Path, description = "0x-prefixed 20-byte address")),
    responses(
        (status = 200, description = "Address removed", body = ApiResponse),
        (status = 400, description = "Malformed address", body = ApiResponse),
        (status = 404, description = "Address was not allowlisted", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn remove_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.registry.try_remove(&address.to_string()).await {
        Ok(true) => ok(json!({ "address": address, "removed": true })),
        Ok(false) => error(
            StatusCode::NOT_FOUND,
            format!("{} is not on the allowlist", address),
        ),
        Err(e) => storage_unavailable(&e),
    }
}
