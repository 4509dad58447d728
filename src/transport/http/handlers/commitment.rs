use crate::domain::commitment::SyncError;
use crate::domain::model::{h256_from_hex, h256_to_hex};
use crate::domain::verify::verify_address_proof;
use crate::transport::http::handlers::common::{
    error, ok, parse_address, parse_h256_list, storage_unavailable,
};
use crate::transport::http::types::{json_422, AppState, VerifyProofRequest, VerifyQuery};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/commitment",
    responses(
        (status = 200, description = "Local commitment and published root", body = ApiResponse),
        (status = 502, description = "Published root could not be read", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn commitment_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = match state.root_manager.check().await {
        Ok(status) => status,
        Err(SyncError::Storage(e)) => return storage_unavailable(&e),
        Err(e) => {
            return error(
                StatusCode::BAD_GATEWAY,
                format!("Failed to read published root: {:#}", e),
            )
        }
    };
    match state.registry.try_addresses().await {
        Ok(addresses) => ok(json!({ "count": addresses.len(), "status": status })),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    get,
    path = "/api/proof/{address}",
    params(("address" = String, Path, description = "0x-prefixed 20-byte address")),
    responses(
        (status = 200, description = "Inclusion proof against the current commitment", body = ApiResponse),
        (status = 400, description = "Malformed address", body = ApiResponse),
        (status = 404, description = "Address is not allowlisted", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn proof_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let address = match parse_address(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.registry.try_prove_membership(&address.to_string()).await {
        Ok(Some(proof)) => ok(json!(proof)),
        Ok(None) => error(
            StatusCode::NOT_FOUND,
            format!("{} is not on the allowlist", address),
        ),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/verify",
    request_body = VerifyProofRequest,
    params(VerifyQuery),
    responses(
        (status = 200, description = "Verification result", body = ApiResponse),
        (status = 400, description = "Malformed input, no root available, or no contract for an on-chain check", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse),
        (status = 502, description = "Contract call failed", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn verify_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    request: Result<Json<VerifyProofRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{\"address\": \"0x...\", \"proof\": [\"0x...\"], \"root\"?: \"0x...\"}")
                .into_response()
        }
    };

    let address = match parse_address(&request.address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let proof = match parse_h256_list(&request.proof) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let root = match request.root.as_deref() {
        Some(raw) => match h256_from_hex(raw) {
            Ok(r) => r,
            Err(e) => {
                return error(StatusCode::BAD_REQUEST, format!("Invalid root '{}': {}", raw, e))
            }
        },
        None => match state.registry.try_compute_commitment().await {
            Ok(Some(r)) => r,
            Ok(None) => {
                return error(
                    StatusCode::BAD_REQUEST,
                    "Allowlist is empty; supply the root to verify against",
                )
            }
            Err(e) => return storage_unavailable(&e),
        },
    };

    let valid = verify_address_proof(root, &address, &proof);
    if !query.onchain {
        return ok(json!({
            "address": address,
            "root": h256_to_hex(&root),
            "valid": valid,
        }));
    }

    let Some(contract) = state.contract.as_ref() else {
        return error(
            StatusCode::BAD_REQUEST,
            "No allowlist contract is configured for on-chain verification",
        );
    };
    match contract.is_whitelisted(address, &proof).await {
        Ok(onchain_valid) => ok(json!({
            "address": address,
            "root": h256_to_hex(&root),
            "valid": valid,
            "onchain_valid": onchain_valid,
        })),
        Err(e) => error(
            StatusCode::BAD_GATEWAY,
            format!("isWhitelisted call failed: {:#}", e),
        ),
    }
}
