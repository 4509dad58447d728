use crate::transport::http::handlers::common::{error, ok, storage_unavailable};
use crate::transport::http::types::{json_422, AppState, ImportSnapshotRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/snapshot",
    responses(
        (status = 200, description = "Exported allowlist with export date", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.try_export_snapshot().await {
        Ok(snapshot) => ok(json!(snapshot)),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/snapshot/import",
    request_body = ImportSnapshotRequest,
    responses(
        (status = 200, description = "Well-formed entries imported", body = ApiResponse),
        (status = 400, description = "No well-formed entries supplied", body = ApiResponse),
        (status = 422, description = "Invalid JSON body", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn import_handler(
    State(state): State<AppState>,
    request: Result<Json<ImportSnapshotRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{\"addresses\": [\"0x...\"]}").into_response(),
    };

    match state.registry.try_import_snapshot(&request.addresses).await {
        Ok(true) => {}
        Ok(false) => {
            return error(
                StatusCode::BAD_REQUEST,
                "No well-formed addresses in import",
            )
        }
        Err(e) => return storage_unavailable(&e),
    }
    match state.registry.try_addresses().await {
        Ok(addresses) => ok(json!({ "imported": true, "count": addresses.len() })),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/backups",
    responses(
        (status = 200, description = "Backup stored", body = ApiResponse),
        (status = 409, description = "Allowlist is empty; nothing to back up", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn backup_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.try_backup().await {
        Ok(Some(key)) => ok(json!({ "key": key })),
        Ok(None) => error(
            StatusCode::CONFLICT,
            "Allowlist is empty; nothing to back up",
        ),
        Err(e) => storage_unavailable(&e),
    }
}

#[utoipa::path(
    post,
    path = "/api/backups/restore",
    responses(
        (status = 200, description = "Allowlist replaced by the newest backup", body = ApiResponse),
        (status = 404, description = "No readable backup found", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn restore_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.try_restore_latest_backup().await {
        Ok(Some(count)) => ok(json!({ "restored": count })),
        Ok(None) => error(StatusCode::NOT_FOUND, "No backup found"),
        Err(e) => storage_unavailable(&e),
    }
}
