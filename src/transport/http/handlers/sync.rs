use crate::domain::commitment::SyncError;
use crate::transport::http::handlers::common::{error, ok, storage_unavailable};
use crate::transport::http::types::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/sync",
    responses(
        (status = 200, description = "Published root matches the local commitment", body = ApiResponse),
        (status = 409, description = "A sync is already running", body = ApiResponse),
        (status = 502, description = "Publisher read or write failed", body = ApiResponse),
        (status = 503, description = "Storage unavailable", body = ApiResponse)
    )
)]
pub async fn sync_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.root_manager.sync().await {
        Ok(outcome) => ok(json!(outcome)),
        Err(SyncError::Busy(e)) => error(StatusCode::CONFLICT, e.to_string()),
        Err(SyncError::Storage(e)) => storage_unavailable(&e),
        Err(SyncError::Publisher(e)) => error(
            StatusCode::BAD_GATEWAY,
            format!("Root publishing failed: {:#}", e),
        ),
    }
}
