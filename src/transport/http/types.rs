use crate::app::operation_lock::OperationLocks;
use crate::app::registry_service::AllowlistRegistry;
use crate::domain::commitment::{AllowlistContract, RootManager};
use crate::storage::KeyValueStore;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

pub type SharedStore = Arc<dyn KeyValueStore>;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AllowlistRegistry<SharedStore>>,
    pub root_manager: Arc<RootManager<SharedStore>>,
    pub locks: OperationLocks,
    /// Present when roots go to an allowlist contract.
    pub contract: Option<Arc<dyn AllowlistContract>>,
    /// Mirrors the contract's `whitelistOnly` flag for mint preparation.
    pub whitelist_only: Arc<AtomicBool>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct AddAddressesRequest {
    /// A single address to add.
    #[serde(default)]
    pub address: Option<String>,
    /// Several addresses to add at once. Malformed and duplicate entries are skipped.
    #[serde(default)]
    pub addresses: Vec<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct VerifyProofRequest {
    pub address: String,
    /// Sibling hashes, `0x`-prefixed 32-byte hex, leaf to root.
    pub proof: Vec<String>,
    /// Root to verify against. Defaults to the current local commitment.
    #[serde(default)]
    pub root: Option<String>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Also ask the contract's `isWhitelisted` about the proof.
    #[serde(default)]
    pub onchain: bool,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct WhitelistOnlyRequest {
    /// New value. Omit to toggle.
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct MembershipRequestBody {
    pub address: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ImportSnapshotRequest {
    /// Merged into the allowlist. Entries not matching `0x` + 40 hex digits are dropped.
    pub addresses: Vec<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct PrepareMintRequest {
    pub minter: String,
    pub token_uri: String,
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::err(format!(
            "Invalid JSON body: {} (expected: {})",
            err, expected
        ))),
    )
}
