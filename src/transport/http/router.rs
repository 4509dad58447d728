use crate::transport::http::handlers::{
    allowlist, commitment, contract, health, mint, requests, snapshot, sync,
};
use crate::transport::http::types::{
    AddAddressesRequest, ApiResponse, AppState, ImportSnapshotRequest, MembershipRequestBody,
    PrepareMintRequest, VerifyProofRequest, WhitelistOnlyRequest,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        allowlist::list_handler,
        allowlist::add_handler,
        allowlist::contains_handler,
        allowlist::remove_handler,
        commitment::commitment_handler,
        commitment::proof_handler,
        commitment::verify_handler,
        requests::list_requests_handler,
        requests::create_request_handler,
        requests::approve_request_handler,
        requests::resolve_request_handler,
        snapshot::export_handler,
        snapshot::import_handler,
        snapshot::backup_handler,
        snapshot::restore_handler,
        sync::sync_handler,
        contract::get_whitelist_only_handler,
        contract::set_whitelist_only_handler,
        mint::prepare_mint_handler
    ),
    components(schemas(
        ApiResponse,
        AddAddressesRequest,
        VerifyProofRequest,
        MembershipRequestBody,
        ImportSnapshotRequest,
        PrepareMintRequest,
        WhitelistOnlyRequest
    ))
)]
#[allow(dead_code)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route(
            "/api/allowlist",
            get(allowlist::list_handler).post(allowlist::add_handler),
        )
        .route(
            "/api/allowlist/:address",
            get(allowlist::contains_handler).delete(allowlist::remove_handler),
        )
        .route("/api/commitment", get(commitment::commitment_handler))
        .route("/api/proof/:address", get(commitment::proof_handler))
        .route("/api/verify", post(commitment::verify_handler))
        .route(
            "/api/requests",
            get(requests::list_requests_handler).post(requests::create_request_handler),
        )
        .route(
            "/api/requests/:id/approve",
            post(requests::approve_request_handler),
        )
        .route(
            "/api/requests/:id",
            axum::routing::delete(requests::resolve_request_handler),
        )
        .route("/api/snapshot", get(snapshot::export_handler))
        .route("/api/snapshot/import", post(snapshot::import_handler))
        .route("/api/backups", post(snapshot::backup_handler))
        .route("/api/backups/restore", post(snapshot::restore_handler))
        .route("/api/sync", post(sync::sync_handler))
        .route(
            "/api/whitelist-only",
            get(contract::get_whitelist_only_handler).post(contract::set_whitelist_only_handler),
        )
        .route("/api/mint/prepare", post(mint::prepare_mint_handler))
        .with_state(app_state)
}
