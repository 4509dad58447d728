// src/bin/api_server.rs

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use verifiable_allowlist::domain::model::h256_to_hex;
use verifiable_allowlist::infra::logging::init_logging;
use verifiable_allowlist::transport;
use verifiable_allowlist::{AllowlistContract, AllowlistRegistry, Config, OperationLocks, RootManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = Config::from_env()?;

    // --- Storage + registry ---
    info!(store = ?config.store, "opening allowlist store");
    let store = config.open_store().await?;
    let registry = Arc::new(AllowlistRegistry::new(store));
    match registry.try_addresses().await {
        Ok(addresses) => info!(count = addresses.len(), "allowlist loaded"),
        Err(e) => warn!(error = %e, "allowlist could not be read at startup; affected routes return 503 until it recovers"),
    }

    // --- Root manager + contract ---
    let publishing = config.publishing()?;
    let locks = OperationLocks::new();
    let root_manager = Arc::new(
        RootManager::new(registry.clone(), publishing.publisher, locks.clone())
            .with_owner(config.owner),
    );
    let whitelist_only = match &publishing.contract {
        Some(contract) => match contract.whitelist_only().await {
            Ok(onchain) => {
                if onchain != config.whitelist_only {
                    info!(onchain, configured = config.whitelist_only, "using the contract's whitelistOnly flag");
                }
                onchain
            }
            Err(e) => {
                warn!(error = %e, fallback = config.whitelist_only, "could not read whitelistOnly from the contract");
                config.whitelist_only
            }
        },
        None => config.whitelist_only,
    };
    // Log root alignment at startup (helps spot a stale published root).
    match root_manager.check().await {
        Ok(status) => info!(
            local_root = %status.local_root.map(|r| h256_to_hex(&r)).unwrap_or_else(|| "none".to_string()),
            published_root = %h256_to_hex(&status.published_root),
            in_sync = status.in_sync,
            "startup roots"
        ),
        Err(e) => warn!(error = %e, "could not read published root at startup"),
    }

    let app_state = transport::http::AppState {
        registry,
        root_manager: root_manager.clone(),
        locks,
        contract: publishing.contract,
        whitelist_only: Arc::new(AtomicBool::new(whitelist_only)),
    };

    // --- API server ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "API server listening");
    info!("Swagger UI available at /swagger-ui");
    info!("Press Ctrl+C to shut down; the local root is published before exit");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received; syncing root before exit");
            match root_manager.sync().await {
                Ok(outcome) => info!(published = outcome.published, "final root sync complete"),
                Err(e) => error!(error = %e, "final root sync failed"),
            }
            info!("graceful shutdown complete");
        }
    }

    Ok(())
}
