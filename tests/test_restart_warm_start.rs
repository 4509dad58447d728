//! Restart / warm-start test:
//! 1) Start a server over a JSON file store and file publisher, add addresses and sync the root.
//! 2) Stop the server (simulated restart).
//! 3) Start again over the same files without re-adding anything.
//! 4) Ensure the allowlist, the published root and proofs are served immediately.

use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use verifiable_allowlist::domain::model::h256_from_hex;
use verifiable_allowlist::{
    transport, verify_membership_proof, AllowlistRegistry, FilePublisher, JsonFileStore,
    KeyValueStore, OperationLocks, RootManager, RootPublisher,
};

fn addr(b: u8) -> String {
    format!("0x{}", hex::encode([b; 20]))
}

async fn start_server(
    dir: &Path,
) -> Result<(String, tokio::task::JoinHandle<()>), Box<dyn std::error::Error>> {
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.join("allowlist_store.json")));
    let registry = Arc::new(AllowlistRegistry::new(store));
    let publisher: Arc<dyn RootPublisher> = Arc::new(FilePublisher::new(dir.join("trusted_state.json")));
    let locks = OperationLocks::new();
    let root_manager = Arc::new(RootManager::new(registry.clone(), publisher, locks.clone()));
    let state = transport::http::AppState {
        registry,
        root_manager,
        locks,
        contract: None,
        whitelist_only: Arc::new(AtomicBool::new(true)),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let router = transport::http::create_router(state);
    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Ok((base_url, server))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restart_warm_start() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    // --- Phase A: populate and publish ---
    let (base_url_a, server_a) = start_server(dir.path()).await?;
    let added = client
        .post(format!("{}/api/allowlist", base_url_a))
        .json(&json!({ "addresses": [addr(1), addr(2), addr(3)] }))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert!(added["success"].as_bool().unwrap_or(false));
    assert_eq!(added["data"]["added"], 3);

    let synced = client
        .post(format!("{}/api/sync", base_url_a))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(synced["data"]["published"], true);
    let published_root = synced["data"]["status"]["published_root"].clone();

    // Shutdown server A (simulated restart).
    server_a.abort();
    let _ = server_a.await;

    // --- Phase B: same files, no re-population ---
    let (base_url_b, server_b) = start_server(dir.path()).await?;

    let commitment = client
        .get(format!("{}/api/commitment", base_url_b))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(commitment["data"]["count"], 3);
    assert_eq!(commitment["data"]["status"]["in_sync"], true);
    assert_eq!(commitment["data"]["status"]["published_root"], published_root);

    let proof = client
        .get(format!("{}/api/proof/{}", base_url_b, addr(2)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert!(proof["success"].as_bool().unwrap_or(false));

    // The proof holds against the root read back from the trusted state file.
    let trusted = FilePublisher::new(dir.path().join("trusted_state.json"))
        .published_root()
        .await?;
    let leaf = h256_from_hex(proof["data"]["leaf"].as_str().unwrap())?;
    let siblings: Vec<_> = proof["data"]["siblings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| h256_from_hex(s.as_str().unwrap()).unwrap())
        .collect();
    assert!(verify_membership_proof(trusted, leaf, &siblings));

    server_b.abort();
    let _ = server_b.await;
    Ok(())
}
