use verifiable_allowlist::domain::model::h256_to_hex;
use std::sync::Arc;
use verifiable_allowlist::infra::config::Config;
use verifiable_allowlist::infra::logging::init_logging;
use verifiable_allowlist::{
    AllowlistContract, AllowlistRegistry, KeyValueStore, OperationLocks, RootManager,
};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--sync]\n\
         \n\
         Reads the same env vars as api_server:\n\
           ALLOWLIST_STORE, ALLOWLIST_STORE_PATH, DATABASE_URL,\n\
           ROOT_PUBLISHER, TRUSTED_STATE_PATH, EVM_RPC_URL, ALLOWLIST_CONTRACT, EVM_FROM,\n\
           EVM_PRIVATE_KEY,\n\
           OWNER_ADDRESS, WHITELIST_ONLY\n\
         \n\
         --sync  publish the local root when it differs from the published one\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let sync = args.iter().any(|a| a == "--sync");

    let config = Config::from_env()?;
    println!("> Preflight:");
    println!("  store={:?}", config.store);
    println!("  publisher={:?}", config.publisher);
    if let Some(owner) = config.owner {
        println!("  OWNER_ADDRESS={}", owner);
    }

    // Store reachable and parseable
    let store = config.open_store().await?;
    let keys = store.keys().await?;
    println!("  Store reachable ({} keys).", keys.len());
    let registry = Arc::new(AllowlistRegistry::new(store));
    let count = registry
        .try_addresses()
        .await
        .map_err(|e| anyhow::anyhow!("{}; fix or restore it before starting", e))?
        .len();
    println!("  Allowlist entries: {}", count);

    // Contract checks
    if let Some(client) = config.evm_client()? {
        println!("  Chain id: {}", client.chain_id().await?);
        let whitelist_only = client.whitelist_only().await?;
        println!("  Contract whitelistOnly: {}", whitelist_only);
        if whitelist_only != config.whitelist_only {
            eprintln!(
                "  Warning: WHITELIST_ONLY={} does not match the contract ({}).",
                config.whitelist_only, whitelist_only
            );
        }
    }

    let root_manager = RootManager::new(registry, config.publishing()?.publisher, OperationLocks::new())
        .with_owner(config.owner);
    let status = root_manager.check().await?;
    println!("  Published root: {}", h256_to_hex(&status.published_root));
    match status.local_root {
        Some(root) => println!("  Local root:     {}", h256_to_hex(&root)),
        None => println!("  Local root:     (allowlist empty)"),
    }

    if status.in_sync {
        println!("  Roots match.");
    } else if sync {
        println!("  Roots differ -> publishing local root...");
        let outcome = root_manager.sync().await?;
        if outcome.owner_added {
            println!("  Owner was missing and has been added.");
        }
        println!("  Root published: {}", outcome.published);
    } else {
        return Err(anyhow::anyhow!(
            "Published root does not match the local allowlist. Re-run with --sync"
        ));
    }

    println!("> Preflight OK.");
    Ok(())
}
