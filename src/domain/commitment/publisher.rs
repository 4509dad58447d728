//! Where the published commitment lives: the verifier's view of the root.

use crate::domain::model::Address;
use crate::domain::verify::verify_address_proof;
use async_trait::async_trait;
use primitive_types::H256;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[async_trait]
pub trait RootPublisher: Send + Sync {
    /// The root the verifier currently checks proofs against.
    async fn published_root(&self) -> anyhow::Result<H256>;

    /// Replaces the verifier's root.
    async fn publish_root(&self, root: H256) -> anyhow::Result<()>;
}

/// Mint-side controls of an allowlist-gated contract.
#[async_trait]
pub trait AllowlistContract: Send + Sync {
    /// Whether minting currently requires a valid proof.
    async fn whitelist_only(&self) -> anyhow::Result<bool>;

    async fn set_whitelist_only(&self, enabled: bool) -> anyhow::Result<()>;

    /// Checks `proof` for `address` against the contract's own root.
    async fn is_whitelisted(&self, address: Address, proof: &[H256]) -> anyhow::Result<bool>;
}

/// Structure for the trusted state file
#[derive(Serialize, Deserialize, Debug)]
struct TrustedState {
    root: String, // Hex encoded root
    timestamp: u64,
}

/// Keeps the published root in a local JSON file. A missing file reads as
/// the zero root, matching an unset `bytes32` on chain.
pub struct FilePublisher {
    path: PathBuf,
}

impl FilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_root_from_file(path: &Path) -> anyhow::Result<H256> {
        let content = std::fs::read_to_string(path)?;
        let state: TrustedState = serde_json::from_str(&content)?;
        let root_bytes = hex::decode(state.root.trim_start_matches("0x"))?;
        if root_bytes.len() != 32 {
            return Err(anyhow::anyhow!("Invalid root length in trusted state file"));
        }
        Ok(H256::from_slice(&root_bytes))
    }

    fn save_root_to_file(path: &Path, root: H256) -> anyhow::Result<()> {
        let state = TrustedState {
            root: hex::encode(root.as_bytes()),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)?
                .as_secs(),
        };
        let content = serde_json::to_string_pretty(&state)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[async_trait]
impl RootPublisher for FilePublisher {
    async fn published_root(&self) -> anyhow::Result<H256> {
        if !self.path.exists() {
            return Ok(H256::zero());
        }
        Self::load_root_from_file(&self.path)
    }

    async fn publish_root(&self, root: H256) -> anyhow::Result<()> {
        Self::save_root_to_file(&self.path, root)
    }
}

/// In-process stand-in for the contract, for tests and dry runs.
pub struct MemoryPublisher {
    root: Mutex<H256>,
    publishes: Mutex<u64>,
    whitelist_only: Mutex<bool>,
}

impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::with_root(H256::zero())
    }
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: H256) -> Self {
        Self {
            root: Mutex::new(root),
            publishes: Mutex::new(0),
            whitelist_only: Mutex::new(true),
        }
    }

    /// Number of `publish_root` calls so far.
    pub async fn publish_count(&self) -> u64 {
        *self.publishes.lock().await
    }
}

#[async_trait]
impl RootPublisher for MemoryPublisher {
    async fn published_root(&self) -> anyhow::Result<H256> {
        Ok(*self.root.lock().await)
    }

    async fn publish_root(&self, root: H256) -> anyhow::Result<()> {
        *self.root.lock().await = root;
        *self.publishes.lock().await += 1;
        Ok(())
    }
}

#[async_trait]
impl AllowlistContract for MemoryPublisher {
    async fn whitelist_only(&self) -> anyhow::Result<bool> {
        Ok(*self.whitelist_only.lock().await)
    }

    async fn set_whitelist_only(&self, enabled: bool) -> anyhow::Result<()> {
        *self.whitelist_only.lock().await = enabled;
        Ok(())
    }

    async fn is_whitelisted(&self, address: Address, proof: &[H256]) -> anyhow::Result<bool> {
        let root = *self.root.lock().await;
        Ok(verify_address_proof(root, &address, proof))
    }
}
