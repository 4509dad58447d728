//! Centralized configuration (environment variables + defaults).

use crate::domain::commitment::{AllowlistContract, FilePublisher, RootPublisher};
use crate::domain::model::Address;
use crate::infra::evm::EvmRootPublisher;
use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore, PostgresStore};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_STORE_PATH: &str = "allowlist_store.json";
const DEFAULT_TRUSTED_STATE_PATH: &str = "trusted_state.json";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File(PathBuf),
    Postgres(String),
}

/// Hex-encoded signing key, kept out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherBackend {
    File(PathBuf),
    Evm {
        rpc_url: String,
        contract: Address,
        from: Option<Address>,
        private_key: Option<PrivateKey>,
    },
}

/// Where roots go, plus the contract handle when the target is on chain.
pub struct Publishing {
    pub publisher: Arc<dyn RootPublisher>,
    pub contract: Option<Arc<dyn AllowlistContract>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store: StoreBackend,
    pub publisher: PublisherBackend,
    pub bind_addr: String,
    /// Address kept on the allowlist by every root sync.
    pub owner: Option<Address>,
    /// Whether mint preparation requires allowlist membership.
    pub whitelist_only: bool,
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn parse_address(var: &str, raw: &str) -> anyhow::Result<Address> {
    raw.trim()
        .parse()
        .with_context(|| format!("{} is not a valid address: {}", var, raw))
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_kind = var("ALLOWLIST_STORE").unwrap_or_else(|| "file".to_string());
        let store = match store_kind.to_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "file" => StoreBackend::File(expand_path(
                &var("ALLOWLIST_STORE_PATH").unwrap_or_else(|| DEFAULT_STORE_PATH.to_string()),
            )),
            "postgres" => StoreBackend::Postgres(
                var("DATABASE_URL")
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for ALLOWLIST_STORE=postgres"))?,
            ),
            other => return Err(anyhow::anyhow!("Unknown ALLOWLIST_STORE: {}", other)),
        };

        let publisher_kind = var("ROOT_PUBLISHER").unwrap_or_else(|| "file".to_string());
        let publisher = match publisher_kind.to_lowercase().as_str() {
            "file" => PublisherBackend::File(expand_path(
                &var("TRUSTED_STATE_PATH")
                    .unwrap_or_else(|| DEFAULT_TRUSTED_STATE_PATH.to_string()),
            )),
            "evm" => {
                let rpc_url = var("EVM_RPC_URL")
                    .ok_or_else(|| anyhow::anyhow!("EVM_RPC_URL must be set for ROOT_PUBLISHER=evm"))?;
                let contract_raw = var("ALLOWLIST_CONTRACT").ok_or_else(|| {
                    anyhow::anyhow!("ALLOWLIST_CONTRACT must be set for ROOT_PUBLISHER=evm")
                })?;
                let contract = parse_address("ALLOWLIST_CONTRACT", &contract_raw)?;
                let from = var("EVM_FROM")
                    .map(|raw| parse_address("EVM_FROM", &raw))
                    .transpose()?;
                PublisherBackend::Evm {
                    rpc_url,
                    contract,
                    from,
                    private_key: var("EVM_PRIVATE_KEY").map(PrivateKey),
                }
            }
            other => return Err(anyhow::anyhow!("Unknown ROOT_PUBLISHER: {}", other)),
        };

        let owner = var("OWNER_ADDRESS")
            .map(|raw| parse_address("OWNER_ADDRESS", &raw))
            .transpose()?;

        let whitelist_only = match var("WHITELIST_ONLY") {
            None => true,
            Some(v) => match v.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => return Err(anyhow::anyhow!("WHITELIST_ONLY must be a boolean, got {}", other)),
            },
        };

        Ok(Self {
            store,
            publisher,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            owner,
            whitelist_only,
        })
    }

    /// Opens the configured key/value store.
    pub async fn open_store(&self) -> anyhow::Result<Arc<dyn KeyValueStore>> {
        Ok(match &self.store {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::File(path) => Arc::new(JsonFileStore::new(path.clone())),
            StoreBackend::Postgres(url) => Arc::new(PostgresStore::connect(url).await?),
        })
    }

    /// Connects to the allowlist contract when `ROOT_PUBLISHER=evm`.
    pub fn evm_client(&self) -> anyhow::Result<Option<Arc<EvmRootPublisher>>> {
        match &self.publisher {
            PublisherBackend::File(_) => Ok(None),
            PublisherBackend::Evm {
                rpc_url,
                contract,
                from,
                private_key,
            } => Ok(Some(Arc::new(EvmRootPublisher::connect(
                rpc_url,
                *contract,
                private_key.as_ref().map(PrivateKey::expose),
                *from,
            )?))),
        }
    }

    pub fn publishing(&self) -> anyhow::Result<Publishing> {
        if let PublisherBackend::File(path) = &self.publisher {
            return Ok(Publishing {
                publisher: Arc::new(FilePublisher::new(path.clone())),
                contract: None,
            });
        }
        let client = self
            .evm_client()?
            .ok_or_else(|| anyhow::anyhow!("ROOT_PUBLISHER=evm has no contract configured"))?;
        Ok(Publishing {
            publisher: client.clone(),
            contract: Some(client),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.store, StoreBackend::File(PathBuf::from(DEFAULT_STORE_PATH)));
        assert_eq!(
            cfg.publisher,
            PublisherBackend::File(PathBuf::from(DEFAULT_TRUSTED_STATE_PATH))
        );
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.owner, None);
        assert!(cfg.whitelist_only);
    }

    #[test]
    fn evm_publisher_requires_rpc_and_contract() {
        assert!(config(&[("ROOT_PUBLISHER", "evm")]).is_err());
        assert!(config(&[("ROOT_PUBLISHER", "evm"), ("EVM_RPC_URL", "http://localhost:8545")]).is_err());

        let contract = format!("0x{}", "AA".repeat(20));
        let cfg = config(&[
            ("ROOT_PUBLISHER", "evm"),
            ("EVM_RPC_URL", "http://localhost:8545"),
            ("ALLOWLIST_CONTRACT", &contract),
        ])
        .unwrap();
        match cfg.publisher {
            PublisherBackend::Evm { contract: c, from, private_key, .. } => {
                assert_eq!(c.to_string(), contract.to_lowercase());
                assert_eq!(from, None);
                assert_eq!(private_key, None);
            }
            other => panic!("unexpected publisher {:?}", other),
        }
    }

    #[test]
    fn private_key_is_redacted() {
        let contract = format!("0x{}", "AA".repeat(20));
        let key = format!("0x{}", "01".repeat(32));
        let cfg = config(&[
            ("ROOT_PUBLISHER", "evm"),
            ("EVM_RPC_URL", "http://localhost:8545"),
            ("ALLOWLIST_CONTRACT", &contract),
            ("EVM_PRIVATE_KEY", &key),
        ])
        .unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains(&key[2..]));
        assert!(printed.contains("redacted"));

        let publishing = cfg.publishing().unwrap();
        assert!(publishing.contract.is_some());
    }

    #[test]
    fn file_publisher_has_no_contract() {
        let publishing = config(&[]).unwrap().publishing().unwrap();
        assert!(publishing.contract.is_none());
    }

    #[test]
    fn postgres_store_requires_database_url() {
        assert!(config(&[("ALLOWLIST_STORE", "postgres")]).is_err());
        let cfg = config(&[
            ("ALLOWLIST_STORE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/allowlist"),
        ])
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreBackend::Postgres("postgres://localhost/allowlist".to_string())
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("ALLOWLIST_STORE", "redis")]).is_err());
        assert!(config(&[("OWNER_ADDRESS", "0x12")]).is_err());
        assert!(config(&[("WHITELIST_ONLY", "maybe")]).is_err());
        assert!(!config(&[("WHITELIST_ONLY", "false")]).unwrap().whitelist_only);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config(&[("ALLOWLIST_STORE", "  "), ("BIND_ADDR", "")]).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert!(matches!(cfg.store, StoreBackend::File(_)));
    }

    #[tokio::test]
    async fn memory_store_opens() {
        let cfg = config(&[("ALLOWLIST_STORE", "memory")]).unwrap();
        let store = cfg.open_store().await.unwrap();
        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
