//! Keeps the locally derived commitment and the published root in step.
//!
//! The local root is recomputed from the registry on demand; the published
//! root is whatever the verifier currently holds. A mismatch is reported as
//! a [`RootStatus`] with both values, and [`RootManager::sync`] republishes
//! the local root when asked to. `sync` runs under the `Whitelist` operation
//! slot so two syncs can never race each other into the publisher; `check`
//! only reads and takes no slot.

use crate::app::operation_lock::{LockError, OperationKind, OperationLocks};
use crate::app::registry_service::{AllowlistRegistry, StorageFailure};
use crate::domain::commitment::publisher::RootPublisher;
use crate::domain::model::{h256_hex, h256_hex_opt, h256_to_hex, Address};
use crate::storage::KeyValueStore;
use primitive_types::H256;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootStatus {
    /// Commitment over the current set; `None` when the set is empty.
    #[serde(with = "h256_hex_opt")]
    pub local_root: Option<H256>,
    #[serde(with = "h256_hex")]
    pub published_root: H256,
    pub in_sync: bool,
}

impl RootStatus {
    fn new(local_root: Option<H256>, published_root: H256) -> Self {
        // An empty set has nothing to publish, so it only matches an unset root.
        let in_sync = local_root.unwrap_or_else(H256::zero) == published_root;
        Self {
            local_root,
            published_root,
            in_sync,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub status: RootStatus,
    /// True when this call wrote a new root to the publisher.
    pub published: bool,
    /// True when the configured owner was missing from the set and was added.
    pub owner_added: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Busy(#[from] LockError),
    #[error(transparent)]
    Storage(#[from] StorageFailure),
    #[error(transparent)]
    Publisher(#[from] anyhow::Error),
}

pub struct RootManager<S: KeyValueStore> {
    registry: Arc<AllowlistRegistry<S>>,
    publisher: Arc<dyn RootPublisher>,
    locks: OperationLocks,
    /// Address that must always be allowlisted (the contract owner).
    owner: Option<Address>,
}

impl<S: KeyValueStore> RootManager<S> {
    pub fn new(
        registry: Arc<AllowlistRegistry<S>>,
        publisher: Arc<dyn RootPublisher>,
        locks: OperationLocks,
    ) -> Self {
        Self {
            registry,
            publisher,
            locks,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Option<Address>) -> Self {
        self.owner = owner;
        self
    }

    /// Compares the local commitment with the published root.
    pub async fn check(&self) -> Result<RootStatus, SyncError> {
        let local = self.registry.try_compute_commitment().await?;
        let published = self.publisher.published_root().await?;
        let status = RootStatus::new(local, published);
        if !status.in_sync {
            warn!(
                local_root = %local.map(|r| h256_to_hex(&r)).unwrap_or_else(|| "none".into()),
                published_root = %h256_to_hex(&published),
                "local commitment differs from published root"
            );
        }
        Ok(status)
    }

    /// Ensures the owner is allowlisted and republishes the local root if it
    /// differs from the published one. Rejected while another sync runs.
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let _slot = self.locks.try_acquire(OperationKind::Whitelist)?;
        let start = Instant::now();

        let mut owner_added = false;
        if let Some(owner) = self.owner {
            let owner_str = owner.to_string();
            if !self.registry.try_contains(&owner_str).await? {
                owner_added = self.registry.try_add(&owner_str).await?;
                if owner_added {
                    info!(%owner, "owner was missing from allowlist; added");
                }
            }
        }

        let local = self.registry.try_compute_commitment().await?;
        let published = self.publisher.published_root().await?;
        let before = RootStatus::new(local, published);

        let Some(local_root) = local else {
            info!("allowlist is empty; nothing to publish");
            return Ok(SyncOutcome {
                status: before,
                published: false,
                owner_added,
            });
        };

        if before.in_sync {
            info!(
                root = %h256_to_hex(&local_root),
                "published root matches local commitment; no update needed"
            );
            return Ok(SyncOutcome {
                status: before,
                published: false,
                owner_added,
            });
        }

        info!(
            local_root = %h256_to_hex(&local_root),
            published_root = %h256_to_hex(&published),
            "roots differ; publishing local commitment"
        );
        self.publisher.publish_root(local_root).await?;
        info!(elapsed = ?start.elapsed(), "published new root");

        Ok(SyncOutcome {
            status: RootStatus::new(local, local_root),
            published: true,
            owner_added,
        })
    }
}
