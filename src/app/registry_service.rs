//! The Allowlist Registry.
//!
//! Owns the approved-address set and the pending-request list inside an
//! injected [`KeyValueStore`], and derives commitments and inclusion proofs
//! from the current set on demand.
//!
//! Every operation comes in two forms. The `try_*` form reports a storage or
//! parse failure as [`StorageFailure`] for the call that hit it. The plain
//! form never fails: malformed input resolves to `false`/`None` and storage
//! failures are logged and fall back to an empty view. Writes never overwrite
//! data that failed to load.

use crate::crypto::hashing::hash_leaf;
use crate::domain::merkle::SortedMerkleTree;
use crate::domain::model::{Address, Backup, MembershipProof, PendingRequest, Snapshot};
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use primitive_types::H256;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const ADDRESSES_KEY: &str = "whitelistedAddresses";
pub const REQUESTS_KEY: &str = "whitelistRequests";
pub const BACKUP_PREFIX: &str = "whitelist_backup_";

/// The store could not be read or written, or held data that does not parse.
#[derive(Debug, thiserror::Error)]
#[error("allowlist storage failure in {operation}: {cause:#}")]
pub struct StorageFailure {
    pub operation: &'static str,
    cause: anyhow::Error,
}

fn storage_failure(operation: &'static str, cause: anyhow::Error) -> StorageFailure {
    warn!(operation, error = %cause, "allowlist storage failure");
    StorageFailure { operation, cause }
}

pub struct AllowlistRegistry<S: KeyValueStore> {
    store: S,
    /// Serializes read-modify-write cycles issued through this instance.
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> AllowlistRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Persistence helpers ---

    async fn load_addresses(&self) -> anyhow::Result<Vec<Address>> {
        let Some(raw) = self.store.get(ADDRESSES_KEY).await? else {
            return Ok(Vec::new());
        };
        let entries: Vec<String> = serde_json::from_str(&raw)?;
        let mut seen = HashSet::with_capacity(entries.len());
        let mut addresses = Vec::with_capacity(entries.len());
        for entry in entries {
            match Address::parse_lenient(&entry) {
                Some(a) if seen.insert(a) => addresses.push(a),
                Some(_) => debug!(entry = %entry, "skipping duplicate persisted address"),
                None => warn!(entry = %entry, "skipping malformed persisted address"),
            }
        }
        Ok(addresses)
    }

    async fn save_addresses(&self, addresses: &[Address]) -> anyhow::Result<()> {
        self.store
            .set(ADDRESSES_KEY, serde_json::to_string(addresses)?)
            .await
    }

    async fn load_requests(&self) -> anyhow::Result<Vec<PendingRequest>> {
        match self.store.get(REQUESTS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_requests(&self, requests: &[PendingRequest]) -> anyhow::Result<()> {
        self.store
            .set(REQUESTS_KEY, serde_json::to_string(requests)?)
            .await
    }

    // --- Set operations ---

    /// Adds one address. `Ok(false)` for duplicates and malformed input.
    pub async fn try_add(&self, address: &str) -> Result<bool, StorageFailure> {
        let Some(address) = Address::parse_lenient(address.trim()) else {
            debug!(input = address, "rejecting malformed address");
            return Ok(false);
        };
        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<bool> = async {
            let mut addresses = self.load_addresses().await?;
            if addresses.contains(&address) {
                return Ok(false);
            }
            addresses.push(address);
            self.save_addresses(&addresses).await?;
            Ok(true)
        }
        .await;

        let added = result.map_err(|e| storage_failure("add", e))?;
        if added {
            info!(%address, "added to allowlist");
        } else {
            debug!(%address, "already in allowlist");
        }
        Ok(added)
    }

    pub async fn add(&self, address: &str) -> bool {
        self.try_add(address).await.unwrap_or(false)
    }

    /// Adds every well-formed, absent address with a single write.
    /// Returns how many were actually inserted.
    pub async fn try_add_batch<T: AsRef<str>>(
        &self,
        addresses: &[T],
    ) -> Result<usize, StorageFailure> {
        let parsed: Vec<Address> = addresses
            .iter()
            .filter_map(|a| Address::parse_lenient(a.as_ref().trim()))
            .collect();
        if parsed.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<usize> = async {
            let mut current = self.load_addresses().await?;
            let mut seen: HashSet<Address> = current.iter().copied().collect();
            let mut inserted = 0usize;
            for a in parsed {
                if seen.insert(a) {
                    current.push(a);
                    inserted += 1;
                }
            }
            if inserted > 0 {
                self.save_addresses(&current).await?;
            }
            Ok(inserted)
        }
        .await;

        let inserted = result.map_err(|e| storage_failure("add_batch", e))?;
        info!(
            inserted,
            supplied = addresses.len(),
            "batch added to allowlist"
        );
        Ok(inserted)
    }

    pub async fn add_batch<T: AsRef<str>>(&self, addresses: &[T]) -> usize {
        self.try_add_batch(addresses).await.unwrap_or(0)
    }

    pub async fn try_remove(&self, address: &str) -> Result<bool, StorageFailure> {
        let Some(address) = Address::parse_lenient(address.trim()) else {
            return Ok(false);
        };
        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<bool> = async {
            let mut addresses = self.load_addresses().await?;
            let before = addresses.len();
            addresses.retain(|a| *a != address);
            if addresses.len() == before {
                return Ok(false);
            }
            self.save_addresses(&addresses).await?;
            Ok(true)
        }
        .await;

        let removed = result.map_err(|e| storage_failure("remove", e))?;
        if removed {
            info!(%address, "removed from allowlist");
        } else {
            debug!(%address, "not in allowlist");
        }
        Ok(removed)
    }

    pub async fn remove(&self, address: &str) -> bool {
        self.try_remove(address).await.unwrap_or(false)
    }

    pub async fn try_contains(&self, address: &str) -> Result<bool, StorageFailure> {
        let Some(address) = Address::parse_lenient(address.trim()) else {
            return Ok(false);
        };
        let addresses = self.try_addresses().await?;
        Ok(addresses.contains(&address))
    }

    pub async fn contains(&self, address: &str) -> bool {
        self.try_contains(address).await.unwrap_or(false)
    }

    /// The current set in persisted order.
    pub async fn try_addresses(&self) -> Result<Vec<Address>, StorageFailure> {
        self.load_addresses()
            .await
            .map_err(|e| storage_failure("addresses", e))
    }

    pub async fn addresses(&self) -> Vec<Address> {
        self.try_addresses().await.unwrap_or_default()
    }

    // --- Commitments and proofs ---

    async fn build_tree(&self) -> Result<Option<SortedMerkleTree>, StorageFailure> {
        let addresses = self.try_addresses().await?;
        let leaves = addresses.iter().map(|a| hash_leaf(a.as_h160())).collect();
        Ok(SortedMerkleTree::from_leaves(leaves))
    }

    /// Merkle root over the current set, `Ok(None)` when the set is empty.
    pub async fn try_compute_commitment(&self) -> Result<Option<H256>, StorageFailure> {
        let tree = self.build_tree().await?;
        if tree.is_none() {
            debug!("allowlist is empty; no commitment");
        }
        Ok(tree.map(|t| t.root()))
    }

    pub async fn compute_commitment(&self) -> Option<H256> {
        self.try_compute_commitment().await.ok().flatten()
    }

    /// Inclusion proof for `address`, `Ok(None)` if it is not a member.
    pub async fn try_prove_membership(
        &self,
        address: &str,
    ) -> Result<Option<MembershipProof>, StorageFailure> {
        let Some(address) = Address::parse_lenient(address.trim()) else {
            return Ok(None);
        };
        let Some(tree) = self.build_tree().await? else {
            return Ok(None);
        };
        let leaf = hash_leaf(address.as_h160());
        let Some(siblings) = tree.proof(&leaf) else {
            debug!(%address, "cannot prove membership for non-member");
            return Ok(None);
        };
        Ok(Some(MembershipProof {
            address,
            leaf,
            root: tree.root(),
            siblings,
        }))
    }

    pub async fn prove_membership(&self, address: &str) -> Option<MembershipProof> {
        self.try_prove_membership(address).await.ok().flatten()
    }

    // --- Pending requests ---

    /// Records a request to join. `Ok(false)` if the address already has a
    /// pending request or is malformed.
    pub async fn try_request_membership(
        &self,
        address: &str,
        reason: &str,
    ) -> Result<bool, StorageFailure> {
        let Some(address) = Address::parse_lenient(address.trim()) else {
            return Ok(false);
        };
        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<bool> = async {
            let mut requests = self.load_requests().await?;
            if requests.iter().any(|r| r.address == address) {
                return Ok(false);
            }
            let now = Utc::now();
            let mut id = now.timestamp_millis();
            while requests.iter().any(|r| r.id == id.to_string()) {
                id += 1;
            }
            requests.push(PendingRequest {
                id: id.to_string(),
                address,
                timestamp: now,
                reason: reason.to_string(),
            });
            self.save_requests(&requests).await?;
            Ok(true)
        }
        .await;

        let created = result.map_err(|e| storage_failure("request_membership", e))?;
        if created {
            info!(%address, "membership request recorded");
        } else {
            debug!(%address, "address already has a pending request");
        }
        Ok(created)
    }

    pub async fn request_membership(&self, address: &str, reason: &str) -> bool {
        self.try_request_membership(address, reason)
            .await
            .unwrap_or(false)
    }

    pub async fn try_pending_requests(&self) -> Result<Vec<PendingRequest>, StorageFailure> {
        self.load_requests()
            .await
            .map_err(|e| storage_failure("pending_requests", e))
    }

    pub async fn pending_requests(&self) -> Vec<PendingRequest> {
        self.try_pending_requests().await.unwrap_or_default()
    }

    /// Drops a request without allowlisting. Returns whether it existed.
    pub async fn try_resolve_request(&self, request_id: &str) -> Result<bool, StorageFailure> {
        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<bool> = async {
            let mut requests = self.load_requests().await?;
            let before = requests.len();
            requests.retain(|r| r.id != request_id);
            if requests.len() == before {
                return Ok(false);
            }
            self.save_requests(&requests).await?;
            Ok(true)
        }
        .await;

        let resolved = result.map_err(|e| storage_failure("resolve_request", e))?;
        if resolved {
            info!(request_id, "membership request resolved");
        }
        Ok(resolved)
    }

    pub async fn resolve_request(&self, request_id: &str) -> bool {
        self.try_resolve_request(request_id).await.unwrap_or(false)
    }

    /// Adds the requesting address to the set and then drops the request.
    ///
    /// The address is written first. If dropping the request then fails, the
    /// request stays pending and approving it again completes the job.
    pub async fn try_approve_request(&self, request_id: &str) -> Result<bool, StorageFailure> {
        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<bool> = async {
            let mut requests = self.load_requests().await?;
            let Some(pos) = requests.iter().position(|r| r.id == request_id) else {
                return Ok(false);
            };
            let address = requests[pos].address;

            let mut addresses = self.load_addresses().await?;
            if !addresses.contains(&address) {
                addresses.push(address);
                self.save_addresses(&addresses).await?;
            }
            requests.remove(pos);
            if let Err(e) = self.save_requests(&requests).await {
                warn!(
                    request_id,
                    %address,
                    "address allowlisted but request is still pending; approve again to clear it"
                );
                return Err(e);
            }
            Ok(true)
        }
        .await;

        let approved = result.map_err(|e| storage_failure("approve_request", e))?;
        if approved {
            info!(request_id, "membership request approved");
        }
        Ok(approved)
    }

    pub async fn approve_request(&self, request_id: &str) -> bool {
        self.try_approve_request(request_id).await.unwrap_or(false)
    }

    // --- Snapshots and backups ---

    pub async fn try_export_snapshot(&self) -> Result<Snapshot, StorageFailure> {
        Ok(Snapshot {
            addresses: self.try_addresses().await?,
            export_date: Utc::now(),
        })
    }

    pub async fn export_snapshot(&self) -> Snapshot {
        self.try_export_snapshot().await.unwrap_or_else(|_| Snapshot {
            addresses: Vec::new(),
            export_date: Utc::now(),
        })
    }

    /// Merges well-formed entries, discarding the rest. `Ok(true)` when at
    /// least one well-formed entry was supplied, even if all were present.
    pub async fn try_import_snapshot<T: AsRef<str>>(
        &self,
        addresses: &[T],
    ) -> Result<bool, StorageFailure> {
        let valid: Vec<&str> = addresses
            .iter()
            .map(|a| a.as_ref())
            .filter(|a| Address::is_well_formed(a))
            .collect();
        if valid.is_empty() {
            debug!(supplied = addresses.len(), "import rejected: no valid addresses");
            return Ok(false);
        }
        let discarded = addresses.len() - valid.len();
        if discarded > 0 {
            warn!(discarded, "import discarded malformed addresses");
        }
        self.try_add_batch(&valid).await?;
        Ok(true)
    }

    pub async fn import_snapshot<T: AsRef<str>>(&self, addresses: &[T]) -> bool {
        self.try_import_snapshot(addresses).await.unwrap_or(false)
    }

    /// Stores a timestamped copy of the set. Returns the backup key, or
    /// `Ok(None)` when there is nothing to back up.
    pub async fn try_backup(&self) -> Result<Option<String>, StorageFailure> {
        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<Option<String>> = async {
            let addresses = self.load_addresses().await?;
            if addresses.is_empty() {
                return Ok(None);
            }
            let existing: HashSet<String> = self.store.keys().await?.into_iter().collect();
            let now = Utc::now();
            let mut millis = now.timestamp_millis();
            while existing.contains(&format!("{BACKUP_PREFIX}{millis}")) {
                millis += 1;
            }
            let key = format!("{BACKUP_PREFIX}{millis}");
            let backup = Backup {
                timestamp: now,
                addresses,
            };
            self.store.set(&key, serde_json::to_string(&backup)?).await?;
            Ok(Some(key))
        }
        .await;

        let key = result.map_err(|e| storage_failure("backup", e))?;
        match &key {
            Some(k) => info!(key = %k, "allowlist backup created"),
            None => debug!("allowlist is empty; no backup created"),
        }
        Ok(key)
    }

    pub async fn backup(&self) -> Option<String> {
        self.try_backup().await.ok().flatten()
    }

    async fn latest_backup(&self) -> anyhow::Result<Option<(String, Backup)>> {
        let mut latest: Option<(DateTime<Utc>, i64, String, Backup)> = None;
        for key in self.store.keys().await? {
            let Some(suffix) = key.strip_prefix(BACKUP_PREFIX) else {
                continue;
            };
            let order = suffix.parse::<i64>().unwrap_or(i64::MIN);
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let backup: Backup = match serde_json::from_str(&raw) {
                Ok(b) => b,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unreadable backup");
                    continue;
                }
            };
            let newer = match &latest {
                Some((ts, ord, _, _)) => (backup.timestamp, order) > (*ts, *ord),
                None => true,
            };
            if newer {
                latest = Some((backup.timestamp, order, key, backup));
            }
        }
        Ok(latest.map(|(_, _, key, backup)| (key, backup)))
    }

    /// Replaces the set with the newest backup. Returns the restored size,
    /// or `Ok(None)` when no readable backup exists.
    pub async fn try_restore_latest_backup(&self) -> Result<Option<usize>, StorageFailure> {
        let _guard = self.write_lock.lock().await;
        let result: anyhow::Result<Option<(String, usize)>> = async {
            let Some((key, backup)) = self.latest_backup().await? else {
                return Ok(None);
            };
            let mut seen = HashSet::new();
            let addresses: Vec<Address> = backup
                .addresses
                .into_iter()
                .filter(|a| seen.insert(*a))
                .collect();
            self.save_addresses(&addresses).await?;
            Ok(Some((key, addresses.len())))
        }
        .await;

        match result.map_err(|e| storage_failure("restore_latest_backup", e))? {
            Some((key, count)) => {
                info!(key = %key, count, "allowlist restored from backup");
                Ok(Some(count))
            }
            None => {
                debug!("no allowlist backup to restore");
                Ok(None)
            }
        }
    }

    pub async fn restore_latest_backup(&self) -> Option<usize> {
        self.try_restore_latest_backup().await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::verify::verify_membership_proof;
    use crate::storage::MemoryStore;

    fn addr(b: u8) -> String {
        format!("0x{}", hex::encode([b; 20]))
    }

    fn registry() -> AllowlistRegistry<MemoryStore> {
        AllowlistRegistry::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn add_is_idempotent_across_case() {
        let reg = registry();
        let upper = format!("0x{}", "AB".repeat(20));
        let lower = format!("0x{}", "ab".repeat(20));

        assert!(reg.add(&upper).await);
        assert!(!reg.add(&lower).await);
        assert!(!reg.add(&upper).await);
        assert!(reg.contains(&lower).await);
        assert_eq!(reg.addresses().await.len(), 1);

        let stored = reg.store().get(ADDRESSES_KEY).await.unwrap().unwrap();
        assert_eq!(stored, format!("[\"{lower}\"]"));
    }

    #[tokio::test]
    async fn malformed_add_is_a_noop() {
        let reg = registry();
        assert!(!reg.add("not-an-address").await);
        assert!(!reg.add("0x1234").await);
        assert!(reg.addresses().await.is_empty());
        assert!(!reg.try_add("0x1234").await.unwrap());
    }

    #[tokio::test]
    async fn add_batch_counts_only_insertions() {
        let reg = registry();
        reg.add(&addr(1)).await;
        let batch = vec![addr(1), addr(2), "junk".to_string(), addr(2).to_uppercase().replace("0X", "0x"), addr(3)];
        assert_eq!(reg.add_batch(&batch).await, 2);
        assert_eq!(reg.addresses().await.len(), 3);
        assert_eq!(reg.add_batch(&["nope"]).await, 0);
    }

    #[tokio::test]
    async fn remove_reports_whether_present() {
        let reg = registry();
        reg.add(&addr(1)).await;
        assert!(reg.remove(&addr(1).to_uppercase().replace("0X", "0x")).await);
        assert!(!reg.remove(&addr(1)).await);
        assert!(!reg.contains(&addr(1)).await);
    }

    #[tokio::test]
    async fn commitment_requires_a_member() {
        let reg = registry();
        assert_eq!(reg.compute_commitment().await, None);
        assert!(reg.prove_membership(&addr(1)).await.is_none());
    }

    #[tokio::test]
    async fn single_member_scenario() {
        let reg = registry();
        let upper = format!("0x{}", "ABC0".repeat(10));
        assert!(reg.add(&upper).await);
        assert!(reg.contains(&upper.to_lowercase()).await);

        let root = reg.compute_commitment().await.unwrap();
        assert_eq!(root.as_bytes().len(), 32);

        let proof = reg.prove_membership(&upper).await.unwrap();
        assert!(proof.siblings.is_empty());
        assert_eq!(proof.root, root);
        assert!(verify_membership_proof(root, proof.leaf, &proof.siblings));
    }

    #[tokio::test]
    async fn commitment_is_independent_of_insertion_order() {
        let forward = registry();
        let backward = registry();
        for b in 1..=6 {
            forward.add(&addr(b)).await;
        }
        for b in (1..=6).rev() {
            backward.add(&addr(b)).await;
        }
        assert_eq!(
            forward.compute_commitment().await,
            backward.compute_commitment().await
        );
    }

    #[tokio::test]
    async fn proofs_verify_for_members_only() {
        let reg = registry();
        for b in 1..=5 {
            reg.add(&addr(b)).await;
        }
        let root = reg.compute_commitment().await.unwrap();
        for b in 1..=5 {
            let p = reg.prove_membership(&addr(b)).await.unwrap();
            assert!(verify_membership_proof(root, p.leaf, &p.siblings));
        }
        assert!(reg.prove_membership(&addr(9)).await.is_none());

        reg.remove(&addr(3)).await;
        assert!(reg.prove_membership(&addr(3)).await.is_none());
        assert_ne!(reg.compute_commitment().await.unwrap(), root);
    }

    #[tokio::test]
    async fn duplicate_requests_are_rejected() {
        let reg = registry();
        assert!(reg.request_membership(&addr(4), "artist").await);
        assert!(!reg.request_membership(&addr(4).to_uppercase().replace("0X", "0x"), "again").await);
        assert!(!reg.request_membership("bogus", "").await);

        let pending = reg.pending_requests().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reason, "artist");
    }

    #[tokio::test]
    async fn resolve_and_approve_requests() {
        let reg = registry();
        reg.request_membership(&addr(1), "").await;
        reg.request_membership(&addr(2), "").await;
        let pending = reg.pending_requests().await;
        assert_eq!(pending.len(), 2);
        assert_ne!(pending[0].id, pending[1].id);

        assert!(reg.resolve_request(&pending[0].id).await);
        assert!(!reg.resolve_request(&pending[0].id).await);
        assert!(!reg.contains(&addr(1)).await);

        assert!(reg.approve_request(&pending[1].id).await);
        assert!(reg.contains(&addr(2)).await);
        assert!(reg.pending_requests().await.is_empty());
        assert!(!reg.approve_request("missing").await);
    }

    #[tokio::test]
    async fn import_keeps_only_well_formed_entries() {
        let reg = registry();
        let input = vec!["not-an-address".to_string(), format!("0x{}", "11".repeat(20))];
        assert!(reg.import_snapshot(&input).await);
        assert_eq!(reg.addresses().await.len(), 1);
        assert!(reg.contains(&input[1]).await);

        assert!(!reg.import_snapshot(&["nope"]).await);
        let empty: [&str; 0] = [];
        assert!(!reg.import_snapshot(&empty).await);
    }

    #[tokio::test]
    async fn export_import_round_trip() {
        let source = registry();
        for b in [3u8, 1, 2] {
            source.add(&addr(b)).await;
        }
        let snapshot = source.export_snapshot().await;
        let exported: Vec<String> = snapshot.addresses.iter().map(|a| a.to_string()).collect();

        let target = registry();
        assert!(target.import_snapshot(&exported).await);
        assert_eq!(target.addresses().await, source.addresses().await);
        assert_eq!(
            target.compute_commitment().await,
            source.compute_commitment().await
        );
    }

    #[tokio::test]
    async fn corrupt_storage_degrades_to_empty() {
        let reg = registry();
        reg.store()
            .set(ADDRESSES_KEY, "{ not json".to_string())
            .await
            .unwrap();

        assert!(!reg.contains(&addr(1)).await);
        assert!(reg.try_contains(&addr(1)).await.is_err());
        assert!(reg.addresses().await.is_empty());
        assert_eq!(reg.compute_commitment().await, None);
        assert!(reg.try_compute_commitment().await.is_err());
        assert!(reg.try_prove_membership(&addr(1)).await.is_err());
        assert!(!reg.add(&addr(1)).await);

        // The corrupt value is left for inspection rather than clobbered.
        let raw = reg.store().get(ADDRESSES_KEY).await.unwrap().unwrap();
        assert_eq!(raw, "{ not json");

        reg.store().delete(ADDRESSES_KEY).await.unwrap();
        assert!(reg.try_add(&addr(1)).await.unwrap());
    }

    #[tokio::test]
    async fn failure_on_one_key_does_not_leak_into_others() {
        let reg = registry();
        reg.store()
            .set(REQUESTS_KEY, "{broken".to_string())
            .await
            .unwrap();

        let err = reg.try_pending_requests().await.unwrap_err();
        assert_eq!(err.operation, "pending_requests");

        // The allowlist key is healthy, so these report ordinary outcomes.
        assert_eq!(reg.try_add_batch(&["junk"]).await.unwrap(), 0);
        assert_eq!(reg.try_add_batch(&[addr(1)]).await.unwrap(), 1);
        assert!(reg.try_contains(&addr(1)).await.unwrap());
        assert!(reg.try_import_snapshot(&[addr(2)]).await.unwrap());
    }

    /// Memory store whose writes to selected keys fail.
    #[derive(Default)]
    struct FailingWrites {
        inner: MemoryStore,
        failing: std::sync::Mutex<HashSet<String>>,
    }

    impl FailingWrites {
        fn fail_writes_to(&self, key: &str) {
            self.failing.lock().unwrap().insert(key.to_string());
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }
    }

    #[async_trait::async_trait]
    impl KeyValueStore for FailingWrites {
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
            if self.failing.lock().unwrap().contains(key) {
                return Err(anyhow::anyhow!("write to {key} refused"));
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> anyhow::Result<()> {
            self.inner.delete(key).await
        }

        async fn keys(&self) -> anyhow::Result<Vec<String>> {
            self.inner.keys().await
        }
    }

    #[tokio::test]
    async fn approval_interrupted_after_allowlisting_can_be_retried() {
        let reg = AllowlistRegistry::new(FailingWrites::default());
        assert!(reg.request_membership(&addr(7), "").await);
        let id = reg.pending_requests().await[0].id.clone();

        reg.store().fail_writes_to(REQUESTS_KEY);
        let err = reg.try_approve_request(&id).await.unwrap_err();
        assert_eq!(err.operation, "approve_request");
        assert!(reg.contains(&addr(7)).await);
        assert_eq!(reg.pending_requests().await.len(), 1);

        reg.store().heal();
        assert!(reg.try_approve_request(&id).await.unwrap());
        assert!(reg.pending_requests().await.is_empty());
        assert_eq!(reg.addresses().await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_persisted_entries_are_skipped() {
        let reg = registry();
        let raw = serde_json::to_string(&vec![
            addr(1),
            "garbage".to_string(),
            addr(1).to_uppercase().replace("0X", "0x"),
        ])
        .unwrap();
        reg.store().set(ADDRESSES_KEY, raw).await.unwrap();
        assert_eq!(reg.addresses().await.len(), 1);
        assert!(reg.try_addresses().await.is_ok());
    }

    #[tokio::test]
    async fn backup_and_restore_latest() {
        let reg = registry();
        assert_eq!(reg.backup().await, None);
        assert_eq!(reg.restore_latest_backup().await, None);

        reg.add(&addr(1)).await;
        let first = reg.backup().await.unwrap();
        reg.add(&addr(2)).await;
        let second = reg.backup().await.unwrap();
        assert_ne!(first, second);
        assert!(second.starts_with(BACKUP_PREFIX));

        reg.remove(&addr(1)).await;
        reg.remove(&addr(2)).await;
        assert_eq!(reg.restore_latest_backup().await, Some(2));
        assert!(reg.contains(&addr(1)).await);
        assert!(reg.contains(&addr(2)).await);
    }

    #[tokio::test]
    async fn unreadable_backups_are_skipped() {
        let reg = registry();
        reg.add(&addr(5)).await;
        reg.backup().await.unwrap();
        reg.store()
            .set(&format!("{BACKUP_PREFIX}99999999999999"), "broken".to_string())
            .await
            .unwrap();
        reg.remove(&addr(5)).await;

        assert_eq!(reg.restore_latest_backup().await, Some(1));
        assert!(reg.contains(&addr(5)).await);
    }
}
