//! Builds the arguments for an allowlist-gated mint call.
//!
//! The contract checks `proof` against its published root itself; this only
//! gathers the proof for the minter and refuses early when the minter is not
//! on the local allowlist.

use crate::app::operation_lock::{LockError, OperationKind, OperationLocks};
use crate::app::registry_service::AllowlistRegistry;
use crate::domain::model::{h256_hex_opt, h256_hex_vec, Address};
use crate::storage::KeyValueStore;
use primitive_types::H256;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintRequest {
    pub to: Address,
    pub token_uri: String,
    /// Sibling path for `to`. Empty when the allowlist is not enforced.
    #[serde(with = "h256_hex_vec")]
    pub proof: Vec<H256>,
    /// Root the proof was built against, when one was needed.
    #[serde(with = "h256_hex_opt")]
    pub root: Option<H256>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MintError {
    #[error(transparent)]
    Busy(#[from] LockError),
    #[error("invalid minter address: {0}")]
    InvalidAddress(String),
    #[error("token URI must not be empty")]
    EmptyTokenUri,
    #[error("{0} is not on the allowlist")]
    NotAllowlisted(Address),
    #[error("{0}")]
    StorageUnavailable(String),
}

pub async fn prepare_mint<S: KeyValueStore>(
    registry: &AllowlistRegistry<S>,
    locks: &OperationLocks,
    minter: &str,
    token_uri: &str,
    whitelist_only: bool,
) -> Result<MintRequest, MintError> {
    let _slot = locks.try_acquire(OperationKind::Mint)?;

    let to: Address = minter
        .trim()
        .parse()
        .map_err(|_| MintError::InvalidAddress(minter.to_string()))?;
    if token_uri.trim().is_empty() {
        return Err(MintError::EmptyTokenUri);
    }

    if !whitelist_only {
        return Ok(MintRequest {
            to,
            token_uri: token_uri.to_string(),
            proof: Vec::new(),
            root: None,
        });
    }

    let proof = registry
        .try_prove_membership(&to.to_string())
        .await
        .map_err(|e| MintError::StorageUnavailable(e.to_string()))?
        .ok_or(MintError::NotAllowlisted(to))?;
    info!(%to, siblings = proof.siblings.len(), "mint request prepared");

    Ok(MintRequest {
        to,
        token_uri: token_uri.to_string(),
        proof: proof.siblings,
        root: Some(proof.root),
    })
}
