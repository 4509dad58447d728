//! One exclusive slot per kind of user-triggered operation.
//!
//! A caller either queues for the slot ([`OperationLocks::acquire`], FIFO) or
//! asks for it without waiting ([`OperationLocks::try_acquire`]) and is
//! rejected with [`LockError::Busy`] while another holder is active. The slot
//! is released when the returned guard is dropped, including on early return
//! or error.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Allowlist maintenance: root sync, republishing.
    Whitelist,
    /// Mint request preparation.
    Mint,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Whitelist => f.write_str("whitelist"),
            OperationKind::Mint => f.write_str("mint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("{0} operation already in progress")]
    Busy(OperationKind),
}

#[derive(Clone, Default)]
pub struct OperationLocks {
    whitelist: Arc<Mutex<()>>,
    mint: Arc<Mutex<()>>,
}

/// Holds an operation slot until dropped.
pub struct OperationGuard {
    kind: OperationKind,
    _guard: OwnedMutexGuard<()>,
}

impl OperationGuard {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        debug!(operation = %self.kind, "operation slot released");
    }
}

impl OperationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: OperationKind) -> Arc<Mutex<()>> {
        match kind {
            OperationKind::Whitelist => self.whitelist.clone(),
            OperationKind::Mint => self.mint.clone(),
        }
    }

    /// Takes the slot immediately or fails if it is held.
    pub fn try_acquire(&self, kind: OperationKind) -> Result<OperationGuard, LockError> {
        let guard = self
            .slot(kind)
            .try_lock_owned()
            .map_err(|_| LockError::Busy(kind))?;
        debug!(operation = %kind, "operation slot acquired");
        Ok(OperationGuard {
            kind,
            _guard: guard,
        })
    }

    /// Waits for the slot. Waiters are served in arrival order.
    pub async fn acquire(&self, kind: OperationKind) -> OperationGuard {
        let guard = self.slot(kind).lock_owned().await;
        debug!(operation = %kind, "operation slot acquired after waiting");
        OperationGuard {
            kind,
            _guard: guard,
        }
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.slot(kind).try_lock().is_err()
    }
}
