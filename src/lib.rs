pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::mint::{prepare_mint, MintError, MintRequest};
pub use app::operation_lock::{LockError, OperationKind, OperationLocks};
pub use app::registry_service::{AllowlistRegistry, StorageFailure};
pub use crypto::hashing::{hash_leaf, hash_pair};
pub use domain::commitment::{
    AllowlistContract, FilePublisher, MemoryPublisher, RootManager, RootPublisher,
};
pub use domain::merkle::SortedMerkleTree;
pub use domain::model::{Address, MembershipProof, PendingRequest, Snapshot};
pub use domain::verify::{verify_address_proof, verify_membership_proof};
pub use infra::config::Config;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, PostgresStore};
