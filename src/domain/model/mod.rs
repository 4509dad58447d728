//! Domain types for the allowlist: addresses, requests, backups and proofs.

pub mod address;
pub mod records;

pub use address::{Address, AddressError};
pub use records::{h256_from_hex, h256_hex, h256_hex_opt, h256_hex_vec, h256_to_hex, Backup, MembershipProof, PendingRequest, Snapshot};
