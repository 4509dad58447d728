// Keccak-256 hashing for allowlist leaves and sorted-pair tree nodes.

use primitive_types::{H160, H256};
use sha3::{Digest, Keccak256};

/// The hash collaborator used by the tree for leaves and internal nodes.
pub trait MerkleHasher {
    fn digest(bytes: &[u8]) -> H256;
}

/// Keccak-256, as used by Solidity's `keccak256` and by the verifying contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct Keccak256Hasher;

impl MerkleHasher for Keccak256Hasher {
    fn digest(bytes: &[u8]) -> H256 {
        let mut hasher = Keccak256::new();
        hasher.update(bytes);
        H256::from_slice(&hasher.finalize())
    }
}

/// Hashes the raw 20 address bytes into a leaf.
///
/// Equivalent to `keccak256(abi.encodePacked(account))` on the contract side.
pub fn hash_leaf(address: &H160) -> H256 {
    hash_leaf_with::<Keccak256Hasher>(address)
}

pub fn hash_leaf_with<H: MerkleHasher>(address: &H160) -> H256 {
    H::digest(address.as_bytes())
}

/// Hashes two nodes after ordering them, so the caller never tracks direction.
pub fn hash_pair(a: &H256, b: &H256) -> H256 {
    hash_pair_with::<Keccak256Hasher>(a, b)
}

pub fn hash_pair_with<H: MerkleHasher>(a: &H256, b: &H256) -> H256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_bytes());
    buf[32..].copy_from_slice(hi.as_bytes());
    H::digest(&buf)
}
