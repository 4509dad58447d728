// Verifier side of the allowlist proofs. Mirrors the contract's
// MerkleProof.verify: fold sorted-pair hashes from the leaf to the root.

use crate::crypto::hashing::{hash_leaf, hash_pair};
use crate::domain::model::{Address, MembershipProof};
use primitive_types::H256;

/// Recomputes the root implied by `leaf` and its sibling path.
pub fn compute_root_from_proof(leaf: H256, proof: &[H256]) -> H256 {
    proof
        .iter()
        .fold(leaf, |acc, sibling| hash_pair(&acc, sibling))
}

/// Verifies an inclusion proof for an already-hashed leaf against a trusted root.
pub fn verify_membership_proof(root: H256, leaf: H256, proof: &[H256]) -> bool {
    compute_root_from_proof(leaf, proof) == root
}

/// Verifies that `address` is a member of the set committed to by `root`.
pub fn verify_address_proof(root: H256, address: &Address, proof: &[H256]) -> bool {
    verify_membership_proof(root, hash_leaf(address.as_h160()), proof)
}

/// Checks a full proof record, including that its leaf really is the
/// address's hash and that it targets `trusted_root`.
pub fn verify_proof_record(trusted_root: H256, record: &MembershipProof) -> bool {
    if record.root != trusted_root {
        return false;
    }
    if hash_leaf(record.address.as_h160()) != record.leaf {
        return false;
    }
    verify_membership_proof(trusted_root, record.leaf, &record.siblings)
}
