//! Sorted-pair binary Merkle tree.
//!
//! Leaves are sorted and deduplicated before building, internal nodes hash
//! the ordered pair `min || max`, and an odd trailing node is promoted to the
//! next level unchanged. The root is therefore independent of the order the
//! leaves were supplied in, and proofs carry no direction bits: a verifier
//! folds `hash_pair(acc, sibling)` from the leaf upwards.

use crate::crypto::hashing::{hash_pair_with, Keccak256Hasher, MerkleHasher};
use primitive_types::H256;
use std::marker::PhantomData;

#[derive(Debug, Clone)]
pub struct SortedMerkleTree<H: MerkleHasher = Keccak256Hasher> {
    /// `levels[0]` are the sorted leaves, the last level holds only the root.
    levels: Vec<Vec<H256>>,
    _hasher: PhantomData<H>,
}

impl<H: MerkleHasher> SortedMerkleTree<H> {
    /// Builds the tree. Returns `None` when there are no leaves.
    pub fn from_leaves(mut leaves: Vec<H256>) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }
        leaves.sort_unstable();
        leaves.dedup();

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let next = levels[levels.len() - 1]
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair_with::<H>(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        Some(Self {
            levels,
            _hasher: PhantomData,
        })
    }

    pub fn root(&self) -> H256 {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaves(&self) -> &[H256] {
        &self.levels[0]
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn contains(&self, leaf: &H256) -> bool {
        self.levels[0].binary_search(leaf).is_ok()
    }

    /// Sibling path from `leaf` to the root, or `None` if `leaf` is absent.
    pub fn proof(&self, leaf: &H256) -> Option<Vec<H256>> {
        let mut index = self.levels[0].binary_search(leaf).ok()?;
        let mut siblings = Vec::with_capacity(self.depth());

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if sibling < level.len() {
                siblings.push(level[sibling]);
            }
            index /= 2;
        }

        Some(siblings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::verify::verify_membership_proof;

    fn leaves(n: u8) -> Vec<H256> {
        (1..=n).map(|i| Keccak256Hasher::digest(&[i])).collect()
    }

    #[test]
    fn empty_tree_has_no_root() {
        assert!(SortedMerkleTree::<Keccak256Hasher>::from_leaves(vec![]).is_none());
    }

    #[test]
    fn single_leaf_root_is_the_leaf() {
        let leaf = leaves(1)[0];
        let tree = SortedMerkleTree::<Keccak256Hasher>::from_leaves(vec![leaf]).unwrap();
        assert_eq!(tree.root(), leaf);
        assert_eq!(tree.proof(&leaf).unwrap(), Vec::<H256>::new());
    }

    #[test]
    fn root_ignores_input_order_and_duplicates() {
        let mut input = leaves(7);
        let a = SortedMerkleTree::<Keccak256Hasher>::from_leaves(input.clone()).unwrap();
        input.reverse();
        input.push(input[0]);
        let b = SortedMerkleTree::<Keccak256Hasher>::from_leaves(input).unwrap();
        assert_eq!(a.root(), b.root());
        assert_eq!(b.leaves().len(), 7);
    }

    #[test]
    fn every_leaf_proves_for_odd_and_even_sizes() {
        for n in 1..=9u8 {
            let input = leaves(n);
            let tree = SortedMerkleTree::<Keccak256Hasher>::from_leaves(input.clone()).unwrap();
            for leaf in &input {
                let proof = tree.proof(leaf).unwrap();
                assert!(proof.len() <= tree.depth());
                assert!(verify_membership_proof(tree.root(), *leaf, &proof), "n={n}");
            }
        }
    }

    #[test]
    fn absent_leaf_has_no_proof() {
        let tree = SortedMerkleTree::<Keccak256Hasher>::from_leaves(leaves(4)).unwrap();
        let outsider = Keccak256Hasher::digest(b"outsider");
        assert!(!tree.contains(&outsider));
        assert!(tree.proof(&outsider).is_none());
    }

    #[test]
    fn two_leaf_root_is_sorted_pair_hash() {
        let input = leaves(2);
        let tree = SortedMerkleTree::<Keccak256Hasher>::from_leaves(input.clone()).unwrap();
        assert_eq!(
            tree.root(),
            hash_pair_with::<Keccak256Hasher>(&input[1], &input[0])
        );
    }
}
