//! Chunked Merkle tree over document bytes.
//!
//! The document is split into 64 KiB chunks; each chunk is a SHA-256 leaf.
//! Levels are built left to right with `parent = SHA-256(left || right)`.
//! A node without a partner is promoted to the next level unchanged, so a
//! single-leaf document has `root == leaf`.
//!
//! ```text
//!            root
//!          /      \
//!       p01        l2      <- l2 promoted
//!      /   \        |
//!    l0     l1      l2
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{CoreError, Result};
use crate::hash::{HashAlgorithm, Sha256Hash};

/// Chunk size in bytes.
pub const CHUNK_SIZE: usize = 65536;

/// Algorithm used for leaves and interior nodes.
pub const LEAF_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Hash one chunk into a leaf.
pub fn leaf_hash(chunk: &[u8]) -> Sha256Hash {
    Sha256Hash::hash(chunk)
}

/// Hash two child nodes into their parent.
pub fn hash_pair(left: &Sha256Hash, right: &Sha256Hash) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Sha256Hash(hasher.finalize().into())
}

/// Number of leaves for a document of `len` bytes (at least one).
pub fn leaf_count_for(len: usize) -> usize {
    len.div_ceil(CHUNK_SIZE).max(1)
}

/// The chunk at `index`, or `None` past the end.
///
/// An empty document has exactly one (empty) chunk.
pub fn chunk_at(data: &[u8], index: usize) -> Option<&[u8]> {
    if index >= leaf_count_for(data.len()) {
        return None;
    }
    let start = index * CHUNK_SIZE;
    let end = (start + CHUNK_SIZE).min(data.len());
    Some(&data[start..end])
}

/// Recompute the leaf at `index` without building the tree.
pub fn chunk_leaf(data: &[u8], index: usize) -> Option<Sha256Hash> {
    chunk_at(data, index).map(leaf_hash)
}

/// Which side of the path node a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: Sha256Hash,
    pub side: Side,
}

/// Sibling path from one leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub index: usize,
    pub path: Vec<ProofStep>,
}

/// Outcome of replaying an inclusion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusionCheck {
    pub valid: bool,
    /// The root the proof actually leads to, for diagnostics.
    pub computed_root: Sha256Hash,
}

/// Replay `proof` from `leaf` and compare against `claimed_root`.
///
/// Never fails; a malformed proof simply does not reproduce the root.
pub fn verify_inclusion(
    leaf: &Sha256Hash,
    proof: &InclusionProof,
    claimed_root: &Sha256Hash,
) -> InclusionCheck {
    let computed_root = proof.path.iter().fold(*leaf, |acc, step| match step.side {
        Side::Right => hash_pair(&acc, &step.hash),
        Side::Left => hash_pair(&step.hash, &acc),
    });

    InclusionCheck {
        valid: computed_root == *claimed_root,
        computed_root,
    }
}

/// A fully materialized Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` are the leaves, the last level holds only the root.
    levels: Vec<Vec<Sha256Hash>>,
}

impl MerkleTree {
    /// Build the tree over `data`.
    pub fn build(data: &[u8]) -> Self {
        let leaves = (0..leaf_count_for(data.len()))
            .filter_map(|i| chunk_leaf(data, i))
            .collect();
        Self::from_leaves(leaves)
    }

    /// Build the tree hashing chunks on up to `workers` threads.
    ///
    /// Each worker owns a contiguous range of chunk indices; leaves are
    /// merged by index, so the result is identical to [`MerkleTree::build`].
    pub fn build_parallel(data: &[u8], workers: usize) -> Self {
        let leaf_count = leaf_count_for(data.len());
        let workers = workers.clamp(1, leaf_count);
        if workers == 1 {
            return Self::build(data);
        }

        let per_worker = leaf_count.div_ceil(workers);
        let mut leaves = vec![Sha256Hash::from_bytes([0u8; 32]); leaf_count];

        std::thread::scope(|scope| {
            for (worker, slots) in leaves.chunks_mut(per_worker).enumerate() {
                let first = worker * per_worker;
                scope.spawn(move || {
                    for (offset, slot) in slots.iter_mut().enumerate() {
                        if let Some(leaf) = chunk_leaf(data, first + offset) {
                            *slot = leaf;
                        }
                    }
                });
            }
        });

        Self::from_leaves(leaves)
    }

    /// Build the upper levels over precomputed leaves.
    ///
    /// An empty leaf list is treated as the empty document.
    pub fn from_leaves(leaves: Vec<Sha256Hash>) -> Self {
        let leaves = if leaves.is_empty() {
            vec![leaf_hash(&[])]
        } else {
            leaves
        };

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [lone] => *lone,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        Self { levels }
    }

    /// The root hash.
    pub fn root(&self) -> Sha256Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(|| leaf_hash(&[]))
    }

    /// The leaf hashes in chunk order.
    pub fn leaves(&self) -> &[Sha256Hash] {
        &self.levels[0]
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels above the leaves.
    pub fn height(&self) -> usize {
        self.levels.len() - 1
    }

    /// Produce the sibling path for the leaf at `index`.
    pub fn prove_inclusion(&self, index: usize) -> Result<InclusionProof> {
        if index >= self.leaf_count() {
            return Err(CoreError::InvalidProofRequest {
                index,
                leaf_count: self.leaf_count(),
            });
        }

        let mut path = Vec::with_capacity(self.height());
        let mut position = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let step = if position % 2 == 0 {
                level.get(position + 1).map(|hash| ProofStep {
                    hash: *hash,
                    side: Side::Right,
                })
            } else {
                Some(ProofStep {
                    hash: level[position - 1],
                    side: Side::Left,
                })
            };
            // No sibling means the node was promoted: nothing to record.
            path.extend(step);
            position /= 2;
        }

        Ok(InclusionProof { index, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_small_chunk() {
        let tree = MerkleTree::build(b"abc");
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.leaves()[0], Sha256Hash::hash(b"abc"));
        assert_eq!(tree.root(), Sha256Hash::hash(b"abc"));
        assert_eq!(tree.height(), 0);

        let proof = tree.prove_inclusion(0).unwrap();
        assert!(proof.path.is_empty());
        assert!(verify_inclusion(&tree.leaves()[0], &proof, &tree.root()).valid);
    }

    #[test]
    fn test_empty_document_has_one_leaf() {
        let tree = MerkleTree::build(&[]);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root(), Sha256Hash::hash(&[]));
        assert_eq!(MerkleTree::from_leaves(Vec::new()), tree);
    }

    #[test]
    fn test_two_chunks() {
        let data = vec![7u8; 130_000];
        let tree = MerkleTree::build(&data);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.leaves()[0], Sha256Hash::hash(&data[..CHUNK_SIZE]));
        assert_eq!(tree.leaves()[1], Sha256Hash::hash(&data[CHUNK_SIZE..]));
        assert_eq!(data[CHUNK_SIZE..].len(), 64_464);
        assert_eq!(tree.root(), hash_pair(&tree.leaves()[0], &tree.leaves()[1]));
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn test_exact_chunk_boundary() {
        assert_eq!(leaf_count_for(CHUNK_SIZE), 1);
        assert_eq!(leaf_count_for(CHUNK_SIZE + 1), 2);
        assert_eq!(leaf_count_for(0), 1);
    }

    #[test]
    fn test_odd_level_promotes_last_node() {
        let leaves: Vec<_> = (0u8..3).map(|i| leaf_hash(&[i])).collect();
        let tree = MerkleTree::from_leaves(leaves.clone());
        let expected = hash_pair(&hash_pair(&leaves[0], &leaves[1]), &leaves[2]);
        assert_eq!(tree.root(), expected);

        // The promoted leaf has a single step: the left subtree.
        let proof = tree.prove_inclusion(2).unwrap();
        assert_eq!(proof.path.len(), 1);
        assert_eq!(proof.path[0].side, Side::Left);
        assert!(verify_inclusion(&leaves[2], &proof, &expected).valid);
    }

    #[test]
    fn test_out_of_range_proof_request() {
        let tree = MerkleTree::build(b"abc");
        match tree.prove_inclusion(1) {
            Err(CoreError::InvalidProofRequest { index, leaf_count }) => {
                assert_eq!(index, 1);
                assert_eq!(leaf_count, 1);
            }
            other => panic!("expected InvalidProofRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_leaf_reports_computed_root() {
        let data = vec![1u8; 3 * CHUNK_SIZE];
        let tree = MerkleTree::build(&data);
        let proof = tree.prove_inclusion(1).unwrap();
        let check = verify_inclusion(&leaf_hash(b"forged"), &proof, &tree.root());
        assert!(!check.valid);
        assert_ne!(check.computed_root, tree.root());
    }

    #[test]
    fn test_side_serializes_lowercase() {
        let step = ProofStep {
            hash: leaf_hash(b"x"),
            side: Side::Left,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["side"], "left");
    }

    fn leaves_strategy() -> impl Strategy<Value = Vec<Sha256Hash>> {
        prop::collection::vec(any::<[u8; 32]>().prop_map(Sha256Hash::from_bytes), 1..40)
    }

    proptest! {
        #[test]
        fn every_leaf_proves_into_root(leaves in leaves_strategy()) {
            let tree = MerkleTree::from_leaves(leaves.clone());
            for (i, leaf) in leaves.iter().enumerate() {
                let proof = tree.prove_inclusion(i).unwrap();
                let check = verify_inclusion(leaf, &proof, &tree.root());
                prop_assert!(check.valid);
                prop_assert_eq!(check.computed_root, tree.root());
            }
        }

        #[test]
        fn verify_inclusion_is_deterministic(leaves in leaves_strategy(), pick in any::<prop::sample::Index>()) {
            let tree = MerkleTree::from_leaves(leaves.clone());
            let i = pick.index(leaves.len());
            let proof = tree.prove_inclusion(i).unwrap();
            let first = verify_inclusion(&leaves[i], &proof, &tree.root());
            let second = verify_inclusion(&leaves[i], &proof, &tree.root());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn parallel_build_matches_sequential(len in 0usize..(5 * CHUNK_SIZE), workers in 1usize..8) {
            let data: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
            prop_assert_eq!(MerkleTree::build_parallel(&data, workers), MerkleTree::build(&data));
        }
    }
}
