//! Golden scenarios for tree shape and digests.
//!
//! Every implementation must produce identical leaves, roots and digests for
//! these inputs.

use veriminutes_core::{
    digest_all, verify_inclusion, MerkleTree, Sha256Hash, Side, CHUNK_SIZE,
};

const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
const ABC_BLAKE3: &str = "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85";
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[test]
fn scenario_a_single_leaf_document() {
    let tree = MerkleTree::build(b"abc");

    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.leaves()[0].to_hex(), ABC_SHA256);
    assert_eq!(tree.root(), tree.leaves()[0]);

    let proof = tree.prove_inclusion(0).unwrap();
    assert!(proof.path.is_empty());
    assert!(verify_inclusion(&tree.leaves()[0], &proof, &tree.root()).valid);

    let digests = digest_all(b"abc");
    assert_eq!(digests.sha256.to_hex(), ABC_SHA256);
    assert_eq!(digests.blake3.to_hex(), ABC_BLAKE3);
}

#[test]
fn scenario_b_two_chunk_document() {
    let data: Vec<u8> = (0..130_000u32).map(|i| (i % 251) as u8).collect();
    let tree = MerkleTree::build(&data);

    assert_eq!(tree.leaf_count(), 2);
    assert_eq!(tree.leaves()[0], Sha256Hash::hash(&data[..CHUNK_SIZE]));
    assert_eq!(tree.leaves()[1], Sha256Hash::hash(&data[CHUNK_SIZE..]));
    assert_eq!(data[CHUNK_SIZE..].len(), 64_464);

    let mut pair = Vec::with_capacity(64);
    pair.extend_from_slice(tree.leaves()[0].as_bytes());
    pair.extend_from_slice(tree.leaves()[1].as_bytes());
    assert_eq!(tree.root(), Sha256Hash::hash(&pair));

    let proof = tree.prove_inclusion(1).unwrap();
    assert_eq!(proof.path.len(), 1);
    assert_eq!(proof.path[0].side, Side::Left);
    assert_eq!(proof.path[0].hash, tree.leaves()[0]);
}

#[test]
fn odd_level_promotes_last_node() {
    let data = vec![7u8; 2 * CHUNK_SIZE + 1];
    let tree = MerkleTree::build(&data);
    assert_eq!(tree.leaf_count(), 3);

    let leaves = tree.leaves();
    let mut left = Vec::with_capacity(64);
    left.extend_from_slice(leaves[0].as_bytes());
    left.extend_from_slice(leaves[1].as_bytes());
    let left = Sha256Hash::hash(&left);

    let mut root = Vec::with_capacity(64);
    root.extend_from_slice(left.as_bytes());
    root.extend_from_slice(leaves[2].as_bytes());
    assert_eq!(tree.root(), Sha256Hash::hash(&root));

    // The promoted leaf has one sibling, not two.
    let proof = tree.prove_inclusion(2).unwrap();
    assert_eq!(proof.path.len(), 1);
    assert_eq!(proof.path[0].hash, left);
}

#[test]
fn empty_document_has_one_empty_leaf() {
    let tree = MerkleTree::build(b"");
    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.root().to_hex(), EMPTY_SHA256);
}

#[test]
fn parallel_build_matches_sequential() {
    let data: Vec<u8> = (0..5 * CHUNK_SIZE + 17).map(|i| (i * 31 % 256) as u8).collect();
    let sequential = MerkleTree::build(&data);
    for workers in [1, 2, 3, 8, 64] {
        assert_eq!(MerkleTree::build_parallel(&data, workers), sequential);
    }
}
