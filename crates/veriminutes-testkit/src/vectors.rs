//! Golden vectors for deterministic verification.
//!
//! Digests and tree shapes every implementation must reproduce.

use veriminutes_core::{digest_all, MerkleTree, CHUNK_SIZE};

/// Known digests of a fixed input.
#[derive(Debug, Clone)]
pub struct DigestVector {
    pub name: &'static str,
    pub input: &'static [u8],
    /// Expected SHA-256 (hex).
    pub sha256: &'static str,
    /// Expected BLAKE3 (hex).
    pub blake3: &'static str,
}

/// Expected tree shape for a document of `len` bytes.
#[derive(Debug, Clone)]
pub struct TreeVector {
    pub name: &'static str,
    pub len: usize,
    pub leaf_count: usize,
    /// Length of the inclusion path for leaf 0.
    pub path_len: usize,
}

pub fn digest_vectors() -> Vec<DigestVector> {
    vec![
        DigestVector {
            name: "empty",
            input: b"",
            sha256: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            blake3: "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262",
        },
        DigestVector {
            name: "abc",
            input: b"abc",
            sha256: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            blake3: "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85",
        },
    ]
}

pub fn tree_vectors() -> Vec<TreeVector> {
    vec![
        TreeVector {
            name: "empty document",
            len: 0,
            leaf_count: 1,
            path_len: 0,
        },
        TreeVector {
            name: "scenario A: 3 bytes",
            len: 3,
            leaf_count: 1,
            path_len: 0,
        },
        TreeVector {
            name: "exactly one chunk",
            len: CHUNK_SIZE,
            leaf_count: 1,
            path_len: 0,
        },
        TreeVector {
            name: "scenario B: 130000 bytes",
            len: 130_000,
            leaf_count: 2,
            path_len: 1,
        },
        TreeVector {
            name: "three chunks, last promoted",
            len: 2 * CHUNK_SIZE + 1,
            leaf_count: 3,
            path_len: 2,
        },
        TreeVector {
            name: "five chunks",
            len: 4 * CHUNK_SIZE + 10,
            leaf_count: 5,
            path_len: 3,
        },
    ]
}

/// Deterministic filler for tree vectors.
pub fn tree_input(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Check every vector. Returns `(name, passed, detail)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let digests = digest_vectors().into_iter().map(|v| {
        let pair = digest_all(v.input);
        let (sha256, blake3) = (pair.sha256.to_hex(), pair.blake3.to_hex());
        let passed = sha256 == v.sha256 && blake3 == v.blake3;
        (v.name.to_string(), passed, format!("sha256={} blake3={}", sha256, blake3))
    });

    let trees = tree_vectors().into_iter().map(|v| {
        let tree = MerkleTree::build(&tree_input(v.len));
        let path_len = tree.prove_inclusion(0).map(|p| p.path.len()).unwrap_or(usize::MAX);
        let passed = tree.leaf_count() == v.leaf_count && path_len == v.path_len;
        (
            v.name.to_string(),
            passed,
            format!("leaves={} path={}", tree.leaf_count(), path_len),
        )
    });

    digests.chain(trees).collect()
}
