//! Sorted-pair keccak Merkle tree with multi-proofs.
//!
//! Layout: a flat array of `2n - 1` nodes with the root at index 0 and the children of node `i`
//! at `2i + 1` and `2i + 2`. Leaves are sorted by hash and stored from the end of the array
//! backwards, so the tree (and its root) depends only on the set of leaf hashes.
//!
//! Internal nodes hash the two children in ascending byte order, which lets a verifier
//! recombine nodes without knowing left/right positions.

use crate::error::DataError;
use crate::types::{Field, SaltedField};
use ethers_core::abi::{self, Token};
use ethers_core::utils::keccak256;
use std::collections::VecDeque;

pub type Hash = [u8; 32];

/// Hash a salted field into its leaf.
///
/// `keccak256(keccak256(abi.encode(string type, string name, bytes abi.encode(value), bytes32 salt)))`.
/// The double hash keeps a leaf from ever being confused with an internal node.
pub fn leaf_hash(field: &Field, salt: &[u8; 32]) -> Hash {
    let encoded_value = abi::encode(&[field.value.to_token()]);
    let encoded = abi::encode(&[
        Token::String(field.field_type.to_string()),
        Token::String(field.name.clone()),
        Token::Bytes(encoded_value),
        Token::FixedBytes(salt.to_vec()),
    ]);
    keccak256(keccak256(encoded))
}

pub fn salted_leaf_hash(value: &SaltedField) -> Hash {
    leaf_hash(&value.field, &value.salt)
}

/// Hash two nodes in ascending order.
pub fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo);
    buf[32..].copy_from_slice(hi);
    keccak256(buf)
}

fn parent_index(i: usize) -> usize {
    (i - 1) / 2
}

fn sibling_index(i: usize) -> usize {
    if i % 2 == 1 { i + 1 } else { i - 1 }
}

/// Raw multi-proof over tree nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMultiProof {
    /// Value indexes of the proven leaves, in the order their hashes must be fed to the verifier.
    pub value_indexes: Vec<usize>,
    pub proof: Vec<Hash>,
    pub proof_flags: Vec<bool>,
}

#[derive(Clone, Debug)]
pub struct MerkleTree {
    nodes: Vec<Hash>,
    /// `tree_index[value_index]` is the node position of that value's leaf.
    tree_index: Vec<usize>,
}

impl MerkleTree {
    /// Build a tree over leaf hashes given in value order.
    pub fn from_leaves(leaves: &[Hash]) -> Result<Self, DataError> {
        if leaves.is_empty() {
            return Err(DataError::EmptyTree);
        }

        let n = leaves.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|a, b| leaves[*a].cmp(&leaves[*b]));

        let mut nodes = vec![[0u8; 32]; 2 * n - 1];
        let mut tree_index = vec![0usize; n];
        for (rank, value_index) in order.into_iter().enumerate() {
            let pos = nodes.len() - 1 - rank;
            nodes[pos] = leaves[value_index];
            tree_index[value_index] = pos;
        }

        for i in (0..n - 1).rev() {
            nodes[i] = hash_pair(&nodes[2 * i + 1], &nodes[2 * i + 2]);
        }

        Ok(Self { nodes, tree_index })
    }

    pub fn root(&self) -> Hash {
        self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.tree_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree_index.is_empty()
    }

    pub fn leaf(&self, value_index: usize) -> Result<Hash, DataError> {
        let pos = self.node_position(value_index)?;
        Ok(self.nodes[pos])
    }

    fn node_position(&self, value_index: usize) -> Result<usize, DataError> {
        self.tree_index
            .get(value_index)
            .copied()
            .ok_or(DataError::InvalidIndex {
                index: value_index,
                len: self.len(),
            })
    }

    /// Build a multi-proof for the given value indexes.
    ///
    /// Every index must be in `[0, len)` and appear at most once.
    pub fn multi_proof(&self, value_indexes: &[usize]) -> Result<RawMultiProof, DataError> {
        let mut positions = Vec::with_capacity(value_indexes.len());
        for &vi in value_indexes {
            positions.push((self.node_position(vi)?, vi));
        }

        // Deepest nodes first; the queue below consumes them in this order.
        positions.sort_by(|a, b| b.0.cmp(&a.0));
        if let Some(w) = positions.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(DataError::DuplicateIndex(w[0].1));
        }

        let mut queue: VecDeque<usize> = positions.iter().map(|(pos, _)| *pos).collect();
        let mut proof = Vec::new();
        let mut proof_flags = Vec::new();

        while let Some(&j) = queue.front() {
            if j == 0 {
                break;
            }
            queue.pop_front();
            let s = sibling_index(j);
            if queue.front() == Some(&s) {
                proof_flags.push(true);
                queue.pop_front();
            } else {
                proof_flags.push(false);
                proof.push(self.nodes[s]);
            }
            queue.push_back(parent_index(j));
        }

        if value_indexes.is_empty() {
            proof.push(self.root());
        }

        Ok(RawMultiProof {
            value_indexes: positions.into_iter().map(|(_, vi)| vi).collect(),
            proof,
            proof_flags,
        })
    }
}

/// Recompute the root from leaf hashes, sibling nodes and flags.
///
/// `true` flags combine two already-known nodes, `false` flags consume the next proof node.
pub fn process_multi_proof(leaves: &[Hash], proof: &[Hash], proof_flags: &[bool]) -> Result<Hash, DataError> {
    let consumed = proof_flags.iter().filter(|f| !**f).count();
    if proof.len() < consumed {
        return Err(DataError::InvalidMultiProof(format!(
            "{} proof nodes for {consumed} sibling lookups",
            proof.len()
        )));
    }
    if leaves.len() + proof.len() != proof_flags.len() + 1 {
        return Err(DataError::InvalidMultiProof(format!(
            "{} leaves and {} proof nodes cannot produce a root with {} flags",
            leaves.len(),
            proof.len(),
            proof_flags.len()
        )));
    }

    let mut stack: VecDeque<Hash> = leaves.iter().copied().collect();
    let mut siblings = proof.iter();

    for &flag in proof_flags {
        let a = stack
            .pop_front()
            .ok_or_else(|| DataError::InvalidMultiProof("ran out of nodes".to_string()))?;
        let next = if flag { stack.pop_front() } else { siblings.next().copied() };
        let b = next.ok_or_else(|| DataError::InvalidMultiProof("ran out of nodes".to_string()))?;
        stack.push_back(hash_pair(&a, &b));
    }

    stack
        .pop_back()
        .or_else(|| siblings.next().copied())
        .ok_or_else(|| DataError::InvalidMultiProof("no root produced".to_string()))
}
