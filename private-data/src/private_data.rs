//! Salted documents, their commitments and selective-disclosure proofs.
//!
//! A document is committed by salting every field, hashing each salted field into a leaf and
//! building a [`MerkleTree`] over the leaves. The root is what gets attested. A [`MultiProof`]
//! reveals a chosen subset of salted fields together with the sibling hashes a verifier needs to
//! recompute the root; nothing about the other fields leaves this module except their hashes.

use crate::constants::SALT_LEN;
use crate::error::DataError;
use crate::merkle::{self, Hash, MerkleTree};
use crate::types::{Field, IntEncoding, SaltedField, hex32};
use ethers_core::utils::keccak256;
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Domain separator mixed into per-document salt seeds.
const SALT_DOMAIN: &[u8] = b"private-data/salt/v1";

/// Where leaf salts come from.
pub enum SaltSource {
    Os(OsRng),
    Seeded(Box<ChaCha20Rng>),
}

impl SaltSource {
    /// Fresh OS randomness for every salt.
    pub fn random() -> Self {
        SaltSource::Os(OsRng)
    }

    /// A reproducible salt stream for one document.
    ///
    /// Identical `(seed, label)` pairs yield identical salts, so identical documents commit to
    /// identical roots. Different labels give unrelated streams.
    pub fn seeded(seed: &[u8; 32], label: &str) -> Self {
        SaltSource::Seeded(Box::new(ChaCha20Rng::from_seed(document_seed(seed, label))))
    }

    pub fn next_salt(&mut self) -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        match self {
            SaltSource::Os(rng) => rng.fill_bytes(&mut salt),
            SaltSource::Seeded(rng) => rng.fill_bytes(&mut salt),
        }
        salt
    }
}

fn document_seed(seed: &[u8; 32], label: &str) -> [u8; 32] {
    let mut buf = Vec::with_capacity(SALT_DOMAIN.len() + 32 + label.len());
    buf.extend_from_slice(SALT_DOMAIN);
    buf.extend_from_slice(seed);
    buf.extend_from_slice(label.as_bytes());
    keccak256(buf)
}

/// Root plus every salted value. Holding this is equivalent to holding the whole document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTree {
    #[serde(with = "hex32")]
    pub root: [u8; 32],
    pub values: Vec<SaltedField>,
}

/// Selective-disclosure proof.
///
/// `leaves` are ordered the way [`merkle::process_multi_proof`] consumes them, which is not
/// field order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiProof {
    pub leaves: Vec<SaltedField>,
    #[serde(with = "hex32::vec")]
    pub proof: Vec<[u8; 32]>,
    pub proof_flags: Vec<bool>,
}

impl MultiProof {
    /// Re-tag every large integer in the revealed leaves.
    pub fn with_int_encoding(mut self, encoding: IntEncoding) -> Self {
        for leaf in &mut self.leaves {
            leaf.field.value = leaf.field.value.clone().with_int_encoding(encoding);
        }
        self
    }

    pub fn revealed_names(&self) -> Vec<&str> {
        self.leaves.iter().map(|l| l.field.name.as_str()).collect()
    }
}

/// A salted document and its commitment.
#[derive(Clone, Debug)]
pub struct PrivateData {
    values: Vec<SaltedField>,
    tree: MerkleTree,
}

impl PrivateData {
    /// Salt `fields` in order and commit to them.
    pub fn new(fields: Vec<Field>, salts: &mut SaltSource) -> Result<Self, DataError> {
        let values = fields
            .into_iter()
            .map(|field| SaltedField {
                field,
                salt: salts.next_salt(),
            })
            .collect();
        Self::from_salted(values)
    }

    /// Commit to fields that already carry their salts.
    pub fn from_salted(values: Vec<SaltedField>) -> Result<Self, DataError> {
        if values.iter().any(|v| v.field.name.is_empty()) {
            return Err(DataError::EmptyName);
        }
        let leaves: Vec<Hash> = values.iter().map(merkle::salted_leaf_hash).collect();
        let tree = MerkleTree::from_leaves(&leaves)?;
        Ok(Self { values, tree })
    }

    pub fn root(&self) -> [u8; 32] {
        self.tree.root()
    }

    pub fn root_hex(&self) -> String {
        hex32::encode(&self.tree.root())
    }

    pub fn values(&self) -> &[SaltedField] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn full_tree(&self) -> FullTree {
        FullTree {
            root: self.root(),
            values: self.values.clone(),
        }
    }

    /// Prove the fields at `indexes` (positions in the original field order).
    pub fn generate_multi_proof(&self, indexes: &[usize]) -> Result<MultiProof, DataError> {
        let raw = self.tree.multi_proof(indexes)?;
        Ok(MultiProof {
            leaves: raw.value_indexes.iter().map(|&i| self.values[i].clone()).collect(),
            proof: raw.proof,
            proof_flags: raw.proof_flags,
        })
    }

    /// Check a proof against a root using only the revealed values.
    ///
    /// Malformed proofs are errors; well-formed proofs for a different root are `Ok(false)`.
    pub fn verify_multi_proof(root: &[u8; 32], proof: &MultiProof) -> Result<bool, DataError> {
        let leaves: Vec<Hash> = proof.leaves.iter().map(merkle::salted_leaf_hash).collect();
        let computed = merkle::process_multi_proof(&leaves, &proof.proof, &proof.proof_flags)?;
        Ok(&computed == root)
    }

    /// Check that a full tree's values commit to its stated root.
    pub fn verify_full_tree(tree: &FullTree) -> Result<bool, DataError> {
        let rebuilt = Self::from_salted(tree.values.clone())?;
        Ok(rebuilt.root() == tree.root)
    }
}
