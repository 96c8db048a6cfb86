//! Commitment layer for selectively disclosable private records.
//!
//! This crate contains:
//! - A typed field model whose order defines leaf positions.
//! - A sorted-pair keccak Merkle tree with multi-proof generation and verification.
//! - Salting of fields so unrevealed leaves cannot be brute-forced from their hashes.
//! - An encoder for attestation schemas (`bytes32 privateData` and friends).

pub mod constants;
pub mod error;
pub mod merkle;
pub mod private_data;
pub mod schema;
pub mod types;

pub use error::DataError;
pub use private_data::{FullTree, MultiProof, PrivateData, SaltSource};
pub use types::{Field, FieldType, FieldValue, IntEncoding, LargeInt, SaltedField};
