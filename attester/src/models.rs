use ethers::types::{Address, H256, U256};
use private_data::{IntEncoding, LargeInt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger-assigned identifier of an attestation (the EAS uid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttestationId(pub H256);

impl AttestationId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(H256(bytes))
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The uid read as a big-endian unsigned integer.
    pub fn to_large_int(&self) -> LargeInt {
        LargeInt::new(U256::from_big_endian(self.0.as_bytes()))
    }

    #[cfg(test)]
    pub fn from_large_int(n: &LargeInt) -> Self {
        let mut bytes = [0u8; 32];
        n.value().to_big_endian(&mut bytes);
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for AttestationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

/// Expiration value meaning "never expires".
pub const NO_EXPIRATION: u64 = 0;

/// What gets submitted to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationRequest {
    pub schema: [u8; 32],
    pub recipient: Address,
    pub expiration_time: u64,
    pub revocable: bool,
    /// Previously published attestation this one builds on.
    pub ref_uid: Option<AttestationId>,
    /// Schema-encoded payload.
    pub data: Vec<u8>,
    /// Wei sent along with the attestation.
    pub value: U256,
}

/// An attestation as recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attestation {
    pub uid: AttestationId,
    pub schema: [u8; 32],
    pub time: u64,
    pub expiration_time: u64,
    pub revocation_time: u64,
    pub ref_uid: Option<AttestationId>,
    pub recipient: Address,
    pub attester: Address,
    pub revocable: bool,
    pub data: Vec<u8>,
}

/// Contents of `<document>Attestation.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationFile {
    pub attestation_id: LargeInt,
}

impl AttestationFile {
    pub fn new(id: AttestationId, encoding: IntEncoding) -> Self {
        Self {
            attestation_id: id.to_large_int().with_encoding(encoding),
        }
    }

    #[cfg(test)]
    pub fn id(&self) -> AttestationId {
        AttestationId::from_large_int(&self.attestation_id)
    }
}
