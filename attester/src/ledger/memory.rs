//! In-process ledger for dry runs and tests.
//!
//! Applies the EAS acceptance rules this workflow can trip over: the schema must be registered,
//! a non-zero expiration must lie in the future, and a reference must name an existing
//! attestation.

use super::Ledger;
use crate::errors::AppError;
use crate::models::{Attestation, AttestationId, AttestationRequest, NO_EXPIRATION};
use async_trait::async_trait;
use private_data::constants::ZERO_UID;
use chrono::Utc;
use ethers::abi::{self, Token};
use ethers::types::{Address, U256};
use ethers::utils::keccak256;
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

pub struct MemoryLedger {
    attester: Address,
    schemas: HashSet<[u8; 32]>,
    /// Per-ledger randomness so separate ledgers never hand out the same uid.
    nonce: [u8; 32],
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    counter: u64,
    attestations: HashMap<AttestationId, Attestation>,
}

impl MemoryLedger {
    pub fn new(attester: Address, schemas: impl IntoIterator<Item = [u8; 32]>) -> Self {
        let mut nonce = [0u8; 32];
        OsRng.fill_bytes(&mut nonce);
        Self {
            attester,
            schemas: schemas.into_iter().collect(),
            nonce,
            inner: Mutex::new(Inner::default()),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.attestations.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn derive_uid(&self, request: &AttestationRequest, time: u64, counter: u64) -> AttestationId {
        let encoded = abi::encode(&[
            Token::FixedBytes(request.schema.to_vec()),
            Token::Address(request.recipient),
            Token::Address(self.attester),
            Token::Uint(U256::from(time)),
            Token::Uint(U256::from(request.expiration_time)),
            Token::Bool(request.revocable),
            Token::FixedBytes(request.ref_uid.map_or(ZERO_UID, |r| r.as_bytes()).to_vec()),
            Token::Bytes(request.data.clone()),
            Token::FixedBytes(self.nonce.to_vec()),
            Token::Uint(U256::from(counter)),
        ]);
        AttestationId::from_bytes(keccak256(encoded))
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    async fn attest(&self, request: &AttestationRequest) -> Result<AttestationId, AppError> {
        if !self.schemas.contains(&request.schema) {
            return Err(AppError::Rejected(format!(
                "InvalidSchema: 0x{} is not registered",
                hex::encode(request.schema)
            )));
        }

        let now = Utc::now().timestamp().max(0) as u64;
        if request.expiration_time != NO_EXPIRATION && request.expiration_time <= now {
            return Err(AppError::Rejected(format!(
                "InvalidExpirationTime: {} is not in the future",
                request.expiration_time
            )));
        }

        let mut inner = self.inner.lock().await;

        let ref_uid = request.ref_uid.filter(|r| !r.is_zero());
        if let Some(r) = ref_uid {
            if !inner.attestations.contains_key(&r) {
                return Err(AppError::Rejected(format!("NotFound: referenced attestation {r} does not exist")));
            }
        }

        inner.counter += 1;
        let uid = self.derive_uid(request, now, inner.counter);
        inner.attestations.insert(
            uid,
            Attestation {
                uid,
                schema: request.schema,
                time: now,
                expiration_time: request.expiration_time,
                revocation_time: 0,
                ref_uid,
                recipient: request.recipient,
                attester: self.attester,
                revocable: request.revocable,
                data: request.data.clone(),
            },
        );

        debug!(%uid, count = inner.attestations.len(), "memory ledger stored attestation");
        Ok(uid)
    }

    async fn get_attestation(&self, uid: AttestationId) -> Result<Option<Attestation>, AppError> {
        Ok(self.inner.lock().await.attestations.get(&uid).cloned())
    }
}
