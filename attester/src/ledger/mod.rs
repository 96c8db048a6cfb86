//! Ledgers that accept and store attestations.

mod eas;
mod memory;

pub use eas::EasLedger;
pub use memory::MemoryLedger;

use crate::errors::AppError;
use crate::models::{Attestation, AttestationId, AttestationRequest};
use async_trait::async_trait;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Publish an attestation and wait until the ledger has accepted it.
    ///
    /// There is no retry; every failure is returned to the caller.
    async fn attest(&self, request: &AttestationRequest) -> Result<AttestationId, AppError>;

    /// Look up a published attestation. `None` when the uid is unknown.
    async fn get_attestation(&self, uid: AttestationId) -> Result<Option<Attestation>, AppError>;
}
