//! Commit, attest, prove, write. One document at a time.

use crate::errors::AppError;
use crate::models::{AttestationId, AttestationRequest, NO_EXPIRATION};
use crate::records::{self, Document};
use crate::state::AppState;
use ethers::types::U256;
use private_data::constants::{MEDICAL_RECORD_SCHEMA_UID, PRESCRIPTION_SCHEMA_UID};
use private_data::schema::encode_private_data;
use private_data::types::hex32;
use private_data::{DataError, MultiProof, PrivateData};
use std::path::PathBuf;
use tracing::{Level, debug, enabled, info};

#[derive(Clone, Debug)]
pub struct DocumentOutcome {
    pub label: &'static str,
    pub root: [u8; 32],
    pub attestation_id: AttestationId,
    pub proof: MultiProof,
    pub attestation_path: PathBuf,
    pub proof_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub medical_record: DocumentOutcome,
    pub prescription: DocumentOutcome,
}

/// Attest one document and write its result files.
///
/// The proof is checked against the freshly committed root before anything is written; a proof
/// that does not verify is an error.
pub async fn attest_document(
    state: &AppState,
    doc: &Document,
    schema_uid: &str,
    ref_uid: Option<AttestationId>,
    indexes: &[usize],
) -> Result<DocumentOutcome, AppError> {
    let schema = hex32::parse(schema_uid)?;

    let mut salts = state.salt_source(doc.label);
    let data = PrivateData::new(doc.fields.clone(), &mut salts)?;
    let root = data.root();
    info!(document = doc.label, fields = data.len(), root = %data.root_hex(), "document committed");
    if enabled!(Level::DEBUG) {
        let tree = serde_json::to_string(&data.full_tree())?;
        debug!(document = doc.label, %tree, "full tree");
    }

    let request = AttestationRequest {
        schema,
        recipient: state.recipient,
        expiration_time: NO_EXPIRATION,
        revocable: true,
        ref_uid,
        data: encode_private_data(&root)?,
        value: U256::zero(),
    };
    let attestation_id = state.ledger.attest(&request).await?;
    confirm_published(state, attestation_id, &request).await?;
    info!(
        document = doc.label,
        ledger = state.ledger.name(),
        uid = %attestation_id,
        ref_uid = ?ref_uid.map(|r| r.to_string()),
        "attestation published"
    );

    let proof = data.generate_multi_proof(indexes)?;
    if !PrivateData::verify_multi_proof(&root, &proof)? {
        return Err(DataError::InvalidMultiProof(format!("{} proof does not reproduce its root", doc.label)).into());
    }
    if enabled!(Level::DEBUG) {
        let json = serde_json::to_string(&proof)?;
        debug!(document = doc.label, proof = %json, "multi-proof");
    }

    let attestation_path = state
        .writer
        .write_attestation(&doc.attestation_file(), attestation_id)
        .await?;
    let proof_path = state.writer.write_proof(&doc.proof_file(), &proof).await?;

    info!(
        document = doc.label,
        revealed = ?proof.revealed_names(),
        attestation = %attestation_path.display(),
        proof = %proof_path.display(),
        "results written"
    );

    Ok(DocumentOutcome {
        label: doc.label,
        root,
        attestation_id,
        proof,
        attestation_path,
        proof_path,
    })
}

/// Read the attestation back and check the ledger recorded what was sent.
async fn confirm_published(state: &AppState, uid: AttestationId, request: &AttestationRequest) -> Result<(), AppError> {
    let published = state
        .ledger
        .get_attestation(uid)
        .await?
        .ok_or_else(|| AppError::Ledger(format!("attestation {uid} not found after publishing")))?;

    let expected_ref = request.ref_uid.filter(|r| !r.is_zero());
    if published.schema != request.schema || published.ref_uid != expected_ref || published.data != request.data {
        return Err(AppError::Ledger(format!(
            "attestation {uid} does not match the submitted request"
        )));
    }
    Ok(())
}

/// Medical record first, then the prescription referencing it.
pub async fn run(state: &AppState) -> Result<RunOutcome, AppError> {
    let medical = records::medical_record();
    let medical_record = attest_document(state, &medical, MEDICAL_RECORD_SCHEMA_UID, None, &medical.all_indexes()).await?;

    let presc = records::prescription();
    let prescription = attest_document(
        state,
        &presc,
        PRESCRIPTION_SCHEMA_UID,
        Some(medical_record.attestation_id),
        &presc.all_indexes(),
    )
    .await?;

    info!(
        medical_record = %medical_record.attestation_id,
        prescription = %prescription.attestation_id,
        "provenance chain complete"
    );

    Ok(RunOutcome {
        medical_record,
        prescription,
    })
}
