//! Crate-wide constants shared by the commitment layer and the attester.

/// Schema layout registered for private-data attestations.
pub const PRIVATE_DATA_SCHEMA: &str = "bytes32 privateData";

/// Name of the single field in [`PRIVATE_DATA_SCHEMA`].
pub const PRIVATE_DATA_FIELD: &str = "privateData";

/// Registered schema uid used for medical record attestations.
pub const MEDICAL_RECORD_SCHEMA_UID: &str =
    "0x20351f973fdec1478924c89dfa533d8f872defa108d9c3c6512267d7e7e5dbc2";

/// Registered schema uid used for prescription attestations.
///
/// Currently the same value as [`MEDICAL_RECORD_SCHEMA_UID`]. Whether prescriptions were meant to
/// get their own schema is unresolved, so the two names stay separate.
pub const PRESCRIPTION_SCHEMA_UID: &str =
    "0x20351f973fdec1478924c89dfa533d8f872defa108d9c3c6512267d7e7e5dbc2";

/// The "no attestation" uid. Used as `refUID` when there is no predecessor.
pub const ZERO_UID: [u8; 32] = [0u8; 32];

/// Length in bytes of a leaf salt.
pub const SALT_LEN: usize = 32;
