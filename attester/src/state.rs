use crate::config::{AppConfig, LedgerConfig};
use crate::errors::AppError;
use crate::ledger::{EasLedger, Ledger, MemoryLedger};
use crate::output::ResultWriter;
use ethers::types::Address;
use private_data::SaltSource;
use private_data::constants::{MEDICAL_RECORD_SCHEMA_UID, PRESCRIPTION_SCHEMA_UID};
use private_data::types::hex32;
use std::sync::Arc;
use tracing::info;

/// Everything the pipeline needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub recipient: Address,
    pub writer: ResultWriter,
    salt_seed: Option<[u8; 32]>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>, recipient: Address, writer: ResultWriter, salt_seed: Option<[u8; 32]>) -> Self {
        Self {
            ledger,
            recipient,
            writer,
            salt_seed,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let ledger: Arc<dyn Ledger> = match &config.ledger {
            LedgerConfig::Eas {
                rpc_url,
                private_key,
                contract,
                confirmations,
            } => Arc::new(EasLedger::connect(rpc_url, private_key, *contract, *confirmations).await?),
            LedgerConfig::Memory => {
                let schemas = [
                    hex32::parse(MEDICAL_RECORD_SCHEMA_UID)?,
                    hex32::parse(PRESCRIPTION_SCHEMA_UID)?,
                ];
                Arc::new(MemoryLedger::new(Address::zero(), schemas))
            }
        };

        info!(
            ledger = ledger.name(),
            output_dir = %config.output_dir.display(),
            seeded_salts = config.salt_seed.is_some(),
            "state initialised"
        );

        Ok(Self::new(
            ledger,
            config.recipient,
            ResultWriter::new(config.output_dir.clone(), config.int_encoding),
            config.salt_seed,
        ))
    }

    /// Salt stream for one document: seeded when a seed is configured, OS randomness otherwise.
    pub fn salt_source(&self, label: &str) -> SaltSource {
        match &self.salt_seed {
            Some(seed) => SaltSource::seeded(seed, label),
            None => SaltSource::random(),
        }
    }
}
