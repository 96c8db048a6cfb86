//! Runtime configuration.
//!
//! Everything is resolved once at startup and handed to [`crate::state::AppState`]. Nothing else
//! in the crate reads the process environment.

use crate::errors::AppError;
use ethers::types::Address;
use private_data::IntEncoding;
use private_data::types::hex32;
use std::fmt;
use std::path::PathBuf;

/// Which ledger attestations go to.
#[derive(Clone)]
pub enum LedgerConfig {
    /// An EAS contract reached over JSON-RPC.
    Eas {
        rpc_url: String,
        private_key: String,
        contract: Address,
        confirmations: usize,
    },
    /// In-process ledger. Nothing leaves the machine.
    Memory,
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerConfig::Eas {
                rpc_url,
                contract,
                confirmations,
                ..
            } => f
                .debug_struct("Eas")
                .field("rpc_url", rpc_url)
                .field("private_key", &"<redacted>")
                .field("contract", contract)
                .field("confirmations", confirmations)
                .finish(),
            LedgerConfig::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub recipient: Address,
    /// Seed for reproducible leaf salts. Fresh OS randomness per document when absent.
    pub salt_seed: Option<[u8; 32]>,
    pub output_dir: PathBuf,
    pub int_encoding: IntEncoding,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| AppError::Config(format!("{key} must be set")));

        let ledger = match get("ATTESTER_LEDGER").as_deref().unwrap_or("eas") {
            "eas" => {
                let confirmations = match get("CONFIRMATIONS") {
                    Some(v) => v
                        .parse::<usize>()
                        .map_err(|e| AppError::Config(format!("CONFIRMATIONS: {e}")))?,
                    None => 1,
                };
                LedgerConfig::Eas {
                    rpc_url: require("RPC_URL")?,
                    private_key: require("PRIVATE_KEY")?,
                    contract: parse_address("EAS_CONTRACT_ADDRESS", &require("EAS_CONTRACT_ADDRESS")?)?,
                    confirmations,
                }
            }
            "memory" => LedgerConfig::Memory,
            other => {
                return Err(AppError::Config(format!(
                    "ATTESTER_LEDGER must be `eas` or `memory`, got `{other}`"
                )));
            }
        };

        let recipient = match (&ledger, get("RECIPIENT_ADDRESS")) {
            (_, Some(v)) => parse_address("RECIPIENT_ADDRESS", &v)?,
            (LedgerConfig::Memory, None) => Address::zero(),
            (LedgerConfig::Eas { .. }, None) => return Err(AppError::Config("RECIPIENT_ADDRESS must be set".into())),
        };

        let salt_seed = get("SALT_SEED")
            .map(|v| hex32::parse(&v).map_err(|e| AppError::Config(format!("SALT_SEED: {e}"))))
            .transpose()?;

        let int_encoding = match get("LARGE_INT_ENCODING") {
            Some(v) => v.parse().map_err(|e| AppError::Config(format!("LARGE_INT_ENCODING: {e}")))?,
            None => IntEncoding::Decimal,
        };

        Ok(Self {
            ledger,
            recipient,
            salt_seed,
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            int_encoding,
        })
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, AppError> {
    value
        .parse::<Address>()
        .map_err(|e| AppError::Config(format!("{key} is not an address: {e}")))
}
