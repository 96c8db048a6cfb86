use private_data::DataError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("attestation rejected: {0}")]
    Rejected(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn rpc(e: impl std::fmt::Display) -> Self {
        AppError::Rpc(e.to_string())
    }
}
