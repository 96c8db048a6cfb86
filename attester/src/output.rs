//! JSON result files.
//!
//! Files are UTF-8, pretty printed with two-space indentation, and overwritten if present.
//! Integers that JSON numbers cannot carry exactly are written as text in the writer's
//! [`IntEncoding`].

use crate::errors::AppError;
use crate::models::{AttestationFile, AttestationId};
use private_data::{IntEncoding, MultiProof};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ResultWriter {
    dir: PathBuf,
    int_encoding: IntEncoding,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>, int_encoding: IntEncoding) -> Self {
        Self {
            dir: dir.into(),
            int_encoding,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[cfg(test)]
    pub fn int_encoding(&self) -> IntEncoding {
        self.int_encoding
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub async fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<PathBuf, AppError> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value)?;

        tokio::fs::write(&path, json).await.map_err(|source| AppError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "wrote result file");
        Ok(path)
    }

    #[cfg(test)]
    pub async fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T, AppError> {
        let path = self.path(file);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| AppError::Io { path, source })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn write_attestation(&self, file: &str, id: AttestationId) -> Result<PathBuf, AppError> {
        self.write_json(file, &AttestationFile::new(id, self.int_encoding)).await
    }

    pub async fn write_proof(&self, file: &str, proof: &MultiProof) -> Result<PathBuf, AppError> {
        self.write_json(file, &proof.clone().with_int_encoding(self.int_encoding))
            .await
    }

    #[cfg(test)]
    pub async fn read_attestation(&self, file: &str) -> Result<AttestationId, AppError> {
        let contents: AttestationFile = self.read_json(file).await?;
        Ok(contents.id())
    }

    #[cfg(test)]
    pub async fn read_proof(&self, file: &str) -> Result<MultiProof, AppError> {
        self.read_json(file).await
    }
}
