use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A whole-collection JSON document on disk.
///
/// Every read goes back to the file; nothing is cached between calls, so
/// several instances pointing at the same path always agree on its contents.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.data_file.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full collection in file order. A missing file is an empty collection.
    pub async fn load_all<T>(&self) -> Result<Vec<T>, StorageError>
    where
        T: DeserializeOwned,
    {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                error!("Failed to read {}: {}", self.path.display(), source);
                return Err(self.io_error(source));
            }
        };

        let records: Vec<T> = serde_json::from_slice(&bytes).map_err(|source| {
            error!("Failed to parse {}: {}", self.path.display(), source);
            StorageError::Serialization {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    /// Overwrites the collection with exactly `records`.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// target, so a concurrent reader sees either the old or the new collection.
    pub async fn replace_all<T>(&self, records: &[T]) -> Result<(), StorageError>
    where
        T: Serialize,
    {
        let content = serde_json::to_vec_pretty(records).map_err(|source| {
            StorageError::Serialization {
                path: self.path.clone(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp_path = self.tmp_path();
        if let Err(source) = tokio::fs::write(&tmp_path, &content).await {
            error!("Failed to write {}: {}", tmp_path.display(), source);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.io_error(source));
        }

        if let Err(source) = tokio::fs::rename(&tmp_path, &self.path).await {
            error!("Failed to replace {}: {}", self.path.display(), source);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.io_error(source));
        }

        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "collection".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
