//! Object-store abstraction trait
//!
//! This module defines the trait every object-store backend implements and the
//! error type shared by staging and uploading.

use std::path::Path;

use async_trait::async_trait;
use intake_core::{AppError, UploadToken};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Staging failed: {0}")]
    StageFailed(String),

    #[error("Remote store error: {0}")]
    RemoteStore(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::StageFailed(msg) => AppError::Staging(msg),
            StorageError::DeleteFailed(msg) => AppError::Staging(msg),
            StorageError::IoError(err) => AppError::Staging(format!("IO error: {}", err)),
            StorageError::RemoteStore(msg) => AppError::RemoteStore(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        }
    }
}

/// Pushes staged files to a remote object store.
///
/// Implementations write the object under `<token>/<basename>` with an
/// authenticated-read policy and return a time-limited retrieval URL.
#[async_trait]
pub trait ObjectStoreUploader: Send + Sync {
    /// Upload the file at `local_path` and return a signed URL for it.
    ///
    /// Fails with [`StorageError::RemoteStore`] on authentication, network,
    /// quota or timeout failures. Callers must not fall back to local storage.
    async fn upload(
        &self,
        local_path: &Path,
        filename: &str,
        token: &UploadToken,
    ) -> StorageResult<String>;
}
