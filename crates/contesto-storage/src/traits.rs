//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (local filesystem, in-memory) must implement
/// this trait. The submission flow works against it without coupling
/// to a concrete backend.
///
/// **Key format:** keys come from
/// [`crate::document_key::build_fine_document_key`] and never contain
/// `..` or a leading `/`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data under a storage key and return the public URL.
    async fn upload(
        &self,
        storage_key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Generate a temporary URL for direct read access.
    ///
    /// Used to hand the client a short-lived preview link after a
    /// successful submission.
    async fn presigned_url(&self, storage_key: &str, expires_in: Duration)
        -> StorageResult<String>;

    /// Delete a file by its storage key. Deleting a missing key is not
    /// an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
