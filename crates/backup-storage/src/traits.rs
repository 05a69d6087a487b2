//! Storage abstraction trait
//!
//! This module defines the `ObjectStorage` trait that all storage backends must
//! implement, and the listing record they return.

use async_trait::async_trait;
use backup_core::StorageBackend;
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Delete batch of {0} keys exceeds the per-request limit")]
    BatchTooLarge(usize),

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

/// One object seen in a listing. Only used while deciding what to prune.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    pub etag: Option<String>,
}

/// Storage abstraction trait
///
/// Backends are bound to a single bucket and its credentials when created, so
/// every method takes bucket-relative keys. Keys never start with `/`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Copy a local file to `key`, replacing any existing object.
    async fn upload_file(&self, local_path: &Path, key: &str) -> StorageResult<()>;

    /// List every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>>;

    /// Delete up to [`crate::DELETE_BATCH_LIMIT`] objects in one request.
    ///
    /// Larger batches are rejected with [`StorageError::BatchTooLarge`]; callers
    /// chunk through [`crate::RetentionPlan::batches`].
    async fn delete_batch(&self, keys: &[String]) -> StorageResult<()>;

    /// Human-readable location of `key`, used in logs.
    fn uri(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
