//! Backup Runner Storage Library
//!
//! Object naming, the retention policy and the storage collaborators that move
//! dumps into buckets.
//!
//! # Object key format
//!
//! `{prefix}/{database}/pgdump-{YYYYMMDDTHHMMSSZ}.dump`. The timestamp is UTC
//! with second precision, so keys of one database sort chronologically. Key
//! generation lives in the `keys` module so every backend stays consistent.

#[cfg(feature = "storage-aws-cli")]
pub mod aws_cli;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod retention;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-aws-cli")]
pub use aws_cli::AwsCliStorage;
pub use backup_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use retention::{plan_retention, prune, RetentionPlan, DELETE_BATCH_LIMIT};
pub use traits::{ObjectStorage, StorageError, StorageResult, StoredObject};
