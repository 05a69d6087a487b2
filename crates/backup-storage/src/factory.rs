#[cfg(feature = "storage-aws-cli")]
use crate::AwsCliStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(any(not(feature = "storage-aws-cli"), not(feature = "storage-local")))]
use crate::StorageError;
use crate::{ObjectStorage, StorageBackend, StorageResult};
use backup_core::Destination;
use std::sync::Arc;

/// Create a storage backend for one destination.
///
/// `aws_cli_path` is the executable used by the aws-CLI backend.
pub async fn create_storage(
    destination: &Destination,
    aws_cli_path: &str,
) -> StorageResult<Arc<dyn ObjectStorage>> {
    match destination.backend() {
        #[cfg(feature = "storage-aws-cli")]
        StorageBackend::AwsCli => Ok(Arc::new(AwsCliStorage::new(aws_cli_path, destination))),

        #[cfg(not(feature = "storage-aws-cli"))]
        StorageBackend::AwsCli => {
            let _ = aws_cli_path;
            Err(StorageError::ConfigError(
                "aws CLI storage backend not available (storage-aws-cli feature not enabled)"
                    .to_string(),
            ))
        }

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::for_destination(destination).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
