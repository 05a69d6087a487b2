use crate::retention::DELETE_BATCH_LIMIT;
use crate::traits::{ObjectStorage, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use backup_core::storage_types::LOCAL_ENDPOINT_SCHEME;
use backup_core::{Destination, StorageBackend};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;

/// Local filesystem storage implementation
///
/// Selected by a destination endpoint of the form `file://<dir>`. Objects live
/// at `<dir>/<bucket>/<key>` and their modification time stands in for the
/// object's last-modified timestamp.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    bucket_path: PathBuf,
    bucket: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path`, creating `<base_path>/<bucket>`.
    pub async fn new(base_path: impl Into<PathBuf>, bucket: &str) -> StorageResult<Self> {
        let bucket_path = base_path.into().join(bucket);

        fs::create_dir_all(&bucket_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                bucket_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            bucket_path,
            bucket: bucket.to_string(),
        })
    }

    pub async fn for_destination(destination: &Destination) -> StorageResult<Self> {
        let endpoint = destination.endpoint.as_deref().unwrap_or_default();
        let root = endpoint
            .strip_prefix(LOCAL_ENDPOINT_SCHEME)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "destination '{}' endpoint '{}' is not a file:// directory",
                    destination.name, endpoint
                ))
            })?;
        Self::new(root, &destination.bucket).await
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Convert a storage key to a filesystem path, rejecting keys that could
    /// escape the bucket directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.starts_with('/')
            || storage_key.split('/').any(|segment| segment == "..")
        {
            return Err(StorageError::InvalidKey(format!(
                "'{}' is not a relative object key",
                storage_key
            )));
        }
        Ok(self.bucket_path.join(storage_key))
    }

    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.bucket_path).ok()?;
        let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
        Some(segments?.join("/"))
    }

    /// Walk the bucket directory and collect every file below it.
    async fn walk(&self) -> StorageResult<Vec<(String, std::fs::Metadata)>> {
        let mut found = Vec::new();
        let mut pending = vec![self.bucket_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::ListFailed(format!("{}: {}", dir.display(), e))),
            };

            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(entry.path());
                } else if let Some(key) = self.path_to_key(&entry.path()) {
                    found.push((key, metadata));
                }
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload_file(&self, local_path: &Path, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let size = fs::copy(local_path, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                local_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::debug!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        let prefix = prefix.trim_start_matches('/');
        let mut objects = Vec::new();

        for (key, metadata) in self.walk().await? {
            if !key.starts_with(prefix) {
                continue;
            }
            let last_modified: DateTime<Utc> = metadata.modified()?.into();
            objects.push(StoredObject {
                key,
                last_modified,
                size: metadata.len(),
                etag: None,
            });
        }

        // Match S3 listings, which come back in key order.
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<()> {
        if keys.len() > DELETE_BATCH_LIMIT {
            return Err(StorageError::BatchTooLarge(keys.len()));
        }

        for key in keys {
            let path = self.key_to_path(key)?;
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!("{}: {}", key, e)));
                }
            }
        }
        Ok(())
    }

    fn uri(&self, key: &str) -> String {
        format!(
            "{}{}/{}",
            LOCAL_ENDPOINT_SCHEME,
            self.bucket_path.display(),
            key.trim_start_matches('/')
        )
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
