//! Retention policy: keep the newest N dumps under a key prefix, delete the rest.

use std::num::NonZeroUsize;
use std::time::Instant;

use crate::keys::is_backup_key;
use crate::traits::{ObjectStorage, StorageResult, StoredObject};

/// Maximum number of keys in one delete request (S3 `DeleteObjects` limit).
pub const DELETE_BATCH_LIMIT: usize = 1000;

/// Outcome of applying a keep-count to a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Retained keys, newest first.
    pub keep: Vec<String>,
    /// Keys to delete, newest first.
    pub delete: Vec<String>,
}

impl RetentionPlan {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty()
    }

    /// Deletion list split into requests of at most [`DELETE_BATCH_LIMIT`] keys.
    pub fn batches(&self) -> impl Iterator<Item = &[String]> {
        self.delete.chunks(DELETE_BATCH_LIMIT)
    }
}

/// Decide which objects to delete so that only the `keep` most recently
/// modified dumps remain.
///
/// Objects that are not dumps written by this runner are ignored entirely. The
/// sort is stable, so objects with equal modification times keep their listing
/// order.
pub fn plan_retention(objects: &[StoredObject], keep: NonZeroUsize) -> RetentionPlan {
    let mut dumps: Vec<&StoredObject> = objects.iter().filter(|o| is_backup_key(&o.key)).collect();
    dumps.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    let split = keep.get().min(dumps.len());
    let (kept, expired) = dumps.split_at(split);

    RetentionPlan {
        keep: kept.iter().map(|o| o.key.clone()).collect(),
        delete: expired.iter().map(|o| o.key.clone()).collect(),
    }
}

/// List `base_path`, plan retention and issue the deletes. Returns the number
/// of objects deleted.
///
/// Stops at the first failed batch; batches already sent stay deleted.
pub async fn prune(
    storage: &dyn ObjectStorage,
    base_path: &str,
    keep: NonZeroUsize,
) -> StorageResult<usize> {
    let start = Instant::now();
    let objects = storage.list(base_path).await?;
    let plan = plan_retention(&objects, keep);

    if plan.is_empty() {
        tracing::debug!(
            prefix = %base_path,
            listed = objects.len(),
            keep = keep.get(),
            "Nothing to prune"
        );
        return Ok(0);
    }

    tracing::info!(
        location = %storage.uri(base_path),
        deleting = plan.delete.len(),
        keep = keep.get(),
        "Deleting old backups"
    );

    let mut deleted = 0;
    for batch in plan.batches() {
        storage.delete_batch(batch).await?;
        deleted += batch.len();
    }

    tracing::debug!(
        prefix = %base_path,
        deleted,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Prune finished"
    );

    Ok(deleted)
}
