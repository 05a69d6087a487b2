//! Backup job execution: dump, upload, archive, prune.
//!
//! Each trigger of a backup schedule calls [`BackupJob::fire`]. Dump and upload
//! failures end the firing; archive and prune failures are logged and the
//! firing still counts as uploaded. The scratch dump is removed when the
//! firing ends, whatever the outcome.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use backup_core::{BackupDefinition, Destination};
use backup_storage::{keys, prune, ObjectStorage};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::context::JobHandler;
use crate::dump::DumpTool;

/// Source of "now" for object keys and scratch names.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Local directories used by every firing.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Where dumps are written before upload.
    pub scratch_dir: PathBuf,
    /// Uploaded dumps are moved below this directory when it exists.
    pub archive_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneOutcome {
    /// The backup has no retention count.
    Disabled,
    /// Number of old dumps deleted.
    Deleted(usize),
    /// Listing or deleting failed; the upload itself succeeded.
    Failed(String),
}

/// Result of one firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Uploaded { key: String, pruned: PruneOutcome },
    DumpFailed(String),
    UploadFailed(String),
}

/// Removes the scratch dump when the firing ends.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(dir: &Path, at: DateTime<Utc>) -> Self {
        let name = format!(
            "{}{}-{}{}",
            keys::KEY_PREFIX,
            keys::format_timestamp(at),
            Uuid::new_v4().simple(),
            keys::KEY_SUFFIX
        );
        Self {
            path: dir.join(name),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scratch dump"
            ),
        }
    }
}

/// One configured backup bound to its storage and dump tool.
pub struct BackupJob {
    definition: BackupDefinition,
    destination: Arc<Destination>,
    storage: Arc<dyn ObjectStorage>,
    dump_tool: Arc<dyn DumpTool>,
    config: ExecutorConfig,
    clock: Clock,
}

impl BackupJob {
    pub fn new(
        definition: BackupDefinition,
        destination: Arc<Destination>,
        storage: Arc<dyn ObjectStorage>,
        dump_tool: Arc<dyn DumpTool>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            definition,
            destination,
            storage,
            dump_tool,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. to produce distinct keys in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn definition(&self) -> &BackupDefinition {
        &self.definition
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Run one backup cycle.
    pub async fn fire(&self) -> JobOutcome {
        let span = tracing::info_span!(
            "backup_job",
            job = %self.definition.name,
            destination = %self.destination.name
        );
        self.fire_inner().instrument(span).await
    }

    async fn fire_inner(&self) -> JobOutcome {
        let start = Instant::now();
        let database = keys::database_name(&self.definition.url);
        let scratch = ScratchFile::new(&self.config.scratch_dir, (self.clock)());

        tracing::info!(phase = "dump", database = %database, "Backup started");
        if let Err(e) = self
            .dump_tool
            .dump(&self.definition.url, scratch.path())
            .await
        {
            tracing::error!(phase = "dump", database = %database, error = %e, "Dump failed");
            return JobOutcome::DumpFailed(e.to_string());
        }

        let base_path = keys::base_path(&self.destination.prefix, database);
        let key = keys::object_key(&base_path, (self.clock)());
        let uri = self.storage.uri(&key);

        if let Err(e) = self.storage.upload_file(scratch.path(), &key).await {
            tracing::error!(phase = "upload", uri = %uri, error = %e, "Upload failed");
            return JobOutcome::UploadFailed(e.to_string());
        }
        tracing::info!(
            phase = "upload",
            uri = %uri,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Backup uploaded"
        );

        self.archive(scratch.path(), database, &key).await;

        let pruned = match self.definition.retention {
            None => PruneOutcome::Disabled,
            Some(keep) => match prune(self.storage.as_ref(), &base_path, keep).await {
                Ok(deleted) => PruneOutcome::Deleted(deleted),
                Err(e) => {
                    tracing::warn!(phase = "prune", prefix = %base_path, error = %e, "Pruning old backups failed");
                    PruneOutcome::Failed(e.to_string())
                }
            },
        };

        JobOutcome::Uploaded { key, pruned }
    }

    /// Move the scratch dump to `<archive_dir>/<database>/<object file name>`
    /// when the archive directory exists. Falls back to copying when the move
    /// crosses filesystems.
    async fn archive(&self, scratch: &Path, database: &str, key: &str) {
        if !tokio::fs::metadata(&self.config.archive_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return;
        }

        let file_name = key.rsplit('/').next().unwrap_or(key);
        let dir = self.config.archive_dir.join(database);
        let target = dir.join(file_name);

        match move_file(scratch, &dir, &target).await {
            Ok(()) => {
                tracing::info!(phase = "archive", path = %target.display(), "Dump archived locally")
            }
            Err(e) => tracing::warn!(
                phase = "archive",
                path = %target.display(),
                error = %e,
                "Failed to archive dump locally"
            ),
        }
    }
}

async fn move_file(from: &Path, dir: &Path, to: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    if tokio::fs::rename(from, to).await.is_err() {
        tokio::fs::copy(from, to).await?;
    }
    Ok(())
}

#[async_trait]
impl JobHandler for BackupJob {
    async fn run(&self) -> Result<()> {
        match self.fire().await {
            JobOutcome::Uploaded { .. } => Ok(()),
            JobOutcome::DumpFailed(e) => Err(anyhow!("dump failed: {}", e)),
            JobOutcome::UploadFailed(e) => Err(anyhow!("upload failed: {}", e)),
        }
    }
}
