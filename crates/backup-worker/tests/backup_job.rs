use async_trait::async_trait;
use backup_core::{BackupDefinition, Destination, StorageBackend};
use backup_storage::{LocalStorage, ObjectStorage, StorageError, StorageResult, StoredObject};
use backup_worker::{
    BackupJob, Clock, DumpError, DumpTool, ExecutorConfig, JobHandler, JobOutcome, PruneOutcome,
};
use chrono::{Duration, TimeZone, Utc};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct FakeDump {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeDump {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl DumpTool for FakeDump {
    async fn dump(&self, _locator: &str, output: &Path) -> Result<(), DumpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // A failing dump still leaves a partial file behind.
        tokio::fs::write(output, b"PGDMP").await.unwrap();
        if self.fail {
            return Err(DumpError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}

struct RejectingStorage;

#[async_trait]
impl ObjectStorage for RejectingStorage {
    async fn upload_file(&self, _local_path: &Path, _key: &str) -> StorageResult<()> {
        Err(StorageError::UploadFailed("access denied".to_string()))
    }

    async fn list(&self, _prefix: &str) -> StorageResult<Vec<StoredObject>> {
        panic!("list must not be called after a failed upload");
    }

    async fn delete_batch(&self, _keys: &[String]) -> StorageResult<()> {
        panic!("delete must not be called after a failed upload");
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://denied/{}", key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::AwsCli
    }
}

/// Clock advancing one minute per reading.
fn stepping_clock() -> Clock {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
    let ticks = Arc::new(AtomicI64::new(0));
    Arc::new(move || base + Duration::minutes(ticks.fetch_add(1, Ordering::SeqCst)))
}

struct Fixture {
    _root: TempDir,
    bucket_root: PathBuf,
    scratch_dir: PathBuf,
    archive_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempdir().unwrap();
        let bucket_root = root.path().join("objects");
        let scratch_dir = root.path().join("scratch");
        std::fs::create_dir_all(&scratch_dir).unwrap();
        Self {
            bucket_root,
            scratch_dir,
            archive_dir: root.path().join("backups"),
            _root: root,
        }
    }

    fn destination(&self) -> Arc<Destination> {
        Arc::new(Destination {
            name: "local".to_string(),
            bucket: "bucket".to_string(),
            prefix: "pre".to_string(),
            endpoint: Some(format!("file://{}", self.bucket_root.display())),
            access_key: None,
            secret_key: None,
            region: None,
        })
    }

    fn config(&self) -> ExecutorConfig {
        ExecutorConfig {
            scratch_dir: self.scratch_dir.clone(),
            archive_dir: self.archive_dir.clone(),
        }
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch_dir).unwrap().next().is_none()
    }
}

fn definition(retention: Option<usize>) -> BackupDefinition {
    BackupDefinition {
        name: "db1-nightly".to_string(),
        url: "postgres://u:p@h/db1?sslmode=disable".to_string(),
        destination: "local".to_string(),
        schedule: "@every 1s".to_string(),
        retention: retention.and_then(NonZeroUsize::new),
    }
}

async fn listed_keys(storage: &dyn ObjectStorage, prefix: &str) -> Vec<String> {
    storage
        .list(prefix)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.key)
        .collect()
}

#[tokio::test]
async fn three_firings_with_history_two_keep_the_newest_two() {
    let fixture = Fixture::new();
    let destination = fixture.destination();
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(LocalStorage::for_destination(&destination).await.unwrap());
    let job = BackupJob::new(
        definition(Some(2)),
        destination,
        Arc::clone(&storage),
        FakeDump::ok(),
        fixture.config(),
    )
    .with_clock(stepping_clock());

    let mut keys = Vec::new();
    for round in 0..3 {
        if round > 0 {
            // Keep modification times distinct on coarse-grained filesystems.
            tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        }
        match job.fire().await {
            JobOutcome::Uploaded { key, pruned } => {
                let expected = if round < 2 { 0 } else { 1 };
                assert_eq!(pruned, PruneOutcome::Deleted(expected));
                keys.push(key);
            }
            other => panic!("firing {} failed: {:?}", round, other),
        }
    }

    assert!(keys.iter().all(|k| k.starts_with("pre/db1/pgdump-") && k.ends_with(".dump")));
    let remaining = listed_keys(storage.as_ref(), "pre/db1/").await;
    assert_eq!(remaining, vec![keys[1].clone(), keys[2].clone()]);
    assert!(fixture.scratch_is_empty());
}

#[tokio::test]
async fn without_retention_nothing_is_pruned() {
    let fixture = Fixture::new();
    let destination = fixture.destination();
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(LocalStorage::for_destination(&destination).await.unwrap());
    let job = BackupJob::new(
        definition(None),
        destination,
        Arc::clone(&storage),
        FakeDump::ok(),
        fixture.config(),
    )
    .with_clock(stepping_clock());

    for _ in 0..3 {
        let outcome = job.fire().await;
        assert!(matches!(
            outcome,
            JobOutcome::Uploaded { pruned: PruneOutcome::Disabled, .. }
        ));
    }
    assert_eq!(listed_keys(storage.as_ref(), "pre/db1/").await.len(), 3);
}

#[tokio::test]
async fn dump_failure_uploads_nothing_and_cleans_scratch() {
    let fixture = Fixture::new();
    let destination = fixture.destination();
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(LocalStorage::for_destination(&destination).await.unwrap());
    let dump = FakeDump::failing();
    let job = BackupJob::new(
        definition(Some(2)),
        destination,
        Arc::clone(&storage),
        dump.clone(),
        fixture.config(),
    );

    let outcome = job.fire().await;

    assert!(matches!(outcome, JobOutcome::DumpFailed(_)));
    assert_eq!(dump.calls.load(Ordering::SeqCst), 1);
    assert!(listed_keys(storage.as_ref(), "").await.is_empty());
    assert!(fixture.scratch_is_empty());
    assert!(job.run().await.is_err());
}

#[tokio::test]
async fn upload_failure_skips_prune_and_cleans_scratch() {
    let fixture = Fixture::new();
    let job = BackupJob::new(
        definition(Some(1)),
        fixture.destination(),
        Arc::new(RejectingStorage),
        FakeDump::ok(),
        fixture.config(),
    );

    match job.fire().await {
        JobOutcome::UploadFailed(reason) => assert!(reason.contains("access denied")),
        other => panic!("expected upload failure, got {:?}", other),
    }
    assert!(fixture.scratch_is_empty());
}

#[tokio::test]
async fn uploaded_dump_is_archived_when_directory_exists() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(&fixture.archive_dir).unwrap();
    let destination = fixture.destination();
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(LocalStorage::for_destination(&destination).await.unwrap());
    let job = BackupJob::new(
        definition(None),
        destination,
        storage,
        FakeDump::ok(),
        fixture.config(),
    )
    .with_clock(stepping_clock());

    let key = match job.fire().await {
        JobOutcome::Uploaded { key, .. } => key,
        other => panic!("expected upload, got {:?}", other),
    };

    let file_name = key.rsplit('/').next().unwrap();
    let archived = fixture.archive_dir.join("db1").join(file_name);
    assert_eq!(std::fs::read(&archived).unwrap(), b"PGDMP");
    assert!(fixture.scratch_is_empty());
    assert!(job.run().await.is_ok());
}
