use std::num::NonZeroUsize;

/// One recurring backup: a source database, where it goes and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDefinition {
    /// Label used in logs and for overlap tracking.
    pub name: String,
    /// Connection string handed verbatim to the dump tool.
    pub url: String,
    /// Name of the destination this backup uploads to.
    pub destination: String,
    /// Cron expression, validated when the job is scheduled.
    pub schedule: String,
    /// Number of dumps to keep under the backup's key prefix; `None` disables pruning.
    pub retention: Option<NonZeroUsize>,
}

impl BackupDefinition {
    /// Map the document's `maxHistory` onto a retention count; zero or negative disables it.
    pub fn retention_from(max_history: Option<i64>) -> Option<NonZeroUsize> {
        max_history
            .and_then(|n| usize::try_from(n).ok())
            .and_then(NonZeroUsize::new)
    }
}
