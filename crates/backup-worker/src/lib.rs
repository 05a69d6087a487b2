//! Backup Runner Worker Library
//!
//! Cron parsing, the job scheduler and the backup job executor.

pub mod context;
pub mod cron;
pub mod dump;
pub mod executor;
pub mod scheduler;

pub use context::JobHandler;
pub use cron::{CronExpr, CronField, CronParseError, Schedule, ScheduleKind};
pub use dump::{DumpError, DumpTool, PgDump};
pub use executor::{BackupJob, Clock, ExecutorConfig, JobOutcome, PruneOutcome};
pub use scheduler::{ScheduledJob, Scheduler};
