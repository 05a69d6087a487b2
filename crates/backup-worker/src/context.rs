//! Job handler trait
//!
//! The scheduler knows nothing about databases or buckets: it calls `run` on
//! whatever handler was registered for a schedule. Backup jobs implement it in
//! [`crate::executor`].

use anyhow::Result;
use async_trait::async_trait;

/// Work performed on every trigger of a scheduled job.
///
/// An `Err` is logged by the scheduler and does not affect later triggers or
/// other jobs. A panic inside `run` is contained the same way.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self) -> Result<()>;
}
