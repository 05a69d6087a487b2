//! Cron scheduler.
//!
//! Every registered job gets its own trigger loop. A trigger spawns the firing
//! on a separate task and returns to waiting, so a slow firing never delays the
//! next trigger of any job. The spawned task is awaited by a supervisor that
//! logs errors and panics, which keeps a faulting job from taking down the
//! process or its neighbours. A trigger that arrives while the previous firing
//! of the same job is still running is skipped.
//!
//! There is no in-band shutdown: [`Scheduler::run`] returns when the shutdown
//! future resolves, dropping the trigger loops. Firings already in progress are
//! not awaited.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use crate::context::JobHandler;
use crate::cron::Schedule;

/// A job ready to be registered: its schedule plus the work to run.
pub struct ScheduledJob {
    name: String,
    schedule: Schedule,
    handler: Arc<dyn JobHandler>,
    in_flight: Arc<AtomicBool>,
}

impl ScheduledJob {
    pub fn new(name: impl Into<String>, schedule: Schedule, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            name: name.into(),
            schedule,
            handler,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }
}

impl fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("name", &self.name)
            .field("schedule", &self.schedule.expr())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Scheduler {
    timezone: Tz,
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    /// Create a scheduler evaluating cron fields in `timezone`.
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            jobs: Vec::new(),
        }
    }

    pub fn register(&mut self, job: ScheduledJob) {
        tracing::debug!(job = %job.name, schedule = %job.schedule, "Job registered");
        self.jobs.push(job);
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Next trigger of every job after `now`, in registration order.
    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<(&str, Option<DateTime<Utc>>)> {
        self.jobs
            .iter()
            .map(|job| (job.name.as_str(), job.schedule.next_after(now, self.timezone)))
            .collect()
    }

    /// Drive all registered jobs until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            jobs = self.jobs.len(),
            timezone = self.timezone.name(),
            "Scheduler started"
        );

        let mut loops = JoinSet::new();
        for job in self.jobs {
            loops.spawn(trigger_loop(Arc::new(job), self.timezone));
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Scheduler shutting down");
                    break;
                }
                Some(result) = loops.join_next() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Trigger loop terminated unexpectedly");
                    }
                }
            }
        }

        loops.abort_all();
        tracing::info!("Scheduler stopped");
    }
}

async fn trigger_loop(job: Arc<ScheduledJob>, timezone: Tz) {
    let mut last = Utc::now();

    loop {
        // Never schedule from a point in the past, e.g. after a suspend.
        let reference = last.max(Utc::now());
        let Some(next) = job.schedule.next_after(reference, timezone) else {
            tracing::warn!(job = %job.name, schedule = %job.schedule, "Schedule has no future triggers");
            return;
        };
        tracing::debug!(job = %job.name, next = %next, "Next trigger");

        sleep_until(next).await;
        fire(&job);
        last = next;
    }
}

/// Sleep until the wall clock reaches `at`.
async fn sleep_until(at: DateTime<Utc>) {
    loop {
        let remaining = at - Utc::now();
        match remaining.to_std() {
            Ok(duration) if !duration.is_zero() => tokio::time::sleep(duration).await,
            _ => return,
        }
    }
}

fn fire(job: &Arc<ScheduledJob>) {
    if job.in_flight.swap(true, Ordering::AcqRel) {
        tracing::warn!(job = %job.name, "Previous run still in progress, skipping trigger");
        return;
    }

    let job = Arc::clone(job);
    tokio::spawn(async move {
        let start = Instant::now();
        let handler = Arc::clone(&job.handler);
        let result = tokio::spawn(async move { handler.run().await }).await;
        job.in_flight.store(false, Ordering::Release);

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(Ok(())) => {
                tracing::info!(job = %job.name, duration_ms, "Job finished");
            }
            Ok(Err(e)) => {
                tracing::error!(job = %job.name, duration_ms, error = %e, "Job failed");
            }
            Err(e) if e.is_panic() => {
                tracing::error!(job = %job.name, duration_ms, panic = %panic_message(e), "Job panicked");
            }
            Err(e) => {
                tracing::warn!(job = %job.name, error = %e, "Job cancelled");
            }
        }
    });
}

fn panic_message(error: tokio::task::JoinError) -> String {
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
