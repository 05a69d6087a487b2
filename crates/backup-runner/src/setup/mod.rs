//! Startup: configuration loading, storage creation and job registration.
//!
//! Everything that can be validated is validated here, before the scheduler
//! starts. A single bad schedule or destination aborts startup and no job runs.

pub mod signal;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use backup_core::{load_config, ResolvedConfig, Settings};
use backup_storage::{create_storage, ObjectStorage};
use backup_worker::{
    BackupJob, DumpTool, ExecutorConfig, PgDump, Schedule, ScheduledJob, Scheduler,
};
use chrono::{DateTime, Utc};

/// Load the configuration document and build a scheduler with every job registered.
pub async fn initialize(settings: &Settings) -> Result<Scheduler> {
    tracing::info!(
        config_file = %settings.config_file.display(),
        timezone = settings.timezone.name(),
        "Loading configuration"
    );
    let config = load_config(&settings.config_file).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            settings.config_file.display()
        )
    })?;

    tokio::fs::create_dir_all(&settings.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                settings.scratch_dir.display()
            )
        })?;

    let dump_tool: Arc<dyn DumpTool> = Arc::new(PgDump::new(
        settings.pg_dump_path.clone(),
        settings.pg_connect_timeout_secs,
    ));
    let scheduler = build_scheduler(settings, &config, dump_tool, Utc::now()).await?;

    tracing::info!(
        destinations = config.destinations.len(),
        backups = scheduler.len(),
        "Configuration loaded"
    );
    Ok(scheduler)
}

/// Build one job per backup. Jobs are only registered once all of them were
/// built, so an error leaves nothing scheduled.
pub async fn build_scheduler(
    settings: &Settings,
    config: &ResolvedConfig,
    dump_tool: Arc<dyn DumpTool>,
    now: DateTime<Utc>,
) -> Result<Scheduler> {
    let executor_config = ExecutorConfig {
        scratch_dir: settings.scratch_dir.clone(),
        archive_dir: settings.archive_dir.clone(),
    };

    let mut storages: BTreeMap<&str, Arc<dyn ObjectStorage>> = BTreeMap::new();
    let mut jobs = Vec::with_capacity(config.backups.len());

    for backup in &config.backups {
        let schedule = Schedule::parse(&backup.schedule).with_context(|| {
            format!(
                "Backup '{}' has an invalid schedule '{}'",
                backup.name, backup.schedule
            )
        })?;
        if schedule.next_after(now, settings.timezone).is_none() {
            bail!(
                "Backup '{}' schedule '{}' never fires",
                backup.name,
                backup.schedule
            );
        }

        let destination = config.destination(&backup.destination).ok_or_else(|| {
            anyhow!(
                "Backup '{}' references unknown destination '{}'",
                backup.name,
                backup.destination
            )
        })?;

        let storage = match storages.get(destination.name.as_str()) {
            Some(storage) => Arc::clone(storage),
            None => {
                let storage = create_storage(destination, &settings.aws_cli_path)
                    .await
                    .with_context(|| {
                        format!("Failed to set up destination '{}'", destination.name)
                    })?;
                tracing::debug!(
                    destination = %destination.name,
                    backend = %storage.backend_type(),
                    "Storage ready"
                );
                storages.insert(destination.name.as_str(), Arc::clone(&storage));
                storage
            }
        };

        let job = BackupJob::new(
            backup.clone(),
            Arc::clone(destination),
            storage,
            Arc::clone(&dump_tool),
            executor_config.clone(),
        );
        jobs.push(ScheduledJob::new(backup.name.clone(), schedule, Arc::new(job)));
    }

    let mut scheduler = Scheduler::new(settings.timezone);
    for job in jobs {
        tracing::info!(
            job = %job.name(),
            schedule = %job.schedule(),
            "Backup scheduled"
        );
        scheduler.register(job);
    }
    Ok(scheduler)
}

/// Print each job's next trigger, in the scheduler's zone.
pub fn print_upcoming(scheduler: &Scheduler, now: DateTime<Utc>) {
    let tz = scheduler.timezone();
    for (job, (name, next)) in scheduler.jobs().iter().zip(scheduler.upcoming(now)) {
        match next {
            Some(at) => println!("{}\t{}\t{}", name, job.schedule(), at.with_timezone(&tz)),
            None => println!("{}\t{}\tnever", name, job.schedule()),
        }
    }
}
