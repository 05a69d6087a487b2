//! Backup runner: reads a YAML configuration, then dumps every configured
//! database on its cron schedule and uploads the result to object storage.
//!
//! Process settings come from the environment (see `backup_core::Settings`).
//! Any configuration error stops the process with a non-zero exit status before
//! a single job is scheduled.

mod setup;

use std::path::PathBuf;

use anyhow::Context;
use backup_core::Settings;
use clap::Parser;

// Use mimalloc as the global allocator.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(
    name = "backup-runner",
    version,
    about = "Scheduled PostgreSQL backups to object storage"
)]
struct Cli {
    /// Path to the YAML configuration document
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Validate the configuration, print each job's next trigger and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env().context("Invalid process settings")?;
    if let Some(path) = cli.config {
        settings.config_file = path;
    }

    backup_infra::init_telemetry(settings.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let scheduler = setup::initialize(&settings).await?;

    if cli.check {
        setup::print_upcoming(&scheduler, chrono::Utc::now());
        return Ok(());
    }

    scheduler.run(setup::signal::shutdown_signal()).await;
    Ok(())
}
