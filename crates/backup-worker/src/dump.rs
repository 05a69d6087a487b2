//! Database dump collaborator.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;

/// Longest stderr excerpt carried in a [`DumpError::Failed`].
const STDERR_TAIL_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dump exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("Dump finished but produced no file at {0}")]
    MissingOutput(PathBuf),
}

/// Produces a custom-format dump of one database into a local file.
#[async_trait]
pub trait DumpTool: Send + Sync {
    /// Dump the database behind `locator` into `output`. `output` must exist
    /// when this returns `Ok`.
    async fn dump(&self, locator: &str, output: &Path) -> Result<(), DumpError>;
}

/// `pg_dump -Fc <locator> -f <output>` with a bounded connect timeout.
#[derive(Debug, Clone)]
pub struct PgDump {
    program: String,
    connect_timeout_secs: u64,
}

impl PgDump {
    pub fn new(program: impl Into<String>, connect_timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            connect_timeout_secs,
        }
    }
}

#[async_trait]
impl DumpTool for PgDump {
    async fn dump(&self, locator: &str, output: &Path) -> Result<(), DumpError> {
        let start = Instant::now();

        let result = Command::new(&self.program)
            .arg("-Fc")
            .arg(locator)
            .arg("-f")
            .arg(output)
            .env("PGCONNECT_TIMEOUT", self.connect_timeout_secs.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| DumpError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(DumpError::Failed {
                status: result.status,
                stderr: stderr_tail(&result.stderr),
            });
        }

        if tokio::fs::metadata(output).await.is_err() {
            return Err(DumpError::MissingOutput(output.to_path_buf()));
        }

        tracing::debug!(
            output = %output.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "pg_dump finished"
        );
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }
    let mut cut = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...{}", &text[cut..])
}
