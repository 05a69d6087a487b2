//! Error types module
//!
//! Every variant here is a startup error: the runner refuses to schedule
//! anything while the configuration document is unreadable, unparsable or
//! references something that does not exist.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Destination '{0}' has an empty bucket")]
    MissingBucket(String),

    #[error("Backup #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Backup #{index} references unknown destination '{destination}'")]
    UnknownDestination { index: usize, destination: String },

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
