//! Backup Runner Infrastructure
//!
//! Process-wide concerns shared by the binary: structured logging setup.

pub mod telemetry;

pub use telemetry::{init_telemetry, DEFAULT_LOG_FILTER};
