//! Backup Runner Core Library
//!
//! Configuration for the backup runner: process settings, the YAML document
//! model, environment placeholder expansion and the resolution pass that turns
//! a document into immutable destinations and backup definitions.

pub mod error;
pub mod expand;
pub mod models;
pub mod resolve;
pub mod settings;
pub mod storage_types;

// Re-export commonly used types
pub use error::{ConfigError, ConfigResult};
pub use expand::expand_with;
pub use models::{BackupDefinition, ConfigDocument, Destination, ResolvedConfig};
pub use resolve::{load_config, load_config_with, parse_document, resolve};
pub use settings::Settings;
pub use storage_types::StorageBackend;
