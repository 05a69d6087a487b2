pub mod backup;
pub mod destination;
pub mod document;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use backup::BackupDefinition;
pub use destination::Destination;
pub use document::{BackupDoc, ConfigDocument, DestinationDoc};

/// Configuration after expansion, parsing and environment fallback.
///
/// Immutable once built; destinations are reference counted so each scheduled
/// job can hold its own handle.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub destinations: BTreeMap<String, Arc<Destination>>,
    pub backups: Vec<BackupDefinition>,
}

impl ResolvedConfig {
    pub fn destination(&self, name: &str) -> Option<&Arc<Destination>> {
        self.destinations.get(name)
    }
}
