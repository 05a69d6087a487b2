use std::fmt;

use crate::storage_types::StorageBackend;

/// A resolved object-storage target.
///
/// Built once at startup and shared read-only between jobs. Empty document
/// values are stored as `None`; credentials, region and endpoint have already
/// been filled from the environment fallbacks where the document left them
/// empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    pub name: String,
    pub bucket: String,
    /// Key prefix with leading and trailing slashes removed; may be empty.
    pub prefix: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl Destination {
    pub fn backend(&self) -> StorageBackend {
        StorageBackend::for_endpoint(self.endpoint.as_deref())
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("name", &self.name)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .finish()
    }
}
