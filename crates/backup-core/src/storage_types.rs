use std::fmt::{Display, Formatter, Result as FmtResult};

/// Scheme marking an endpoint as a local directory rather than a remote service.
pub const LOCAL_ENDPOINT_SCHEME: &str = "file://";

/// Storage backend types
///
/// Chosen per destination from its endpoint: `file://<dir>` selects the local
/// filesystem, anything else (including no endpoint) goes through the aws CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    AwsCli,
    Local,
}

impl StorageBackend {
    pub fn for_endpoint(endpoint: Option<&str>) -> Self {
        match endpoint {
            Some(e) if e.starts_with(LOCAL_ENDPOINT_SCHEME) => StorageBackend::Local,
            _ => StorageBackend::AwsCli,
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::AwsCli => write!(f, "aws-cli"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}
