//! Object key naming
//!
//! Key format: `{prefix}/{database}/pgdump-{YYYYMMDDTHHMMSSZ}.dump`, with the
//! prefix segment omitted when the destination has none. The timestamp is UTC
//! with second precision and no separators, so listing a database's keys in
//! lexicographic order lists its dumps in chronological order. Tools outside
//! this process read buckets relying on that, so the layout must not change.

use chrono::{DateTime, Utc};

/// Database name used when the connection string names no database.
pub const ALL_DATABASES: &str = "all";
pub const KEY_PREFIX: &str = "pgdump-";
pub const KEY_SUFFIX: &str = ".dump";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// The text after the last `/` of `locator`, cut at the first `?`.
///
/// Falls back to [`ALL_DATABASES`] when there is no `/`, nothing follows it,
/// or only a query string follows it.
pub fn database_name(locator: &str) -> &str {
    match locator.rfind('/') {
        Some(idx) if idx + 1 < locator.len() => {
            let tail = &locator[idx + 1..];
            let name = tail.split('?').next().unwrap_or(tail);
            if name.is_empty() {
                ALL_DATABASES
            } else {
                name
            }
        }
        _ => ALL_DATABASES,
    }
}

/// `{prefix}/{database}/`, with slashes around `prefix` trimmed.
pub fn base_path(prefix: &str, database: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/", database)
    } else {
        format!("{}/{}/", prefix, database)
    }
}

/// Format `at` as `YYYYMMDDTHHMMSSZ`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Full object key for a dump taken at `at` under `base_path`.
pub fn object_key(base_path: &str, at: DateTime<Utc>) -> String {
    format!("{}{}{}{}", base_path, KEY_PREFIX, format_timestamp(at), KEY_SUFFIX)
}

/// Whether `key` names a dump written by this runner (`.../pgdump-*.dump`).
pub fn is_backup_key(key: &str) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name.starts_with(KEY_PREFIX) && file_name.ends_with(KEY_SUFFIX)
}
