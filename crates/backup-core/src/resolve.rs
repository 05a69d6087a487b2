//! Configuration resolution
//!
//! Turns raw document text into a [`ResolvedConfig`]: expand placeholders over
//! the whole text, parse it, then build immutable destinations and backup
//! definitions. Credential, region and endpoint fields that are still empty
//! after expansion fall back to the standard AWS environment variables. Empty
//! credentials are not an error here; the storage client reports them when it
//! is first used.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};
use crate::expand::expand_with;
use crate::models::{BackupDefinition, ConfigDocument, Destination, DestinationDoc, ResolvedConfig};

pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const REGION_ENV: &str = "AWS_DEFAULT_REGION";
pub const ENDPOINT_ENV: &str = "AWS_ENDPOINT_URL";

/// Read, expand, parse and resolve the document at `path` against the process environment.
pub fn load_config(path: &Path) -> ConfigResult<ResolvedConfig> {
    load_config_with(path, |name| env::var(name).ok())
}

pub fn load_config_with<F>(path: &Path, lookup: F) -> ConfigResult<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_document(&raw, &lookup)?;
    resolve(document, &lookup)
}

/// Expand placeholders in `raw` and parse the result.
pub fn parse_document<F>(raw: &str, lookup: F) -> ConfigResult<ConfigDocument>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_with(raw, lookup);
    Ok(serde_yaml::from_str(&expanded)?)
}

/// Build the resolved configuration from a parsed document.
///
/// Fails on an empty bucket, a backup missing its url, destination or
/// schedule, or a backup naming a destination that does not exist.
pub fn resolve<F>(document: ConfigDocument, lookup: F) -> ConfigResult<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut destinations = BTreeMap::new();
    for (name, doc) in document.destinations {
        let destination = resolve_destination(&name, doc, &lookup)?;
        destinations.insert(name, Arc::new(destination));
    }

    let mut backups = Vec::with_capacity(document.backups.len());
    for (index, doc) in document.backups.into_iter().enumerate() {
        let url = required(doc.url, index, "url")?;
        let destination = required(doc.destination, index, "destination")?;
        let schedule = required(doc.schedule, index, "schedule")?;

        if !destinations.contains_key(&destination) {
            return Err(ConfigError::UnknownDestination { index, destination });
        }

        let name = non_empty(doc.name).unwrap_or_else(|| format!("{}[{}]", destination, index));

        backups.push(BackupDefinition {
            name,
            url,
            destination,
            schedule: schedule.trim().to_string(),
            retention: BackupDefinition::retention_from(doc.max_history),
        });
    }

    Ok(ResolvedConfig {
        destinations,
        backups,
    })
}

fn resolve_destination<F>(name: &str, doc: DestinationDoc, lookup: &F) -> ConfigResult<Destination>
where
    F: Fn(&str) -> Option<String>,
{
    let bucket =
        non_empty(doc.bucket).ok_or_else(|| ConfigError::MissingBucket(name.to_string()))?;

    Ok(Destination {
        name: name.to_string(),
        bucket,
        prefix: doc.prefix.unwrap_or_default().trim_matches('/').to_string(),
        endpoint: or_env(doc.endpoint, ENDPOINT_ENV, lookup),
        access_key: or_env(doc.access_key, ACCESS_KEY_ENV, lookup),
        secret_key: or_env(doc.secret_key, SECRET_KEY_ENV, lookup),
        region: or_env(doc.region, REGION_ENV, lookup),
    })
}

fn or_env<F>(value: Option<String>, var: &str, lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(value).or_else(|| non_empty(lookup(var)))
}

fn required(value: Option<String>, index: usize, field: &'static str) -> ConfigResult<String> {
    non_empty(value).ok_or(ConfigError::MissingField { index, field })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
