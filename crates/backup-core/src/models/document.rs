//! Serde mirror of the YAML configuration document.
//!
//! ```yaml
//! destinations:
//!   <name>: { bucket, prefix, endpoint, accessKey, secretKey, region }
//! backups:
//!   - { url, destination, schedule, maxHistory }
//! ```
//!
//! Scalars are read leniently: after environment expansion a field such as
//! `endpoint: ${S3_ENDPOINT}` may come out as an empty (null) value, and a
//! numeric-looking value such as `accessKey: 1234` is still a string.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub destinations: BTreeMap<String, DestinationDoc>,
    #[serde(default)]
    pub backups: Vec<BackupDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationDoc {
    #[serde(default, deserialize_with = "scalar")]
    pub bucket: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub endpoint: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub access_key: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub secret_key: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDoc {
    /// Optional label used in logs; defaults to `<destination>[<index>]`.
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub schedule: Option<String>,
    #[serde(default, deserialize_with = "count")]
    pub max_history: Option<i64>,
}

fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

fn count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer, found {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, found '{}'", s))),
        other => Err(D::Error::custom(format!(
            "expected an integer, found {:?}",
            other
        ))),
    }
}
