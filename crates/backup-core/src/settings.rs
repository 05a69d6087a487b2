//! Process settings
//!
//! Everything the runner needs before it can read the configuration document:
//! where that document lives, where dumps are written, which external tools to
//! call and how to interpret schedules. All values come from the environment
//! (with `.env` support) and have defaults suitable for the container image.

use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_CONFIG_FILE: &str = "/config.yaml";
pub const DEFAULT_ARCHIVE_DIR: &str = "/backups";
const PG_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct Settings {
    pub config_file: PathBuf,
    /// Directory receiving in-progress dump files.
    pub scratch_dir: PathBuf,
    /// Local retention directory; dumps are moved here after upload when it exists.
    pub archive_dir: PathBuf,
    pub pg_dump_path: String,
    pub aws_cli_path: String,
    pub pg_connect_timeout_secs: u64,
    /// Zone used to compute cron trigger times.
    pub timezone: Tz,
    pub log_json: bool,
}

impl Settings {
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let pg_connect_timeout_secs = match get("PG_CONNECT_TIMEOUT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidSetting {
                    name: "PG_CONNECT_TIMEOUT",
                    reason: format!("'{}' is not a number of seconds", raw),
                })?,
            None => PG_CONNECT_TIMEOUT_SECS,
        };

        Ok(Settings {
            config_file: get("CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
            scratch_dir: get("BACKUP_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            archive_dir: get("BACKUP_ARCHIVE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_DIR)),
            pg_dump_path: get("PG_DUMP_PATH").unwrap_or_else(|| "pg_dump".to_string()),
            aws_cli_path: get("AWS_CLI_PATH").unwrap_or_else(|| "aws".to_string()),
            pg_connect_timeout_secs,
            timezone: parse_timezone(get("TZ").as_deref())?,
            log_json: get("LOG_FORMAT")
                .map(|f| f.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

/// Parse a `TZ` value. Accepts IANA names, the POSIX `:Name` form and paths
/// into a zoneinfo tree; unset means UTC.
pub fn parse_timezone(raw: Option<&str>) -> ConfigResult<Tz> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(Tz::UTC);
    };

    let name = raw.trim_start_matches(':');
    let name = name
        .rsplit_once("zoneinfo/")
        .map(|(_, zone)| zone)
        .unwrap_or(name);

    name.parse::<Tz>().map_err(|e| ConfigError::InvalidSetting {
        name: "TZ",
        reason: format!("'{}' is not an IANA time zone name: {}", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(pairs: &[(&str, &str)]) -> ConfigResult<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(move |name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = settings_with(&[]).unwrap();
        assert_eq!(settings.config_file, PathBuf::from("/config.yaml"));
        assert_eq!(settings.archive_dir, PathBuf::from("/backups"));
        assert_eq!(settings.pg_dump_path, "pg_dump");
        assert_eq!(settings.aws_cli_path, "aws");
        assert_eq!(settings.pg_connect_timeout_secs, 10);
        assert_eq!(settings.timezone, Tz::UTC);
        assert!(!settings.log_json);
    }

    #[test]
    fn overrides_are_read() {
        let settings = settings_with(&[
            ("CONFIG_FILE", "/etc/backup.yaml"),
            ("PG_CONNECT_TIMEOUT", "30"),
            ("TZ", "Europe/Berlin"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(settings.config_file, PathBuf::from("/etc/backup.yaml"));
        assert_eq!(settings.pg_connect_timeout_secs, 30);
        assert_eq!(settings.timezone, chrono_tz::Europe::Berlin);
        assert!(settings.log_json);
    }

    #[test]
    fn empty_config_file_falls_back_to_default() {
        let settings = settings_with(&[("CONFIG_FILE", "")]).unwrap();
        assert_eq!(settings.config_file, PathBuf::from("/config.yaml"));
    }

    #[test]
    fn timezone_accepts_posix_and_path_forms() {
        assert_eq!(
            parse_timezone(Some(":America/New_York")).unwrap(),
            chrono_tz::America::New_York
        );
        assert_eq!(
            parse_timezone(Some("/usr/share/zoneinfo/Asia/Tokyo")).unwrap(),
            chrono_tz::Asia::Tokyo
        );
        assert_eq!(parse_timezone(None).unwrap(), Tz::UTC);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            settings_with(&[("TZ", "Mars/Olympus")]),
            Err(ConfigError::InvalidSetting { name: "TZ", .. })
        ));
        assert!(matches!(
            settings_with(&[("PG_CONNECT_TIMEOUT", "soon")]),
            Err(ConfigError::InvalidSetting { name: "PG_CONNECT_TIMEOUT", .. })
        ));
    }
}
