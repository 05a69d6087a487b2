//! Cron schedule parsing and evaluation.
//!
//! Supports standard 5-field cron expressions, optionally preceded by a
//! seconds field:
//! ```text
//! ┌───────────── second (0-59, optional)
//! │ ┌───────────── minute (0-59)
//! │ │ ┌───────────── hour (0-23)
//! │ │ │ ┌───────────── day of month (1-31)
//! │ │ │ │ ┌───────────── month (1-12 or JAN-DEC)
//! │ │ │ │ │ ┌───────────── day of week (0-7 or SUN-SAT, 0 and 7 = Sunday)
//! │ │ │ │ │ │
//! * * * * * *
//! ```
//!
//! Descriptors `@yearly` (`@annually`), `@monthly`, `@weekly`, `@daily`
//! (`@midnight`), `@hourly` and `@every <duration>` are accepted too, and any
//! expression may be prefixed with `CRON_TZ=<zone>` or `TZ=<zone>` to override
//! the process time zone for that schedule.

use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, LocalResult, NaiveDate, NaiveDateTime,
    TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when parsing schedules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronParseError {
    #[error("Empty schedule expression")]
    Empty,
    #[error("Invalid cron expression '{expr}': expected 5 or 6 fields, got {count}")]
    InvalidFieldCount { expr: String, count: usize },
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
    #[error("Value {value} is out of range [{min}, {max}] for {field}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("Invalid range: {0}-{1}")]
    InvalidRange(u32, u32),
    #[error("Invalid step value: {0}")]
    InvalidStep(String),
    #[error("Unknown descriptor: @{0}")]
    UnknownDescriptor(String),
    #[error("Invalid interval: '{0}'")]
    InvalidInterval(String),
    #[error("Unknown time zone: '{0}'")]
    UnknownTimeZone(String),
}

const MONTH_NAMES: &[&str] = &[
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DAY_NAMES: &[&str] = &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Bounds and aliases of one cron field.
#[derive(Debug, Clone, Copy)]
struct FieldBounds {
    name: &'static str,
    min: u32,
    max: u32,
    aliases: &'static [&'static str],
    alias_base: u32,
}

const SECOND: FieldBounds = FieldBounds {
    name: "second",
    min: 0,
    max: 59,
    aliases: &[],
    alias_base: 0,
};
const MINUTE: FieldBounds = FieldBounds {
    name: "minute",
    min: 0,
    max: 59,
    aliases: &[],
    alias_base: 0,
};
const HOUR: FieldBounds = FieldBounds {
    name: "hour",
    min: 0,
    max: 23,
    aliases: &[],
    alias_base: 0,
};
const DAY_OF_MONTH: FieldBounds = FieldBounds {
    name: "day of month",
    min: 1,
    max: 31,
    aliases: &[],
    alias_base: 0,
};
const MONTH: FieldBounds = FieldBounds {
    name: "month",
    min: 1,
    max: 12,
    aliases: MONTH_NAMES,
    alias_base: 1,
};
// 7 is accepted as a second spelling of Sunday and folded onto 0.
const DAY_OF_WEEK: FieldBounds = FieldBounds {
    name: "day of week",
    min: 0,
    max: 7,
    aliases: DAY_NAMES,
    alias_base: 0,
};

/// A single field in a cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronField {
    /// The set of valid values for this field.
    pub values: BTreeSet<u32>,
    /// False when some list element is a bare `*` or `?` (a step of 1 counts
    /// as bare). Decides how day-of-month and day-of-week combine.
    pub restricted: bool,
}

impl CronField {
    fn parse(bounds: FieldBounds, expr: &str) -> Result<Self, CronParseError> {
        let mut values = BTreeSet::new();
        let mut wildcard = false;
        for part in expr.split(',') {
            wildcard |= parse_part(bounds, part.trim(), &mut values)?;
        }
        if bounds.name == DAY_OF_WEEK.name && values.remove(&7) {
            values.insert(0);
        }

        Ok(Self {
            values,
            restricted: !wildcard,
        })
    }

    /// Check if a value matches this field.
    pub fn matches(&self, value: u32) -> bool {
        self.values.contains(&value)
    }
}

/// Add the values of one list element. Returns true for an unstepped wildcard.
fn parse_part(
    bounds: FieldBounds,
    part: &str,
    values: &mut BTreeSet<u32>,
) -> Result<bool, CronParseError> {
    if part.is_empty() {
        return Err(CronParseError::InvalidField {
            field: bounds.name.to_string(),
            reason: "empty list element".to_string(),
        });
    }

    // Handle step values (e.g., */5, 0-30/5, 10/15)
    let (range_part, step) = match part.split_once('/') {
        Some((range, step_str)) => {
            let step = step_str
                .parse::<u32>()
                .map_err(|_| CronParseError::InvalidStep(step_str.to_string()))?;
            if step == 0 {
                return Err(CronParseError::InvalidStep("0".to_string()));
            }
            (range, Some(step))
        }
        None => (part, None),
    };

    let is_wildcard = range_part == "*" || range_part == "?";
    let (start, end) = if is_wildcard {
        (bounds.min, bounds.max)
    } else if let Some((lo, hi)) = range_part.split_once('-') {
        let start = parse_value(bounds, lo)?;
        let end = parse_value(bounds, hi)?;
        if start > end {
            return Err(CronParseError::InvalidRange(start, end));
        }
        (start, end)
    } else {
        let value = parse_value(bounds, range_part)?;
        // `N/step` means "from N to the end of the range"
        if step.is_some() {
            (value, bounds.max)
        } else {
            (value, value)
        }
    };

    for value in [start, end] {
        if value < bounds.min || value > bounds.max {
            return Err(CronParseError::OutOfRange {
                field: bounds.name,
                value,
                min: bounds.min,
                max: bounds.max,
            });
        }
    }

    let step = step.unwrap_or(1);
    values.extend((start..=end).step_by(step as usize));
    Ok(is_wildcard && step == 1)
}

fn parse_value(bounds: FieldBounds, raw: &str) -> Result<u32, CronParseError> {
    if let Ok(value) = raw.parse::<u32>() {
        return Ok(value);
    }
    bounds
        .aliases
        .iter()
        .position(|alias| alias.eq_ignore_ascii_case(raw))
        .map(|idx| idx as u32 + bounds.alias_base)
        .ok_or_else(|| CronParseError::InvalidField {
            field: raw.to_string(),
            reason: format!("not a valid {}", bounds.name),
        })
}

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    pub second: CronField,
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month: CronField,
    pub day_of_week: CronField,
}

impl CronExpr {
    /// Parse a 5-field or 6-field cron expression.
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let (second, rest) = match parts.len() {
            5 => ("0", &parts[..]),
            6 => (parts[0], &parts[1..]),
            count => {
                return Err(CronParseError::InvalidFieldCount {
                    expr: expr.to_string(),
                    count,
                })
            }
        };

        Ok(Self {
            second: CronField::parse(SECOND, second)?,
            minute: CronField::parse(MINUTE, rest[0])?,
            hour: CronField::parse(HOUR, rest[1])?,
            day_of_month: CronField::parse(DAY_OF_MONTH, rest[2])?,
            month: CronField::parse(MONTH, rest[3])?,
            day_of_week: CronField::parse(DAY_OF_WEEK, rest[4])?,
        })
    }

    /// Day-of-month and day-of-week combine with OR when both are restricted,
    /// AND otherwise.
    fn matches_day(&self, date: NaiveDate) -> bool {
        let dom = self.day_of_month.matches(date.day());
        let dow = self.day_of_week.matches(date.weekday().num_days_from_sunday());
        if self.day_of_month.restricted && self.day_of_week.restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Check if a wall-clock time matches this expression.
    pub fn matches(&self, t: &NaiveDateTime) -> bool {
        self.second.matches(t.second())
            && self.minute.matches(t.minute())
            && self.hour.matches(t.hour())
            && self.month.matches(t.month())
            && self.matches_day(t.date())
    }

    /// First matching wall-clock time at or after `from`, searching five years ahead.
    pub fn next_local(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        let limit_year = from.year() + 5;
        let mut t = from.with_nanosecond(0)?;

        while t.year() <= limit_year {
            if !self.month.matches(t.month()) {
                t = first_of_next_month(t.date())?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.matches_day(t.date()) {
                t = t.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hour.matches(t.hour()) {
                t = t.date().and_hms_opt(t.hour(), 0, 0)? + ChronoDuration::hours(1);
                continue;
            }
            if !self.minute.matches(t.minute()) {
                t = t.date().and_hms_opt(t.hour(), t.minute(), 0)? + ChronoDuration::minutes(1);
                continue;
            }
            if !self.second.matches(t.second()) {
                t += ChronoDuration::seconds(1);
                continue;
            }
            return Some(t);
        }

        None
    }
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleKind {
    Cron(CronExpr),
    /// Fixed delay between triggers (`@every`).
    Every(Duration),
}

/// A parsed schedule expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    expr: String,
    kind: ScheduleKind,
    timezone: Option<Tz>,
}

impl Schedule {
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(CronParseError::Empty);
        }

        let (timezone, body) = split_timezone(trimmed)?;
        let kind = match body.strip_prefix('@') {
            Some(descriptor) => parse_descriptor(descriptor)?,
            None => ScheduleKind::Cron(CronExpr::parse(body)?),
        };

        Ok(Self {
            expr: trimmed.to_string(),
            kind,
            timezone,
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn kind(&self) -> &ScheduleKind {
        &self.kind
    }

    /// Zone given by a `CRON_TZ=`/`TZ=` prefix, if any.
    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    /// Next trigger strictly after `after`. Cron fields are evaluated as wall
    /// clock time in the schedule's own zone, or `default_tz` when it has none.
    ///
    /// A wall-clock time skipped by a daylight-saving jump fires one hour
    /// later; a repeated one fires on its first occurrence only. Returns `None`
    /// when nothing matches within five years (e.g. `0 0 30 2 *`).
    pub fn next_after(&self, after: DateTime<Utc>, default_tz: Tz) -> Option<DateTime<Utc>> {
        let cron = match &self.kind {
            ScheduleKind::Every(delay) => {
                return Some(after + ChronoDuration::from_std(*delay).ok()?);
            }
            ScheduleKind::Cron(cron) => cron,
        };

        let tz = self.timezone.unwrap_or(default_tz);
        let mut candidate =
            after.with_timezone(&tz).naive_local().with_nanosecond(0)? + ChronoDuration::seconds(1);

        loop {
            let naive = cron.next_local(candidate)?;
            let resolved = match tz.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Some(dt),
                LocalResult::Ambiguous(earliest, _) => Some(earliest),
                LocalResult::None => tz
                    .from_local_datetime(&(naive + ChronoDuration::hours(1)))
                    .earliest(),
            };

            if let Some(dt) = resolved.map(|dt| dt.with_timezone(&Utc)) {
                if dt > after {
                    return Some(dt);
                }
            }
            candidate = naive + ChronoDuration::seconds(1);
        }
    }
}

impl FromStr for Schedule {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schedule::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn split_timezone(expr: &str) -> Result<(Option<Tz>, &str), CronParseError> {
    let Some(rest) = expr
        .strip_prefix("CRON_TZ=")
        .or_else(|| expr.strip_prefix("TZ="))
    else {
        return Ok((None, expr));
    };

    let (zone, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let tz = zone
        .parse::<Tz>()
        .map_err(|_| CronParseError::UnknownTimeZone(zone.to_string()))?;
    let body = body.trim();
    if body.is_empty() {
        return Err(CronParseError::Empty);
    }
    Ok((Some(tz), body))
}

fn parse_descriptor(descriptor: &str) -> Result<ScheduleKind, CronParseError> {
    let (name, argument) = descriptor
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((descriptor, ""));

    let expr = match name.to_ascii_lowercase().as_str() {
        "yearly" | "annually" => "0 0 0 1 1 *",
        "monthly" => "0 0 0 1 * *",
        "weekly" => "0 0 0 * * 0",
        "daily" | "midnight" => "0 0 0 * * *",
        "hourly" => "0 0 * * * *",
        "every" => return parse_interval(argument).map(ScheduleKind::Every),
        _ => return Err(CronParseError::UnknownDescriptor(descriptor.to_string())),
    };
    if !argument.is_empty() {
        return Err(CronParseError::UnknownDescriptor(descriptor.to_string()));
    }
    CronExpr::parse(expr).map(ScheduleKind::Cron)
}

/// Parse a duration such as `90s`, `15m` or `1h30m`. Units: `h`, `m`, `s`, `ms`.
///
/// Rounded down to whole seconds, with a floor of one second.
fn parse_interval(raw: &str) -> Result<Duration, CronParseError> {
    let invalid = || CronParseError::InvalidInterval(raw.to_string());
    if raw.is_empty() {
        return Err(invalid());
    }

    let mut total_ms: u64 = 0;
    let mut rest = raw;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid());
        }
        let amount: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let factor = match &rest[..unit_len] {
            "h" => 3_600_000,
            "m" => 60_000,
            "s" => 1_000,
            "ms" => 1,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total_ms = amount
            .checked_mul(factor)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(invalid)?;
    }

    if total_ms == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs((total_ms / 1000).max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn cron(expr: &str) -> CronExpr {
        match Schedule::parse(expr).unwrap().kind {
            ScheduleKind::Cron(c) => c,
            other => panic!("expected cron schedule, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_wildcard() {
        let expr = cron("* * * * *");
        assert_eq!(expr.second.values.len(), 1);
        assert_eq!(expr.minute.values.len(), 60);
        assert_eq!(expr.hour.values.len(), 24);
        assert_eq!(expr.day_of_week.values.len(), 7);
    }

    #[test]
    fn test_parse_step_range_and_list() {
        let expr = cron("*/15 9-17 1,15 * MON-FRI");
        assert_eq!(
            expr.minute.values.iter().copied().collect::<Vec<_>>(),
            vec![0, 15, 30, 45]
        );
        assert!(expr.hour.matches(9) && expr.hour.matches(17) && !expr.hour.matches(8));
        assert!(expr.day_of_month.matches(15));
        assert_eq!(
            expr.day_of_week.values.iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_parse_start_with_step() {
        let expr = cron("10/20 * * * *");
        assert_eq!(
            expr.minute.values.iter().copied().collect::<Vec<_>>(),
            vec![10, 30, 50]
        );
    }

    #[test]
    fn test_parse_six_fields_with_seconds() {
        let expr = cron("*/10 * * * * *");
        assert_eq!(expr.second.values.len(), 6);
        assert_eq!(expr.minute.values.len(), 60);
    }

    #[test]
    fn test_month_names_and_sunday_as_seven() {
        let expr = cron("0 0 * jan,Dec 7");
        assert!(expr.month.matches(1) && expr.month.matches(12));
        assert!(expr.day_of_week.matches(0));
        assert!(!expr.day_of_week.matches(7));
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(cron("@daily"), cron("0 0 * * *"));
        assert_eq!(cron("@midnight"), cron("0 0 * * *"));
        assert_eq!(cron("@hourly"), cron("0 * * * *"));
        assert_eq!(cron("@weekly"), cron("0 0 * * 0"));
        assert_eq!(cron("@monthly"), cron("0 0 1 * *"));
        assert_eq!(cron("@yearly"), cron("@annually"));
    }

    #[test]
    fn test_every_descriptor() {
        let schedule = Schedule::parse("@every 1h30m").unwrap();
        assert_eq!(schedule.kind(), &ScheduleKind::Every(Duration::from_secs(5400)));

        let schedule = Schedule::parse("@every 500ms").unwrap();
        assert_eq!(schedule.kind(), &ScheduleKind::Every(Duration::from_secs(1)));

        let now = utc(2024, 1, 1, 0, 0, 0);
        let every = Schedule::parse("@every 90s").unwrap();
        assert_eq!(every.next_after(now, Tz::UTC), Some(utc(2024, 1, 1, 0, 1, 30)));
    }

    #[test]
    fn test_invalid_expressions() {
        for expr in [
            "",
            "* *",
            "* * * * * * *",
            "60 * * * *",
            "* 25 * * *",
            "0 0 32 * *",
            "0 0 * 13 *",
            "*/0 * * * *",
            "5-1 * * * *",
            "0 0 * * FUNDAY",
            "1,,2 * * * *",
            "@fortnightly",
            "@daily 3",
            "@every",
            "@every 0s",
            "@every 10x",
            "@every h",
            "CRON_TZ=Mars/Olympus 0 0 * * *",
            "TZ=UTC",
        ] {
            assert!(Schedule::parse(expr).is_err(), "{:?} should not parse", expr);
        }
    }

    #[test]
    fn test_next_run_hourly() {
        let schedule = Schedule::parse("0 * * * *").unwrap();
        let next = schedule.next_after(utc(2024, 1, 15, 14, 30, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 1, 15, 15, 0, 0)));
    }

    #[test]
    fn test_next_run_is_strictly_after() {
        let schedule = Schedule::parse("0 3 * * *").unwrap();
        let next = schedule.next_after(utc(2024, 1, 15, 3, 0, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 1, 16, 3, 0, 0)));
    }

    #[test]
    fn test_next_run_with_seconds() {
        let schedule = Schedule::parse("*/20 * * * * *").unwrap();
        let next = schedule.next_after(utc(2024, 1, 15, 3, 0, 41), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 1, 15, 3, 1, 0)));
    }

    #[test]
    fn test_next_run_crosses_year() {
        let schedule = Schedule::parse("@yearly").unwrap();
        let next = schedule.next_after(utc(2024, 6, 1, 0, 0, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2025, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_day_of_month_or_day_of_week() {
        // 13th of the month or any Friday.
        let schedule = Schedule::parse("0 0 13 * FRI").unwrap();
        // 2024-09-01 is a Sunday; the first Friday is the 6th.
        let next = schedule.next_after(utc(2024, 9, 1, 0, 0, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 9, 6, 0, 0, 0)));
        let next = schedule.next_after(utc(2024, 9, 10, 0, 0, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 9, 13, 0, 0, 0)));
    }

    #[test]
    fn test_stepped_day_of_month_combines_with_day_of_week() {
        // Odd days of the month or any Monday. 2024-09-02 is a Monday.
        let schedule = Schedule::parse("0 0 */2 * MON").unwrap();
        let next = schedule.next_after(utc(2024, 9, 2, 0, 0, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 9, 3, 0, 0, 0)));
        let next = schedule.next_after(utc(2024, 9, 7, 0, 0, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 9, 9, 0, 0, 0)));
    }

    #[test]
    fn test_unit_step_wildcard_stays_unrestricted() {
        assert!(!cron("0 0 */1 * MON").day_of_month.restricted);
        assert!(cron("0 0 */2 * MON").day_of_month.restricted);
        assert!(cron("0 0 1-31 * MON").day_of_month.restricted);
        // Any Monday, since every day of the month matches.
        let schedule = Schedule::parse("0 0 */1 * MON").unwrap();
        let next = schedule.next_after(utc(2024, 9, 2, 0, 0, 0), Tz::UTC);
        assert_eq!(next, Some(utc(2024, 9, 9, 0, 0, 0)));
    }

    #[test]
    fn test_next_run_in_process_timezone() {
        let schedule = Schedule::parse("0 3 * * *").unwrap();
        // Berlin is UTC+1 in January.
        let next = schedule.next_after(utc(2024, 1, 15, 12, 0, 0), chrono_tz::Europe::Berlin);
        assert_eq!(next, Some(utc(2024, 1, 16, 2, 0, 0)));
    }

    #[test]
    fn test_schedule_timezone_prefix_overrides_default() {
        let schedule = Schedule::parse("CRON_TZ=America/New_York 0 9 * * *").unwrap();
        assert_eq!(schedule.timezone(), Some(chrono_tz::America::New_York));
        let next = schedule.next_after(utc(2024, 7, 1, 0, 0, 0), chrono_tz::Europe::Berlin);
        // New York is UTC-4 in July.
        assert_eq!(next, Some(utc(2024, 7, 1, 13, 0, 0)));
    }

    #[test]
    fn test_spring_forward_gap_fires_an_hour_later() {
        // 2024-03-31 02:00 does not exist in Berlin; clocks jump to 03:00 CEST.
        let schedule = Schedule::parse("30 2 * * *").unwrap();
        let next = schedule.next_after(utc(2024, 3, 30, 12, 0, 0), chrono_tz::Europe::Berlin);
        assert_eq!(next, Some(utc(2024, 3, 31, 1, 30, 0)));
    }

    #[test]
    fn test_fall_back_fires_once() {
        // 2024-10-27 02:30 happens twice in Berlin (CEST then CET).
        let schedule = Schedule::parse("30 2 * * *").unwrap();
        let first = schedule
            .next_after(utc(2024, 10, 26, 12, 0, 0), chrono_tz::Europe::Berlin)
            .unwrap();
        assert_eq!(first, utc(2024, 10, 27, 0, 30, 0));
        let second = schedule.next_after(first, chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(second, utc(2024, 10, 28, 1, 30, 0));
    }

    #[test]
    fn test_impossible_date_never_fires() {
        let schedule = Schedule::parse("0 0 30 2 *").unwrap();
        assert_eq!(schedule.next_after(utc(2024, 1, 1, 0, 0, 0), Tz::UTC), None);
    }

    #[test]
    fn test_display_keeps_original_expression() {
        let schedule: Schedule = " 0 3 * * * ".parse().unwrap();
        assert_eq!(schedule.to_string(), "0 3 * * *");
    }
}
