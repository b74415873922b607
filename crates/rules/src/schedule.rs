//! Cron helpers shared by catalog validation and the alert scheduler.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Expand a 5-field cron expression to 6 fields by adding a leading "0" seconds field.
///
/// The `cron` crate requires at least 6 fields:
/// `sec min hour day-of-month month day-of-week`. Catalog YAML may use
/// standard 5-field cron: `min hour day-of-month month day-of-week`.
/// Quartz-style 7-field expressions (with a year field) pass through.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    let field_count = trimmed.split_whitespace().count();
    if field_count == 5 {
        format!("0 {}", trimmed)
    } else {
        // Already 6/7-field or non-standard; pass through as-is.
        trimmed.to_string()
    }
}

/// Parse a catalog cron expression, normalizing the field count first.
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&normalize_cron(expr))
}

/// Whether a cron schedule has come due by `now`.
///
/// An alert is due if a scheduled tick falls between `last_tick`
/// (exclusive) and `now` (inclusive). If `last_tick` is `None`, any
/// tick within the past day counts.
pub fn is_cron_due(
    schedule: &Schedule,
    now: DateTime<Utc>,
    last_tick: Option<DateTime<Utc>>,
) -> bool {
    // `schedule.after()` yields upcoming times, so check whether one lands
    // between the last tick and now.
    let check_from = last_tick.unwrap_or(now - chrono::Duration::days(1));

    if let Some(next) = schedule.after(&check_from).next() {
        next <= now
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn five_field_gets_seconds_prepended() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
        assert_eq!(normalize_cron("  0 10 * * 1  "), "0 0 10 * * 1");
    }

    #[test]
    fn six_and_seven_field_pass_through() {
        assert_eq!(normalize_cron("0 0 10 1/7 * ?"), "0 0 10 1/7 * ?");
        assert_eq!(normalize_cron("0 0 10 * * ? 2026"), "0 0 10 * * ? 2026");
    }

    #[test]
    fn parse_cron_accepts_weekly_default() {
        assert!(parse_cron("0 0 10 1/7 * ?").is_ok());
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn due_when_tick_falls_between_last_and_now() {
        let schedule = parse_cron("0 * * * *").unwrap(); // hourly
        let now = ts("2026-01-10T12:30:00Z");
        assert!(is_cron_due(&schedule, now, Some(ts("2026-01-10T11:30:00Z"))));
        assert!(!is_cron_due(&schedule, now, Some(ts("2026-01-10T12:10:00Z"))));
        // No last tick: anything scheduled in the past day counts.
        assert!(is_cron_due(&schedule, now, None));
    }
}
