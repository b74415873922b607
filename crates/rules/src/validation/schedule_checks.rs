//! Schedule validation: cron expressions and timezones.

use crate::alert::AlertSchedule;
use crate::schedule::parse_cron;

use super::ValidationResult;

pub(super) fn validate_schedule(schedule: &AlertSchedule, result: &mut ValidationResult) {
    let fields = schedule.cron.split_whitespace().count();
    if !(5..=7).contains(&fields) {
        result.error(
            "schedule.cron",
            format!(
                "cron must have 5, 6, or 7 fields, got {} in '{}'",
                fields, schedule.cron
            ),
        );
        return;
    }
    if let Err(e) = parse_cron(&schedule.cron) {
        result.error(
            "schedule.cron",
            format!("invalid cron expression '{}': {}", schedule.cron, e),
        );
    }

    validate_timezone(&schedule.timezone, result);
}

fn validate_timezone(tz: &str, result: &mut ValidationResult) {
    // Accept "UTC" and IANA-style "Area/Location" (e.g. "Europe/Berlin").
    if tz == "UTC" || tz == "GMT" {
        return;
    }
    if !is_iana_timezone(tz) {
        result.error(
            "schedule.timezone",
            format!(
                "invalid timezone '{}', expected IANA format (e.g. 'Europe/Berlin')",
                tz
            ),
        );
    }
}

/// Shape check only: `Area/Location` with alphanumerics, `_`, `+`, `-`.
fn is_iana_timezone(tz: &str) -> bool {
    let parts: Vec<&str> = tz.split('/').collect();
    if !(2..=3).contains(&parts.len()) {
        return false;
    }
    parts.iter().all(|p| {
        !p.is_empty()
            && p.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationResult;

    fn check(cron: &str, timezone: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        let schedule = AlertSchedule {
            cron: cron.to_string(),
            timezone: timezone.to_string(),
        };
        validate_schedule(&schedule, &mut result);
        result
    }

    #[test]
    fn default_weekly_cron_is_valid() {
        assert!(check("0 0 10 1/7 * ?", "UTC").valid);
    }

    #[test]
    fn five_field_cron_is_valid() {
        assert!(check("*/15 * * * *", "UTC").valid);
    }

    #[test]
    fn wrong_field_count_is_an_error() {
        let result = check("* * *", "UTC");
        assert!(!result.valid);
        assert!(result.describe_errors().contains("5, 6, or 7 fields"));
    }

    #[test]
    fn out_of_range_field_is_an_error() {
        assert!(!check("0 0 25 * * ?", "UTC").valid);
    }

    #[test]
    fn iana_timezone_shape() {
        assert!(check("0 0 10 1/7 * ?", "Europe/Berlin").valid);
        assert!(check("0 0 10 1/7 * ?", "America/Argentina/Ushuaia").valid);
        assert!(!check("0 0 10 1/7 * ?", "berlin time").valid);
    }
}
