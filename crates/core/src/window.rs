use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A half-open evaluation interval `[start, end)`.
///
/// Every detection run evaluates exactly one window, computed once up front
/// so that all rules in the run agree on its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EvalWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `hours` length ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, hours: u32) -> Self {
        Self {
            start: end - Duration::hours(i64::from(hours)),
            end,
        }
    }

    /// The `days`-long historical interval immediately before this window.
    ///
    /// The current window is never part of its own baseline, so the lookback
    /// ends exactly where this window starts.
    pub fn lookback(&self, days: u32) -> Self {
        Self {
            start: self.start - Duration::days(i64::from(days)),
            end: self.start,
        }
    }

    /// Half-open containment: `start <= t < end`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }

    pub fn duration_days(&self) -> f64 {
        self.duration_hours() / 24.0
    }
}

impl std::fmt::Display for EvalWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn window_is_half_open() {
        let w = EvalWindow::ending_at(ts("2026-01-10T12:00:00Z"), 24);
        assert_eq!(w.start, ts("2026-01-09T12:00:00Z"));
        assert!(w.contains(w.start));
        assert!(!w.contains(w.end));
        assert!(w.contains(ts("2026-01-10T11:59:59Z")));
    }

    #[test]
    fn lookback_ends_at_window_start() {
        let w = EvalWindow::ending_at(ts("2026-01-10T12:00:00Z"), 24);
        let lb = w.lookback(30);
        assert_eq!(lb.end, w.start);
        assert_eq!(lb.start, Utc.with_ymd_and_hms(2025, 12, 10, 12, 0, 0).unwrap());
        assert!(!lb.contains(w.start));
    }

    #[test]
    fn duration_accessors() {
        let w = EvalWindow::ending_at(ts("2026-01-10T12:00:00Z"), 36);
        assert_eq!(w.duration_hours(), 36.0);
        assert_eq!(w.duration_days(), 1.5);
    }
}
