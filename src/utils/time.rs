use chrono::{DateTime, Utc};
use std::time::Duration;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert a Unix timestamp in seconds to `DateTime<Utc>`
pub fn from_unix_timestamp(timestamp: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
}

/// Active span between the first and last timestamp in days, never below one day
pub fn active_span_days(first: DateTime<Utc>, last: DateTime<Utc>) -> f64 {
    let seconds = (last - first).num_seconds().max(0) as f64;
    (seconds / SECONDS_PER_DAY).max(1.0)
}

/// Estimated remaining time given the elapsed time for `done` of `total` items
pub fn estimate_remaining(elapsed: Duration, done: usize, total: usize) -> Duration {
    if done == 0 || done >= total {
        return Duration::ZERO;
    }
    let per_item = elapsed.as_secs_f64() / done as f64;
    Duration::from_secs_f64(per_item * (total - done) as f64)
}

/// Minutes with one decimal, e.g. `3.5m`
pub fn format_minutes(duration: Duration) -> String {
    format!("{:.1}m", duration.as_secs_f64() / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unix_timestamp() {
        let ts = from_unix_timestamp(1_600_000_000).unwrap();
        assert_eq!(ts.to_rfc3339(), "2020-09-13T12:26:40+00:00");
    }

    #[test]
    fn test_active_span_days() {
        let start = from_unix_timestamp(0).unwrap();
        assert_eq!(active_span_days(start, start), 1.0);
        let later = from_unix_timestamp(3 * 86_400).unwrap();
        assert_eq!(active_span_days(start, later), 3.0);
    }

    #[test]
    fn test_estimate_remaining() {
        let remaining = estimate_remaining(Duration::from_secs(10), 2, 6);
        assert_eq!(remaining, Duration::from_secs(20));
        assert_eq!(estimate_remaining(Duration::from_secs(10), 0, 6), Duration::ZERO);
        assert_eq!(format_minutes(Duration::from_secs(90)), "1.5m");
    }
}
