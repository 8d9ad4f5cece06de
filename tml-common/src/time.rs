//! Timestamp utilities
//!
//! Timeline rows store `dateline` as unix seconds.

use chrono::{DateTime, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as unix seconds
pub fn now_unix() -> i64 {
    now().timestamp()
}

/// Seconds elapsed from `then` to `now`; zero if `then` lies in the future
pub fn elapsed_secs(then: i64, now: i64) -> u64 {
    now.saturating_sub(then).max(0) as u64
}

/// Render a dateline for logs and inspection output
pub fn format_dateline(dateline: i64) -> String {
    match Utc.timestamp_opt(dateline, 0).single() {
        Some(dt) => dt.to_rfc3339(),
        None => format!("@{}", dateline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_unix_is_recent() {
        let t = now_unix();
        assert!(t > 946_684_800); // 2000-01-01
        assert!(t < 4_102_444_800); // 2100-01-01
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_elapsed_secs() {
        assert_eq!(elapsed_secs(100, 1_000), 900);
        assert_eq!(elapsed_secs(1_000, 1_000), 0);
        assert_eq!(elapsed_secs(2_000, 1_000), 0);
        assert_eq!(elapsed_secs(i64::MIN, 0), i64::MAX as u64);
    }

    #[test]
    fn test_format_dateline() {
        assert_eq!(format_dateline(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_dateline(i64::MAX), format!("@{}", i64::MAX));
    }
}
