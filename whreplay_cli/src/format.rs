//! Time and text formatting shared by the dashboard and plain output

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::fmt::Display;

/// Relative arrival time: exact seconds under a minute, humanised after
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        return format!("{} seconds ago", secs);
    }

    let minutes = (secs as f64 / 60.0).round() as i64;
    let hours = (secs as f64 / 3600.0).round() as i64;
    let days = (secs as f64 / 86_400.0).round() as i64;
    let months = (days as f64 / 30.4).round() as i64;
    let years = (days as f64 / 365.0).round() as i64;

    if secs < 90 {
        "a minute ago".to_string()
    } else if minutes < 45 {
        format!("{} minutes ago", minutes)
    } else if minutes < 90 {
        "an hour ago".to_string()
    } else if hours < 22 {
        format!("{} hours ago", hours)
    } else if hours < 36 {
        "a day ago".to_string()
    } else if days < 26 {
        format!("{} days ago", days)
    } else if days < 45 {
        "a month ago".to_string()
    } else if days < 320 {
        format!("{} months ago", months.max(2))
    } else if days < 548 {
        "a year ago".to_string()
    } else {
        format!("{} years ago", years.max(2))
    }
}

/// `May 1st 3:04pm`
pub fn full_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!(
        "{} {}{} {}",
        time.format("%b"),
        time.day(),
        ordinal_suffix(time.day()),
        time.format("%-I:%M%P")
    )
}

/// `May 1st 3:04.512pm`
pub fn full_time_millis<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!(
        "{} {}{} {}",
        time.format("%b"),
        time.day(),
        ordinal_suffix(time.day()),
        time.format("%-I:%M.%3f%P")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Format duration in ms (short version for tables)
pub fn format_duration_short(ms: i64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

/// Truncate any string to max length, on a char boundary
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len > max_len && max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else if len > max_len {
        s.chars().take(max_len).collect()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_relative_time() {
        let now = at(12, 0, 0);
        assert_eq!(relative_time(now, now), "0 seconds ago");
        assert_eq!(relative_time(now - Duration::seconds(42), now), "42 seconds ago");
        assert_eq!(relative_time(now - Duration::seconds(75), now), "a minute ago");
        assert_eq!(relative_time(now - Duration::minutes(10), now), "10 minutes ago");
        assert_eq!(relative_time(now - Duration::minutes(50), now), "an hour ago");
        assert_eq!(relative_time(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(relative_time(now - Duration::hours(30), now), "a day ago");
        assert_eq!(relative_time(now - Duration::days(3), now), "3 days ago");
        assert_eq!(relative_time(now - Duration::days(400), now), "a year ago");
        assert_eq!(relative_time(now - Duration::days(3000), now), "8 years ago");
        // Clock skew never yields negative ages
        assert_eq!(relative_time(now + Duration::seconds(5), now), "0 seconds ago");
    }

    #[test]
    fn test_full_time() {
        assert_eq!(full_time(&at(15, 4, 0)), "May 1st 3:04pm");
        assert_eq!(
            full_time_millis(&(at(0, 30, 0) + Duration::milliseconds(512))),
            "May 1st 12:30.512am"
        );
    }

    #[test]
    fn test_ordinal_suffix() {
        let suffixes: Vec<_> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 31]
            .into_iter()
            .map(ordinal_suffix)
            .collect();
        assert_eq!(
            suffixes,
            ["st", "nd", "rd", "th", "th", "th", "th", "st", "nd", "rd", "st"]
        );
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("/create/abcdef/long/path", 12), "/create/a...");
        assert_eq!(truncate_str("héllo wörld", 8), "héllo...");
        assert_eq!(truncate_str("abcdef", 2), "ab");
    }
}
