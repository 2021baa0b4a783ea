//! Human-readable countdowns for the "next run" column.

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Render `remaining` as e.g. "in 2 days 3 hours" or "in 1 hour 5 minutes".
///
/// Zero components are dropped and minutes are left out once days are
/// shown. Anything that rounds down to nothing reads "very soon".
pub fn format_countdown(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "very soon".to_string();
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(unit(days, "day"));
    }
    if hours > 0 {
        parts.push(unit(hours, "hour"));
    }
    if minutes > 0 && days == 0 {
        parts.push(unit(minutes, "minute"));
    }

    if parts.is_empty() {
        "very soon".to_string()
    } else {
        format!("in {}", parts.join(" "))
    }
}

/// Countdown from `now` until `at`.
pub fn countdown_until(at: DateTime<FixedOffset>, now: DateTime<Utc>) -> String {
    format_countdown(at.with_timezone(&Utc) - now)
}

fn unit(n: i64, name: &str) -> String {
    if n == 1 {
        format!("1 {name}")
    } else {
        format!("{n} {name}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_hours_drop_minutes() {
        let d = Duration::days(2) + Duration::hours(3) + Duration::minutes(15);
        assert_eq!(format_countdown(d), "in 2 days 3 hours");
    }

    #[test]
    fn test_singular_units() {
        let d = Duration::days(1) + Duration::hours(1);
        assert_eq!(format_countdown(d), "in 1 day 1 hour");
        assert_eq!(format_countdown(Duration::minutes(1)), "in 1 minute");
    }

    #[test]
    fn test_hours_and_minutes() {
        let d = Duration::hours(5) + Duration::minutes(42) + Duration::seconds(30);
        assert_eq!(format_countdown(d), "in 5 hours 42 minutes");
    }

    #[test]
    fn test_zero_components_omitted() {
        assert_eq!(format_countdown(Duration::days(3)), "in 3 days");
        assert_eq!(format_countdown(Duration::days(1) + Duration::minutes(30)), "in 1 day");
        assert_eq!(format_countdown(Duration::hours(2)), "in 2 hours");
    }

    #[test]
    fn test_very_soon() {
        assert_eq!(format_countdown(Duration::zero()), "very soon");
        assert_eq!(format_countdown(Duration::minutes(-5)), "very soon");
        assert_eq!(format_countdown(Duration::seconds(45)), "very soon");
    }

    #[test]
    fn test_countdown_until_mixed_zones() {
        use chrono::TimeZone;
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let ist = FixedOffset::east_opt(19_800).unwrap();
        let at = ist.with_ymd_and_hms(2025, 1, 1, 7, 30, 0).unwrap();
        assert_eq!(countdown_until(at, now), "in 2 hours");
    }
}
