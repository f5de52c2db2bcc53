//! Shared utilities

use chrono::{DateTime, Local, Utc};

/// Describe `at` relative to `now` in local calendar days.
///
/// "Today", "Yesterday", "N days ago" within a week, the date after that.
pub fn relative_date(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let day = at.with_timezone(&Local).date_naive();
    let today = now.with_timezone(&Local).date_naive();
    match (today - day).num_days() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        n @ 2..=6 => format!("{} days ago", n),
        _ => day.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_relative_date() {
        let now = noon(2025, 3, 15);
        assert_eq!(relative_date(now - Duration::hours(2), now), "Today");
        assert_eq!(relative_date(noon(2025, 3, 14), now), "Yesterday");
        assert_eq!(relative_date(noon(2025, 3, 12), now), "3 days ago");
        assert_eq!(relative_date(noon(2025, 3, 9), now), "6 days ago");
        assert_eq!(relative_date(noon(2025, 3, 8), now), "2025-03-08");
    }

    #[test]
    fn test_future_timestamp_shows_date() {
        let now = noon(2025, 3, 15);
        assert_eq!(relative_date(noon(2025, 3, 20), now), "2025-03-20");
    }
}
