use chrono::{Local, NaiveDate, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

// Exactly eight digits, fenced by non-digits or the string edges. A longer
// digit run must not contribute its first eight digits as a false date.
static TITLE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{8})(?:[^0-9]|$)").expect("valid title date regex")
});

/// Pull a creation timestamp out of a note title.
///
/// The first run of exactly eight consecutive digits is read as `YYYYMMDD`.
/// Returns the corresponding local-midnight instant in epoch milliseconds,
/// or `None` when there is no such run or it is not a real calendar date.
pub fn extract_created_millis(title: &str) -> Option<i64> {
    let digits = TITLE_DATE_RE.captures(title)?.get(1)?.as_str();
    let year: i32 = digits[..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;

    let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    // A DST transition can make local midnight ambiguous or nonexistent;
    // take the earlier reading and treat a nonexistent one as "no date".
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|moment| moment.timestamp_millis())
}

/// Render an epoch-millisecond timestamp as local `YYYY-MM-DD HH:MM:SS` for
/// console output.
pub fn format_local_datetime(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(moment) => moment.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("@{millis}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_midnight_millis(year: i32, month: u32, day: u32) -> i64 {
        Local
            .with_ymd_and_hms(year, month, day, 0, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn extracts_first_eight_digit_run_as_local_midnight() {
        assert_eq!(
            extract_created_millis("Trip Report 20230415 Draft"),
            Some(local_midnight_millis(2023, 4, 15))
        );
    }

    #[test]
    fn digits_can_touch_surrounding_words() {
        assert_eq!(
            extract_created_millis("Trip20230415Draft"),
            Some(local_midnight_millis(2023, 4, 15))
        );
        assert_eq!(
            extract_created_millis("20230415"),
            Some(local_midnight_millis(2023, 4, 15))
        );
    }

    #[test]
    fn titles_without_digits_have_no_date() {
        assert_eq!(extract_created_millis("No numbers here"), None);
        assert_eq!(extract_created_millis(""), None);
    }

    #[test]
    fn invalid_calendar_dates_are_rejected() {
        // Month 99 / day 99.
        assert_eq!(extract_created_millis("Notes 99999999"), None);
        // Month 13.
        assert_eq!(extract_created_millis("Agenda 20231301"), None);
        // February 30th.
        assert_eq!(extract_created_millis("Meeting 20230230"), None);
        // February 29th only exists in leap years.
        assert_eq!(extract_created_millis("Ski day 20230229"), None);
        assert_eq!(
            extract_created_millis("Ski day 20240229"),
            Some(local_midnight_millis(2024, 2, 29))
        );
    }

    #[test]
    fn longer_digit_runs_do_not_count() {
        assert_eq!(extract_created_millis("Serial 202304157"), None);
        assert_eq!(extract_created_millis("123456789123456789"), None);
        // A nine-digit run is skipped, a later exact run still matches.
        assert_eq!(
            extract_created_millis("Build 123456789 shipped 20230415"),
            Some(local_midnight_millis(2023, 4, 15))
        );
    }

    #[test]
    fn first_run_decides_even_when_invalid() {
        // The first exact run is the only candidate; a valid later run does
        // not rescue an invalid first one.
        assert_eq!(extract_created_millis("20231399 but also 20230415"), None);
    }

    #[test]
    fn formats_back_to_local_datetime() {
        let millis = local_midnight_millis(2023, 4, 15);
        assert_eq!(format_local_datetime(millis), "2023-04-15 00:00:00");
    }
}
