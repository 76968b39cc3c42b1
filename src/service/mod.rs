//! Domain operations shared by the HTTP handlers. Everything here takes the
//! current time as an argument so tests can pin the clock.

pub mod attendance;
pub mod availability;
pub mod contacts;
pub mod meetings;
pub mod stats;
pub mod tracker;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::AppError;

/// Wall-clock time in the server's local zone. All day boundaries in the
/// service are local midnights.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parses a required calendar-day query value. Accepts `YYYY-MM-DD` or any
/// ISO timestamp starting with one.
pub fn parse_day(raw: Option<&str>, name: &str) -> Result<NaiveDate, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation(format!("{name} is required")))?;

    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| AppError::validation(format!("{name} must be a date (YYYY-MM-DD)")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_accepts_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 20).unwrap();
        assert_eq!(parse_day(Some("2025-04-20"), "date").unwrap(), expected);
        assert_eq!(
            parse_day(Some("2025-04-20T18:30:00.000Z"), "date").unwrap(),
            expected
        );
    }

    #[test]
    fn parse_day_reports_missing_and_malformed() {
        let missing = parse_day(None, "startDate").unwrap_err();
        assert_eq!(missing.to_string(), "startDate is required");

        let blank = parse_day(Some("  "), "date").unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));

        let garbage = parse_day(Some("yesterday"), "date").unwrap_err();
        assert!(matches!(garbage, AppError::Validation(_)));
    }
}
