//! Date parsing and formatting.
//!
//! Episode `DATE` fields and template dates are ISO-8601-ish strings written by
//! hand, so parsing is lenient about the shape but strict about validity:
//!
//! | Input | Interpretation |
//! |-------|----------------|
//! | `2021-03-05T10:00:00Z`, `2021-03-05T10:00:00+02:00` | RFC 3339, offset kept |
//! | `2021-03-05T10:00:00` | naive date-time, taken as UTC |
//! | `2021-03-05` | midnight UTC |
//! | `Fri, 05 Mar 2021 10:00:00 +0000` | RFC 2822 |
//!
//! Dates are never shifted into the local timezone; `format_date` prints the
//! calendar date exactly as written.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unrecognized date: {0:?}")]
pub struct DateError(pub String);

/// Parse a date string in any of the accepted shapes.
pub fn parse_date(input: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(|| DateError(input.to_string()))?;
        return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    Err(DateError(input.to_string()))
}

/// Format an ISO-8601 date as `YYYY-MM-DD`.
pub fn format_date(input: &str) -> Result<String, DateError> {
    Ok(parse_date(input)?.format("%Y-%m-%d").to_string())
}

/// RFC 2822 rendering used for RSS `pubDate` and `lastBuildDate`.
pub fn rfc2822(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc2822()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_date_rfc3339_utc() {
        assert_eq!(format_date("2021-03-05T10:00:00Z").unwrap(), "2021-03-05");
    }

    #[test]
    fn format_date_keeps_written_offset() {
        // 23:30 at -05:00 is already the 6th in UTC; the written date wins
        assert_eq!(
            format_date("2021-03-05T23:30:00-05:00").unwrap(),
            "2021-03-05"
        );
    }

    #[test]
    fn format_date_plain_date() {
        assert_eq!(format_date("2020-12-31").unwrap(), "2020-12-31");
    }

    #[test]
    fn format_date_naive_datetime() {
        assert_eq!(format_date("2019-01-02T03:04:05").unwrap(), "2019-01-02");
        assert_eq!(format_date("2019-01-02T03:04:05.250").unwrap(), "2019-01-02");
    }

    #[test]
    fn format_date_rejects_garbage() {
        assert_eq!(
            format_date("last tuesday"),
            Err(DateError("last tuesday".to_string()))
        );
        assert!(format_date("2021-02-30").is_err());
    }

    #[test]
    fn parse_rfc2822() {
        let dt = parse_date("Fri, 05 Mar 2021 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2021-03-05 10:00");
    }

    #[test]
    fn rfc2822_output() {
        let dt = parse_date("2021-03-05T10:00:00Z").unwrap();
        let out = rfc2822(&dt);
        assert!(out.starts_with("Fri, "));
        assert!(out.ends_with("Mar 2021 10:00:00 +0000"));
        assert_eq!(parse_date(&out).unwrap(), dt);
    }
}
