//! Timestamp parsing for the forms users pass on the command line and in CSV sources.

use crate::error::DomainError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"];

/// Parses RFC 3339, naive ISO 8601 (`T` or space separated, read as UTC), a plain date
/// (midnight UTC), or integer Unix seconds.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, DomainError> {
    let s = input.trim();
    let invalid = |context: &'static str| DomainError::InvalidTimestamp {
        input: input.to_owned(),
        context: Some(context.into()),
    };

    if s.is_empty() {
        return Err(invalid("empty input"));
    }

    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(|| invalid("out of range"));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, format) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    Err(invalid("expected RFC 3339, YYYY-MM-DD[THH:MM:SS] or Unix seconds"))
}

/// RFC 3339 rendering with second precision, e.g. `2021-04-12T10:00:00+00:00`.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn accepts_every_documented_form() {
        let expected = utc(2021, 4, 12, 10, 59, 42);
        for input in [
            "2021-04-12T10:59:42Z",
            "2021-04-12T12:59:42+02:00",
            "2021-04-12T10:59:42",
            "2021-04-12 10:59:42",
            "2021-04-12 10:59:42+00:00",
            "1618225182",
        ] {
            assert_eq!(parse_timestamp(input).unwrap(), expected, "{input}");
        }
        assert_eq!(parse_timestamp("2021-04-12").unwrap(), utc(2021, 4, 12, 0, 0, 0));
        assert_eq!(
            parse_timestamp("2021-04-12T10:59:42.250").unwrap().timestamp_subsec_millis(),
            250
        );
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "yesterday", "2021-13-01", "12:00"] {
            assert!(matches!(
                parse_timestamp(input),
                Err(DomainError::InvalidTimestamp { .. })
            ), "{input}");
        }
    }

    #[test]
    fn formats_as_rfc3339() {
        assert_eq!(format_timestamp(&utc(2021, 4, 12, 10, 0, 0)), "2021-04-12T10:00:00+00:00");
    }
}
