use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use thiserror::Error;

pub const DATETIME_FORMAT_HINT: &str = "an ISO 8601 date/time such as 2024-01-31T08:30:00Z";
pub const DATE_FORMAT_HINT: &str = "a date in the form YYYY-MM-DD";
pub const DURATION_FORMAT_HINT: &str = "a duration in the form [-][d.]hh:mm:ss[.fffffff]";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration '{0}'")]
pub struct DurationParseError(pub String);

/// Parses round-trip date/time text. Values without an offset are taken as UTC,
/// a bare date as midnight UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc().fixed_offset())
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::default()).and_utc().fixed_offset())
        })
}

pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
}

/// Parses `hh:mm:ss`, optionally signed, prefixed by `d.` days and suffixed by
/// up to nine fractional second digits.
pub fn parse_duration(s: &str) -> Result<TimeDelta, DurationParseError> {
    let invalid = || DurationParseError(s.to_string());
    let text = s.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (days, clock) = match body.split_once('.') {
        Some((d, rest)) if !d.contains(':') => (parse_unsigned(d).ok_or_else(invalid)?, rest),
        _ => (0, body),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(invalid());
    };

    let (seconds, fraction) = match seconds.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (*seconds, None),
    };

    let hours = parse_unsigned(hours).ok_or_else(invalid)?;
    let minutes = parse_unsigned(minutes).ok_or_else(invalid)?;
    let seconds = parse_unsigned(seconds).ok_or_else(invalid)?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(invalid());
    }

    let nanos = match fraction {
        Some(frac) if frac.is_empty() || frac.len() > 9 => return Err(invalid()),
        Some(frac) => {
            let digits = parse_unsigned(frac).ok_or_else(invalid)?;
            digits * 10_i64.pow(9 - frac.len() as u32)
        }
        None => 0,
    };

    let total = days
        .checked_mul(86_400)
        .and_then(|d| d.checked_add(hours * 3_600 + minutes * 60 + seconds))
        .ok_or_else(invalid)?;

    let delta = TimeDelta::new(total, nanos as u32).ok_or_else(invalid)?;
    Ok(if negative { -delta } else { delta })
}

fn parse_unsigned(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_with_offset() {
        let dt = parse_datetime("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:00:00+02:00");
    }

    #[test]
    fn test_datetime_without_offset_is_utc() {
        let a = parse_datetime("2024-03-01T08:00:00").unwrap();
        let b = parse_datetime("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_date_only_is_midnight() {
        let dt = parse_datetime("2024-03-01").unwrap();
        assert_eq!(dt, parse_datetime("2024-03-01T00:00:00Z").unwrap());
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        assert!(parse_datetime("yesterday").is_err());
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn test_duration_basic() {
        assert_eq!(parse_duration("01:30:00").unwrap(), TimeDelta::minutes(90));
    }

    #[test]
    fn test_duration_days_fraction_and_sign() {
        let d = parse_duration("-1.02:00:00.5").unwrap();
        assert_eq!(d, -(TimeDelta::hours(26) + TimeDelta::milliseconds(500)));
    }

    #[test]
    fn test_duration_rejects_bad_input() {
        assert!(parse_duration("90").is_err());
        assert!(parse_duration("1:60:00").is_err());
        assert!(parse_duration("aa:bb:cc").is_err());
        assert!(parse_duration("00:00:01.").is_err());
    }
}
