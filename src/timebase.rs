//! Start-time and tag token parsing
//!
//! Device exports encode instants either as epoch seconds or as wall-clock
//! strings. Tokens are tried as numbers first so an epoch value is never read
//! as a date. Wall-clock values are naive; any offset is dropped and the
//! remaining clock time is taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::TimestampParseError;

/// Exact layout written by the device firmware
const DEVICE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layouts accepted by the permissive fallback
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%b %d %Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%b %d %Y"];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Parse a timestamp token into epoch seconds.
///
/// Strategies, in order:
/// 1. floating-point epoch seconds
/// 2. `YYYY-MM-DD HH:MM:SS`
/// 3. a permissive set of date/time layouts, offsets discarded
pub fn parse_timestamp(token: &str) -> Result<f64, TimestampParseError> {
    let token = token.trim();

    if let Ok(epoch) = token.parse::<f64>() {
        return Ok(epoch);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(token, DEVICE_FORMAT) {
        return Ok(naive_to_epoch(&naive));
    }

    parse_permissive(token)
        .map(|naive| naive_to_epoch(&naive))
        .ok_or_else(|| TimestampParseError {
            token: token.to_string(),
        })
}

/// First comma-separated field of a header line.
///
/// ACC headers repeat the value once per axis, e.g. `t0, t0, t0`.
pub fn first_token(line: &str) -> &str {
    line.split(',').next().unwrap_or("").trim()
}

fn parse_permissive(token: &str) -> Option<NaiveDateTime> {
    if token.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(token) {
        return Some(dt.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(token, format) {
            return Some(dt.naive_local());
        }
    }

    // A trailing `Z` carries no information once offsets are dropped
    let stripped = token.strip_suffix('Z').unwrap_or(token);
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, format) {
            return Some(naive);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(stripped, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

fn naive_to_epoch(naive: &NaiveDateTime) -> f64 {
    let utc = naive.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_token() {
        assert_eq!(parse_timestamp("1370000000").unwrap(), 1_370_000_000.0);
        assert_eq!(parse_timestamp(" 1370000000.5 ").unwrap(), 1_370_000_000.5);
    }

    #[test]
    fn test_device_format() {
        // 2013-06-12T16:18:58Z
        assert_eq!(parse_timestamp("2013-06-12 16:18:58").unwrap(), 1_371_053_938.0);
    }

    #[test]
    fn test_numeric_and_datetime_tokens_agree() {
        let numeric = parse_timestamp("1370044800").unwrap();
        let dated = parse_timestamp("2013-06-01 00:00:00").unwrap();
        assert_eq!(numeric, dated);
    }

    #[test]
    fn test_offset_is_discarded() {
        let with_offset = parse_timestamp("2013-06-01T00:00:00+02:00").unwrap();
        let zulu = parse_timestamp("2013-06-01T00:00:00Z").unwrap();
        assert_eq!(with_offset, 1_370_044_800.0);
        assert_eq!(zulu, 1_370_044_800.0);
    }

    #[test]
    fn test_permissive_layouts() {
        assert_eq!(parse_timestamp("2013-06-01").unwrap(), 1_370_044_800.0);
        assert_eq!(parse_timestamp("2013/06/01 00:00:00").unwrap(), 1_370_044_800.0);
        assert_eq!(
            parse_timestamp("2013-06-01T00:00:00.250").unwrap(),
            1_370_044_800.25
        );
    }

    #[test]
    fn test_unparseable_token() {
        let err = parse_timestamp("not a time").unwrap_err();
        assert_eq!(err.token, "not a time");
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_first_token() {
        assert_eq!(first_token("1370000000.0, 1370000000.0, 1370000000.0"), "1370000000.0");
        assert_eq!(first_token("32.000000"), "32.000000");
        assert_eq!(first_token(""), "");
    }
}
