//! Ready-made transforms and validators.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, ParseResult};

/// Parse an ISO-8601 calendar date (`1988-11-20`).
pub fn iso_date(raw: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}

/// Parse an ISO-8601 local date-time (`1988-11-20T10:15:30`, optional
/// fractional seconds).
pub fn iso_datetime(raw: &str) -> ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f")
}

/// Parse an RFC 3339 timestamp with offset (`1988-11-20T10:15:30+01:00`).
pub fn rfc3339(raw: &str) -> ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim())
}

/// True when `value` is greater than its type's default (zero for numbers).
pub fn positive<N>(value: &N) -> bool
where
    N: PartialOrd + Default,
{
    *value > N::default()
}

/// True when the string has at least one non-whitespace character.
pub fn non_empty<S>(value: &S) -> bool
where
    S: AsRef<str> + ?Sized,
{
    !value.as_ref().trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Timelike};

    #[test]
    fn parses_dates() {
        assert_eq!(iso_date("1988-11-20").unwrap(), NaiveDate::from_ymd_opt(1988, 11, 20).unwrap());
        assert!(iso_date("20/11/1988").is_err());

        let dt = iso_datetime("1988-11-20T10:15:30.250").unwrap();
        assert_eq!(dt.time(), NaiveTime::from_hms_milli_opt(10, 15, 30, 250).unwrap());

        let ts = rfc3339("1988-11-20T10:15:30+01:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn predicates() {
        assert!(positive(&18));
        assert!(!positive(&0));
        assert!(!positive(&-3.5));
        assert!(non_empty(&"Jan".to_string()));
        assert!(!non_empty("  "));
    }
}
