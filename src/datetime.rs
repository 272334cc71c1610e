//! Date/time utilities for newswire.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a UTC datetime for storage.
///
/// The output is fixed-width RFC 3339 with nanosecond precision and a `Z`
/// suffix (e.g. `2024-01-15T10:30:00.000000000Z`), so string order in SQL
/// matches chronological order and the value round-trips exactly.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored datetime string.
///
/// Accepts RFC 3339 and the SQLite `YYYY-MM-DD HH:MM:SS` format.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Parse an RFC 3339 timestamp from a remote API response.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_to_db_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(to_db_timestamp(&dt), "2024-01-15T10:30:00.000000000Z");
    }

    #[test]
    fn test_to_db_timestamp_orders_lexically() {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let later = base + Duration::milliseconds(1500);
        let much_later = base + Duration::days(400);

        let a = to_db_timestamp(&base);
        let b = to_db_timestamp(&later);
        let c = to_db_timestamp(&much_later);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_to_db_timestamp_keeps_sub_millisecond_order() {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let older = to_db_timestamp(&(base + Duration::microseconds(100)));
        let newer = to_db_timestamp(&(base + Duration::microseconds(900)));
        assert!(older < newer);
        assert_eq!(older.len(), newer.len());
    }

    #[test]
    fn test_parse_datetime_roundtrip_exact() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()
            + Duration::nanoseconds(123_456_789);
        assert_eq!(parse_datetime(&to_db_timestamp(&dt)), Some(dt));
    }

    #[test]
    fn test_parse_datetime_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_datetime(&to_db_timestamp(&dt)), Some(dt));
    }

    #[test]
    fn test_parse_datetime_sqlite_format() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-01-15 10:30:00"), Some(expected));
    }

    #[test]
    fn test_parse_datetime_with_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-01-15T10:30:00+09:00"), Some(expected));
    }

    #[test]
    fn test_parse_datetime_invalid() {
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_rfc3339("2024-01-15 10:30:00"), None);
    }
}
