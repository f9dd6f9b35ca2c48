//! Fixed-format UTC timestamps
//!
//! The server writes instants as `YYYY-MM-DDTHH:MM:SS.ffffffZ`: exactly six
//! fractional digits, always UTC. Anything else is rejected.
//!
//! Use with `#[serde(with = "timestamp")]`, or `timestamp::option` for
//! optional fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

/// `strftime` pattern of the wire format
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Length of `2024-01-01T00:00:00.000000Z`
const WIRE_LEN: usize = 27;

/// Parse a wire timestamp
pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
    // chrono treats the fraction as optional and of any width when parsing
    let bytes = s.as_bytes();
    let fraction_ok = bytes.len() == WIRE_LEN
        && bytes[19] == b'.'
        && bytes[20..26].iter().all(u8::is_ascii_digit)
        && bytes[26] == b'Z';
    if !fraction_ok {
        return Err("expected YYYY-MM-DDTHH:MM:SS.ffffffZ".to_string());
    }

    NaiveDateTime::parse_from_str(s, FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| e.to_string())
}

/// Render an instant in the wire format, truncated to microseconds
pub fn format(dt: &DateTime<Utc>) -> String {
    dt.format(FORMAT).to_string()
}

pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(dt))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(|e| de::Error::custom(format_args!("invalid timestamp '{}': {}", s, e)))
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => super::serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse(&s)
                .map(Some)
                .map_err(|e| de::Error::custom(format_args!("invalid timestamp '{}': {}", s, e))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
        #[serde(default, with = "super::option")]
        seen: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_midnight_new_year() {
        let dt = parse("2024-01-01T00:00:00.000000Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_microseconds_preserved() {
        let dt = parse("2024-03-15T12:30:45.123456Z").unwrap();
        assert_eq!(dt.nanosecond(), 123_456_000);
        assert_eq!(format(&dt), "2024-03-15T12:30:45.123456Z");
    }

    #[test]
    fn test_rejects_other_formats() {
        for s in [
            "2024-01-01T00:00:00Z",
            "2024-01-01T00:00:00.000Z",
            "2024-01-01T00:00:00.000000000Z",
            "2024-01-01T00:00:00.000000+00:00",
            "2024-01-01 00:00:00.000000Z",
            "yesterday",
        ] {
            assert!(parse(s).is_err(), "accepted {}", s);
        }
    }

    #[test]
    fn test_serde_field() {
        let json = r#"{"at":"2024-01-01T00:00:00.000000Z","seen":null}"#;
        let stamped: Stamped = serde_json::from_str(json).unwrap();
        assert_eq!(stamped.at, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(stamped.seen.is_none());
        assert_eq!(serde_json::to_string(&stamped).unwrap(), json);
    }

    #[test]
    fn test_serde_field_rejects_bad_format() {
        let result = serde_json::from_str::<Stamped>(r#"{"at":"2024-01-01T00:00:00Z"}"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }
}
