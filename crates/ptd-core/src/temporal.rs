//! # Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds precision
//! that always renders as RFC 3339 with a `Z` suffix.
//!
//! ## Security Invariant
//!
//! Every timestamp that ends up inside a signed document (creation and
//! update times, signing time, manifest creation, file modification) goes
//! through this type. Local offsets or sub-second digits would give two
//! byte sequences for one instant and break signature verification after a
//! round trip through another system.
//!
//! Serialization always emits `YYYY-MM-DDTHH:MM:SSZ`. Deserialization is
//! lenient (any RFC 3339 offset, any sub-second precision) and normalizes to
//! the same form, so documents written by other producers re-canonicalize to
//! stable bytes.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PtdError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an RFC 3339 string, rejecting non-UTC offsets.
/// - [`Timestamp::parse_lenient()`]: from an RFC 3339 string with any offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// **Rejects non-UTC inputs.** Only the `Z` suffix is accepted; even
    /// `+00:00` is rejected.
    ///
    /// # Errors
    ///
    /// Returns `PtdError::Serialization` if the string is not valid RFC 3339
    /// or uses a non-Z offset.
    pub fn parse(s: &str) -> Result<Self, PtdError> {
        if !s.ends_with('Z') {
            return Err(PtdError::Serialization(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset and
    /// converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, PtdError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            PtdError::Serialization(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, PtdError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| PtdError::Serialization(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as RFC 3339 with Z suffix (e.g., `2025-07-01T09:00:00Z`).
    pub fn to_rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_lenient(&s).map_err(serde::de::Error::custom)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2025, 7, 1, 9, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.to_rfc3339(), "2025-07-01T09:30:45Z");
    }

    #[test]
    fn test_parse_z_suffix_accepted() {
        let ts = Timestamp::parse("2025-07-01T09:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-07-01T09:00:00Z");
    }

    #[test]
    fn test_parse_offsets_rejected() {
        assert!(Timestamp::parse("2025-07-01T09:00:00+00:00").is_err());
        assert!(Timestamp::parse("2025-07-01T14:00:00+05:00").is_err());
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("2025-07-01").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_parse_lenient_converts_offset() {
        let ts = Timestamp::parse_lenient("2025-07-01T14:00:00+05:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-07-01T09:00:00Z");
    }

    #[test]
    fn test_epoch_roundtrip() {
        let ts = Timestamp::parse("2025-07-01T09:00:00Z").unwrap();
        assert_eq!(Timestamp::from_epoch_secs(ts.epoch_secs()).unwrap(), ts);
    }

    #[test]
    fn test_serializes_as_z_string() {
        let ts = Timestamp::parse("2025-07-01T09:00:00Z").unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), r#""2025-07-01T09:00:00Z""#);
    }

    #[test]
    fn test_deserialize_normalizes_foreign_form() {
        let ts: Timestamp =
            serde_json::from_str(r#""2025-07-01T11:00:00.987654+02:00""#).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-07-01T09:00:00Z");
    }

    #[test]
    fn test_ordering() {
        let earlier = Timestamp::parse("2025-07-01T09:00:00Z").unwrap();
        let later = Timestamp::parse("2025-07-01T09:00:01Z").unwrap();
        assert!(earlier < later);
    }
}
