//! Timestamp value object for temporal data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC timestamp for orders and outbox records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from a DateTime<Utc>.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse from an RFC 3339 string.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(Self(dt.with_timezone(&Utc)))
    }

    /// Format as RFC 3339 with nanosecond precision.
    ///
    /// Lossless, and fixed-width so that lexicographic order matches
    /// chronological order.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
    }

    /// Calculate duration since another timestamp.
    #[must_use]
    pub fn duration_since(&self, other: Self) -> chrono::Duration {
        self.0 - other.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rfc3339_round_trip_keeps_nanoseconds() {
        let ts = Timestamp::new(Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap());
        let text = ts.to_rfc3339();
        assert_eq!(text, "2023-11-14T22:13:20.123456789Z");
        assert_eq!(Timestamp::parse(&text).unwrap(), ts);
    }

    #[test]
    fn rfc3339_is_fixed_width() {
        let whole = Timestamp::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let fraction = Timestamp::new(Utc.timestamp_opt(1_700_000_000, 1).unwrap());
        assert_eq!(whole.to_rfc3339().len(), fraction.to_rfc3339().len());
    }

    #[test]
    fn rfc3339_sorts_chronologically() {
        let earlier = Timestamp::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let later = Timestamp::new(Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap());
        assert!(earlier.to_rfc3339() < later.to_rfc3339());
    }

    #[test]
    fn duration_since() {
        let a = Timestamp::new(Utc.timestamp_opt(100, 0).unwrap());
        let b = Timestamp::new(Utc.timestamp_opt(160, 0).unwrap());
        assert_eq!(b.duration_since(a).num_seconds(), 60);
    }
}
