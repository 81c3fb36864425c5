//! Timestamp parsing and formatting shared by the backup codec and the
//! decision file.
//!
//! The mobile app has emitted two shapes over time:
//!
//! - RFC 3339 with a `Z` or numeric offset (`2022-07-19T01:02:03.000Z`)
//! - naive date-times (`2022-07-19 01:02:03`, `2022-07-19T01:02:03.5`),
//!   which are read as UTC
//!
//! Everything is normalized to [`Timestamp`] (`DateTime<Utc>`) on the way
//! in and written back as RFC 3339 UTC with millisecond precision.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::fmt;

/// Instant used for every date in the model.
pub type Timestamp = DateTime<Utc>;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A timestamp string that matches none of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampError {
    pub raw: String,
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid timestamp '{}'", self.raw)
    }
}

impl std::error::Error for TimestampError {}

/// Parse a timestamp in any of the accepted shapes.
///
/// # Errors
///
/// Returns [`TimestampError`] when `raw` is neither RFC 3339 nor a naive
/// `YYYY-MM-DD[ T]HH:MM:SS[.f]` date-time.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, TimestampError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // pandas writes `2023-05-01 10:00:00.123456+00:00`
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimestampError {
        raw: raw.to_string(),
    })
}

/// Format a timestamp as RFC 3339 UTC (`2022-07-19T01:02:03.000Z`).
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `#[serde(with = "...")]` adapter for required timestamps.
pub mod serde_ts {
    use super::{Timestamp, format_timestamp, parse_timestamp};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(D::Error::custom)
    }
}

/// `#[serde(with = "...")]` adapter for optional timestamps.
pub mod serde_ts_option {
    use super::{Timestamp, format_timestamp, parse_timestamp};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        ts: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_some(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|raw| parse_timestamp(&raw).map_err(D::Error::custom))
            .transpose()
    }
}
