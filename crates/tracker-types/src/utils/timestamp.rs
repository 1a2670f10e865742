//! Timestamp parsing for order records and live events.
//!
//! Accepted inputs:
//! - RFC 3339 (`2024-05-01T10:00:00Z`, `2024-05-01T10:00:00+02:00`)
//! - naive ISO-8601 without offset (`2024-05-01T10:00:00.123456`), taken as UTC
//! - integer unix seconds

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Formats accepted for timestamps that carry no offset.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a timestamp string in any of the accepted shapes.
///
/// Returns `None` when the input matches none of them.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
	let input = input.trim();
	if input.is_empty() {
		return None;
	}

	if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
		return Some(parsed.with_timezone(&Utc));
	}

	for format in NAIVE_FORMATS {
		if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
			return Some(naive.and_utc());
		}
	}

	input
		.parse::<i64>()
		.ok()
		.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Raw timestamp representation as it appears in JSON.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawTimestamp {
	Text(String),
	Seconds(i64),
}

impl RawTimestamp {
	pub(crate) fn resolve(&self) -> Option<DateTime<Utc>> {
		match self {
			RawTimestamp::Text(text) => parse_timestamp(text),
			RawTimestamp::Seconds(secs) => DateTime::from_timestamp(*secs, 0),
		}
	}
}

/// Deserializes an optional timestamp field.
///
/// `null` and a missing field map to `None`; any present value that is
/// not a recognized timestamp is an error.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
	D: Deserializer<'de>,
{
	use serde::de::Error;

	match Option::<RawTimestamp>::deserialize(deserializer)? {
		None => Ok(None),
		Some(raw) => raw
			.resolve()
			.map(Some)
			.ok_or_else(|| Error::custom("unrecognized timestamp format")),
	}
}
