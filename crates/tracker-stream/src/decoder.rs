//! Decoding of live update frames.
//!
//! A frame is one JSON object. `order_id`, `current_status` and `timestamp`
//! are required; any other order fields present are carried along as the
//! event's seed. Decoding is stateless, so a rejected frame never affects
//! the frames around it.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracker_types::{deserialize_id, parse_timestamp, OrderEvent, OrderSeed};

/// Reasons a frame is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
	/// The frame is not a JSON object.
	#[error("Malformed frame: {0}")]
	Malformed(String),
	/// A required field is absent, null, or empty.
	#[error("Missing required field: {0}")]
	MissingField(&'static str),
	/// The timestamp is present but not in a recognized format.
	#[error("Invalid timestamp: {0}")]
	InvalidTimestamp(String),
}

/// Decodes one raw frame into an order event.
pub fn decode(raw: &str) -> Result<OrderEvent, DecodeError> {
	let value: Value =
		serde_json::from_str(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;
	let Value::Object(object) = value else {
		return Err(DecodeError::Malformed("frame is not a JSON object".into()));
	};

	let order_id = required_id(&object)?;
	let current_status = required_text(&object, "current_status")?;
	let timestamp = required_timestamp(&object)?;

	// Seed fields are best effort; a bad one does not cost the status change
	let seed = serde_json::from_value::<OrderSeed>(Value::Object(object)).unwrap_or_else(|e| {
		tracing::debug!(order_id = %order_id, "Ignoring unreadable seed fields: {}", e);
		OrderSeed::default()
	});

	Ok(OrderEvent::new(order_id, current_status, timestamp).with_seed(seed))
}

/// Reads the order identifier the same way snapshot records do.
fn required_id(object: &Map<String, Value>) -> Result<String, DecodeError> {
	let value = match object.get("order_id") {
		Some(Value::Null) | None => return Err(DecodeError::MissingField("order_id")),
		Some(value) => value,
	};

	let id = deserialize_id(value).map_err(|e| DecodeError::Malformed(e.to_string()))?;
	if id.trim().is_empty() {
		return Err(DecodeError::MissingField("order_id"));
	}
	Ok(id)
}

/// Reads a required text field. Numbers are accepted as text.
fn required_text(object: &Map<String, Value>, field: &'static str) -> Result<String, DecodeError> {
	match object.get(field) {
		Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
		Some(Value::Number(number)) => Ok(number.to_string()),
		Some(Value::String(_)) | Some(Value::Null) | None => Err(DecodeError::MissingField(field)),
		Some(other) => Err(DecodeError::Malformed(format!(
			"{} must be a string, got {}",
			field, other
		))),
	}
}

fn required_timestamp(object: &Map<String, Value>) -> Result<DateTime<Utc>, DecodeError> {
	match object.get("timestamp") {
		Some(Value::String(text)) if text.trim().is_empty() => {
			Err(DecodeError::MissingField("timestamp"))
		},
		Some(Value::String(text)) => {
			parse_timestamp(text).ok_or_else(|| DecodeError::InvalidTimestamp(text.clone()))
		},
		Some(Value::Number(number)) => number
			.as_i64()
			.and_then(|secs| DateTime::from_timestamp(secs, 0))
			.ok_or_else(|| DecodeError::InvalidTimestamp(number.to_string())),
		Some(Value::Null) | None => Err(DecodeError::MissingField("timestamp")),
		Some(other) => Err(DecodeError::InvalidTimestamp(other.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn test_decode_minimal_frame() {
		let event = decode(
			r#"{"order_id":"ORD-1","current_status":"shipped","timestamp":"2024-05-01T10:00:00Z"}"#,
		)
		.unwrap();

		assert_eq!(event.order_id, "ORD-1");
		assert_eq!(event.current_status.as_str(), "shipped");
		assert_eq!(
			event.timestamp,
			Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
		);
		assert_eq!(event.seed, OrderSeed::default());
	}

	#[test]
	fn test_decode_carries_seed_fields() {
		let event = decode(
			r#"{
				"order_id": "ORD-9",
				"current_status": "created",
				"timestamp": "2024-05-01T10:00:00.250000",
				"customer_name": "Dana",
				"product_name": "Lamp",
				"created_at": "2024-05-01T09:59:00Z",
				"unrelated": true
			}"#,
		)
		.unwrap();

		assert_eq!(event.seed.customer_name.as_deref(), Some("Dana"));
		assert_eq!(event.seed.product_name.as_deref(), Some("Lamp"));
		assert!(event.seed.created_at.is_some());
		assert!(event.seed.merchant_name.is_none());
	}

	#[test]
	fn test_unreadable_seed_keeps_status_change() {
		let event = decode(
			r#"{"order_id":"ORD-2","current_status":"paid","timestamp":1714557600,"created_at":"soon"}"#,
		)
		.unwrap();

		assert_eq!(event.current_status.as_str(), "paid");
		assert_eq!(event.seed, OrderSeed::default());
	}

	#[test]
	fn test_numeric_order_id_accepted() {
		let event =
			decode(r#"{"order_id":42,"current_status":"paid","timestamp":"2024-05-01T10:00:00Z"}"#)
				.unwrap();
		assert_eq!(event.order_id, "42");
	}

	#[test]
	fn test_order_id_shapes_match_snapshot_records() {
		assert_eq!(
			decode(r#"{"order_id":"","current_status":"paid","timestamp":1714557600}"#),
			Err(DecodeError::MissingField("order_id"))
		);
		assert!(matches!(
			decode(r#"{"order_id":4.5,"current_status":"paid","timestamp":1714557600}"#),
			Err(DecodeError::Malformed(_))
		));
	}

	#[test]
	fn test_rejects_non_json() {
		assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
		assert!(matches!(decode("[1,2]"), Err(DecodeError::Malformed(_))));
		assert!(matches!(decode(""), Err(DecodeError::Malformed(_))));
	}

	#[test]
	fn test_rejects_missing_fields() {
		assert_eq!(
			decode(r#"{"current_status":"paid","timestamp":"2024-05-01T10:00:00Z"}"#),
			Err(DecodeError::MissingField("order_id"))
		);
		assert_eq!(
			decode(r#"{"order_id":"ORD-1","current_status":"","timestamp":"2024-05-01T10:00:00Z"}"#),
			Err(DecodeError::MissingField("current_status"))
		);
		assert_eq!(
			decode(r#"{"order_id":"ORD-1","current_status":"paid","timestamp":null}"#),
			Err(DecodeError::MissingField("timestamp"))
		);
	}

	#[test]
	fn test_rejects_bad_timestamp() {
		assert_eq!(
			decode(r#"{"order_id":"ORD-1","current_status":"paid","timestamp":"yesterday"}"#),
			Err(DecodeError::InvalidTimestamp("yesterday".into()))
		);
	}

	#[test]
	fn test_rejection_does_not_affect_next_frame() {
		let frames = [
			r#"{"order_id":"A","current_status":"paid","timestamp":"2024-05-01T10:00:00Z"}"#,
			"{broken",
			r#"{"order_id":"B","current_status":"paid","timestamp":"2024-05-01T10:00:01Z"}"#,
		];

		let decoded: Vec<_> = frames.iter().map(|raw| decode(raw)).collect();
		assert!(decoded[0].is_ok());
		assert!(decoded[1].is_err());
		assert_eq!(decoded[2].as_ref().unwrap().order_id, "B");
	}
}
