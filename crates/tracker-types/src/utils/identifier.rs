//! Order identifier parsing.
//!
//! Some servers send `order_id` as a JSON string, others as an integer.
//! Both are normalized to the same text so an order keeps one identity
//! whether it arrives in a snapshot or in a live event.

use serde::{Deserialize, Deserializer};

/// Raw identifier representation as it appears in JSON.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
	Text(String),
	Signed(i64),
	Unsigned(u64),
}

impl RawId {
	fn into_text(self) -> String {
		match self {
			RawId::Text(text) => text,
			RawId::Signed(number) => number.to_string(),
			RawId::Unsigned(number) => number.to_string(),
		}
	}
}

/// Deserializes an order identifier given as a string or an integer.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	use serde::de::Error;

	RawId::deserialize(deserializer)
		.map(RawId::into_text)
		.map_err(|_| Error::custom("order_id must be a string or an integer"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_text_and_integer_ids() {
		assert_eq!(deserialize_id(&json!("ORD-1")).unwrap(), "ORD-1");
		assert_eq!(deserialize_id(&json!(42)).unwrap(), "42");
		assert_eq!(deserialize_id(&json!(u64::MAX)).unwrap(), u64::MAX.to_string());
	}

	#[test]
	fn test_other_shapes_rejected() {
		assert!(deserialize_id(&json!(4.5)).is_err());
		assert!(deserialize_id(&json!(true)).is_err());
		assert!(deserialize_id(&json!(["ORD-1"])).is_err());
	}
}
