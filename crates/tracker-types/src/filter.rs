//! Status filter types.
//!
//! A status filter selects which snapshot is authoritative for the table.
//! It is either the "all active" sentinel or one concrete status value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{utils::status_label, OrderStatus};

/// Selects which orders a snapshot returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
	/// All orders that are still active.
	#[default]
	Active,
	/// Orders currently in exactly this status.
	Status(OrderStatus),
}

impl StatusFilter {
	/// Wire value of the "all active" sentinel.
	pub const ACTIVE: &'static str = "ACTIVE";

	/// Value to send as the `status` query parameter.
	///
	/// The sentinel is expressed by omitting the parameter.
	pub fn query_value(&self) -> Option<&str> {
		match self {
			StatusFilter::Active => None,
			StatusFilter::Status(status) => Some(status.as_str()),
		}
	}

	/// Wire value of this filter, including the sentinel.
	pub fn as_str(&self) -> &str {
		match self {
			StatusFilter::Active => Self::ACTIVE,
			StatusFilter::Status(status) => status.as_str(),
		}
	}

	/// Returns true if the filter is admissible for the given status domain.
	///
	/// The sentinel is always admissible. An empty domain means the status
	/// enumeration could not be fetched, in which case every filter is let
	/// through and the server decides.
	pub fn is_within(&self, domain: &[OrderStatus]) -> bool {
		match self {
			StatusFilter::Active => true,
			StatusFilter::Status(status) => domain.is_empty() || domain.contains(status),
		}
	}
}

impl fmt::Display for StatusFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for StatusFilter {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		if trimmed.is_empty() {
			return Err("status filter cannot be empty".to_string());
		}
		if trimmed.eq_ignore_ascii_case(Self::ACTIVE) {
			return Ok(StatusFilter::Active);
		}
		Ok(StatusFilter::Status(OrderStatus::new(trimmed)))
	}
}

impl Serialize for StatusFilter {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for StatusFilter {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// One selectable entry of the status filter domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusOption {
	/// Display label.
	pub label: String,
	/// Filter selected by this entry.
	pub value: StatusFilter,
}

/// Builds the selectable filter domain from the server's status set.
///
/// The sentinel entry always comes first, followed by the server statuses
/// in the order the server returned them.
pub fn status_options(statuses: &[OrderStatus]) -> Vec<StatusOption> {
	let mut options = Vec::with_capacity(statuses.len() + 1);
	options.push(StatusOption {
		label: "ACTIVE ORDERS".to_string(),
		value: StatusFilter::Active,
	});
	options.extend(statuses.iter().map(|status| StatusOption {
		label: status_label(status.as_str()),
		value: StatusFilter::Status(status.clone()),
	}));
	options
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_sentinel_case_insensitive() {
		assert_eq!("ACTIVE".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
		assert_eq!(" active ".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
		assert_eq!(
			"delivered".parse::<StatusFilter>().unwrap(),
			StatusFilter::Status(OrderStatus::new("delivered"))
		);
		assert!("  ".parse::<StatusFilter>().is_err());
	}

	#[test]
	fn test_query_value_omits_sentinel() {
		assert_eq!(StatusFilter::Active.query_value(), None);
		assert_eq!(
			StatusFilter::Status("in_transit".into()).query_value(),
			Some("in_transit")
		);
	}

	#[test]
	fn test_is_within_domain() {
		let domain = vec![OrderStatus::new("created"), OrderStatus::new("delivered")];
		assert!(StatusFilter::Active.is_within(&domain));
		assert!(StatusFilter::Status("delivered".into()).is_within(&domain));
		assert!(!StatusFilter::Status("lost".into()).is_within(&domain));
		assert!(StatusFilter::Status("lost".into()).is_within(&[]));
	}

	#[test]
	fn test_status_options() {
		let options = status_options(&[OrderStatus::new("created"), OrderStatus::new("picked_up")]);
		assert_eq!(options.len(), 3);
		assert_eq!(options[0].label, "ACTIVE ORDERS");
		assert_eq!(options[0].value, StatusFilter::Active);
		assert_eq!(options[2].label, "PICKED UP");
		assert_eq!(options[2].value, StatusFilter::Status("picked_up".into()));
	}

	#[test]
	fn test_filter_serde() {
		let json = serde_json::to_string(&StatusFilter::Status("delivered".into())).unwrap();
		assert_eq!(json, "\"delivered\"");
		let parsed: StatusFilter = serde_json::from_str("\"ACTIVE\"").unwrap();
		assert_eq!(parsed, StatusFilter::Active);
	}
}
