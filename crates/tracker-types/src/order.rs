//! Order types for the tracker.
//!
//! This module defines the order record returned by snapshots, the
//! server-defined order status, and the live order event pushed over the
//! persistent connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{identifier::deserialize_id, timestamp::deserialize_optional};

/// Status value drawn from the server-defined status set.
///
/// The set of valid statuses is fetched from the server at session start,
/// so the status is kept as an opaque string rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderStatus(String);

impl OrderStatus {
	/// Creates a status from its raw server value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw server value.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true if the raw value is empty or whitespace.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for OrderStatus {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for OrderStatus {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// A trackable delivery order.
///
/// Orders arriving from a snapshot carry every field. Orders synthesized
/// from a live event for an unknown id only carry what the event carried,
/// so descriptive fields stay `None` until the next snapshot replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Stable identifier, unique across the system's lifetime.
	#[serde(deserialize_with = "deserialize_id")]
	pub order_id: String,
	/// Merchant that created the order.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_name: Option<String>,
	/// Customer receiving the delivery.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_name: Option<String>,
	/// Customer contact details.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_contact: Option<String>,
	/// Delivery address.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_address: Option<String>,
	/// Product being delivered.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_name: Option<String>,
	/// Current lifecycle status.
	pub current_status: OrderStatus,
	/// When the order was created.
	#[serde(
		default,
		deserialize_with = "deserialize_optional",
		skip_serializing_if = "Option::is_none"
	)]
	pub created_at: Option<DateTime<Utc>>,
	/// When the order status last changed.
	#[serde(
		default,
		deserialize_with = "deserialize_optional",
		skip_serializing_if = "Option::is_none"
	)]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
	/// Returns true if any descriptive field is missing.
	///
	/// Records synthesized from a bare status event are incomplete until a
	/// snapshot reload repairs them.
	pub fn is_partial(&self) -> bool {
		self.merchant_name.is_none()
			|| self.customer_name.is_none()
			|| self.customer_contact.is_none()
			|| self.customer_address.is_none()
			|| self.product_name.is_none()
			|| self.created_at.is_none()
	}
}

/// A decoded live order event.
///
/// Either a status change for an existing order, or the first sighting of
/// an order the local collection does not know yet. In the latter case the
/// optional seed fields, when the server sends them, populate the new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
	/// Identifier of the order the event refers to.
	pub order_id: String,
	/// New status of the order.
	pub current_status: OrderStatus,
	/// When the status change happened.
	pub timestamp: DateTime<Utc>,
	/// Descriptive fields carried along with the event, if any.
	pub seed: OrderSeed,
}

/// Optional descriptive fields an event may carry for new orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSeed {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_contact: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_name: Option<String>,
	#[serde(
		default,
		deserialize_with = "deserialize_optional",
		skip_serializing_if = "Option::is_none"
	)]
	pub created_at: Option<DateTime<Utc>>,
}

impl OrderEvent {
	/// Creates an event carrying only the three mandatory fields.
	pub fn new(
		order_id: impl Into<String>,
		current_status: impl Into<OrderStatus>,
		timestamp: DateTime<Utc>,
	) -> Self {
		Self {
			order_id: order_id.into(),
			current_status: current_status.into(),
			timestamp,
			seed: OrderSeed::default(),
		}
	}

	/// Attaches descriptive seed fields to the event.
	pub fn with_seed(mut self, seed: OrderSeed) -> Self {
		self.seed = seed;
		self
	}

	/// Builds the record inserted when no order with this id exists yet.
	///
	/// The status change time doubles as the last-update time; the creation
	/// time is only known if the event carried it.
	pub fn to_order(&self) -> Order {
		Order {
			order_id: self.order_id.clone(),
			merchant_name: self.seed.merchant_name.clone(),
			customer_name: self.seed.customer_name.clone(),
			customer_contact: self.seed.customer_contact.clone(),
			customer_address: self.seed.customer_address.clone(),
			product_name: self.seed.product_name.clone(),
			current_status: self.current_status.clone(),
			created_at: self.seed.created_at,
			updated_at: Some(self.timestamp),
		}
	}
}
