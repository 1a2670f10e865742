//! API types for the order HTTP endpoints.
//!
//! This module defines the response bodies of the snapshot and status
//! enumeration endpoints, and the request body of the create-order endpoint.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Order, OrderStatus, ValidationError};

/// Response of `GET /orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdersResponse {
	/// Orders matching the requested filter, in server order.
	#[serde(default, deserialize_with = "null_as_empty")]
	pub orders: Vec<Order>,
}

/// Response of the status enumeration endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusesResponse {
	/// Every valid status value, in server order.
	#[serde(default, deserialize_with = "null_as_empty")]
	pub statuses: Vec<OrderStatus>,
}

/// Treats an explicit `null` list the same as a missing one.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Error body returned by the order API on rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Human-readable reason.
	pub detail: serde_json::Value,
}

impl ErrorResponse {
	/// Renders the detail as a single message.
	///
	/// Validation failures carry a structured detail instead of a string;
	/// those are rendered as compact JSON.
	pub fn message(&self) -> String {
		match &self.detail {
			serde_json::Value::String(message) => message.clone(),
			other => other.to_string(),
		}
	}
}

/// Request body of `POST /orders`.
///
/// The created order is not returned into the local collection; it is
/// expected to arrive through the live event stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
	pub order_id: String,
	pub product_name: String,
	pub customer_name: String,
	pub customer_contact: String,
	pub customer_address: String,
	/// Merchant creating the order, when the session knows it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_name: Option<String>,
}

impl CreateOrderRequest {
	/// Checks that every required seed field is filled in.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let required = [
			("order_id", &self.order_id),
			("product_name", &self.product_name),
			("customer_name", &self.customer_name),
			("customer_contact", &self.customer_contact),
			("customer_address", &self.customer_address),
		];

		for (name, value) in required {
			if value.trim().is_empty() {
				return Err(ValidationError::MissingField(name.to_string()));
			}
		}

		if let Some(merchant) = &self.merchant_name {
			if merchant.trim().is_empty() {
				return Err(ValidationError::InvalidValue {
					field: "merchant_name".to_string(),
					message: "Merchant name cannot be blank when provided".to_string(),
				});
			}
		}

		Ok(())
	}
}
