//! Snapshot loading for the order tracker.
//!
//! Fetches the current order list for a status filter, the enumeration of
//! valid statuses, and submits newly created orders. A failed snapshot
//! never aborts the session: the caller gets an empty list together with
//! the failure and decides how to surface it.

use async_trait::async_trait;
use thiserror::Error;
use tracker_types::{
	ConfigSchema, CreateOrderRequest, ImplementationRegistry, Order, OrderStatus, SessionToken,
	StatusFilter, ValidationError,
};

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur while talking to the order API.
#[derive(Debug, Error)]
pub enum SnapshotError {
	/// The request could not be sent or no response arrived.
	#[error("Request failed: {0}")]
	Request(String),
	/// The server answered with a non-success status.
	#[error("Server rejected request ({status}): {detail}")]
	Rejected { status: u16, detail: String },
	/// The response body did not have the expected shape.
	#[error("Invalid response: {0}")]
	Decode(String),
	/// A create request was missing required fields.
	#[error("Invalid order: {0}")]
	InvalidOrder(#[from] ValidationError),
	/// The implementation configuration is invalid.
	#[error("Validation error: {0}")]
	ValidationError(String),
}

impl SnapshotError {
	/// Message suitable for showing to the person who made the request.
	///
	/// For server rejections this is the server's own explanation.
	pub fn user_message(&self) -> String {
		match self {
			SnapshotError::Rejected { detail, .. } => detail.clone(),
			other => other.to_string(),
		}
	}
}

/// Trait defining the interface for order API backends.
#[async_trait]
pub trait SnapshotInterface: Send + Sync {
	/// Returns the configuration schema for this backend.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches all orders matching `filter`, in server order.
	async fn fetch_orders(
		&self,
		filter: &StatusFilter,
		token: Option<&SessionToken>,
	) -> Result<Vec<Order>, SnapshotError>;

	/// Fetches the enumeration of valid order statuses.
	async fn fetch_statuses(
		&self,
		token: Option<&SessionToken>,
	) -> Result<Vec<OrderStatus>, SnapshotError>;

	/// Submits a new order. The response body is not interpreted.
	async fn create_order(
		&self,
		request: &CreateOrderRequest,
		token: Option<&SessionToken>,
	) -> Result<(), SnapshotError>;
}

/// Type alias for snapshot factory functions.
pub type SnapshotFactory = fn(&toml::Value) -> Result<Box<dyn SnapshotInterface>, SnapshotError>;

/// Registry trait for snapshot implementations.
pub trait SnapshotRegistry: ImplementationRegistry<Factory = SnapshotFactory> {}

/// Get all registered snapshot implementations.
pub fn get_all_implementations() -> Vec<(&'static str, SnapshotFactory)> {
	use implementations::http;

	vec![(http::Registry::NAME, http::Registry::factory())]
}

/// Outcome of one snapshot load.
///
/// `orders` is empty whenever `failure` is set.
#[derive(Debug, Default)]
pub struct SnapshotLoad {
	pub orders: Vec<Order>,
	pub failure: Option<SnapshotError>,
}

impl SnapshotLoad {
	/// Returns true if the load succeeded, even with zero orders.
	pub fn is_ok(&self) -> bool {
		self.failure.is_none()
	}
}

/// Snapshot loader of a session.
///
/// Holds the session token and attaches it to every request.
pub struct SnapshotService {
	/// The backend implementation.
	implementation: Box<dyn SnapshotInterface>,
	/// Bearer token of the session, if any.
	token: Option<SessionToken>,
}

impl SnapshotService {
	/// Creates a new SnapshotService for the given backend and session token.
	pub fn new(implementation: Box<dyn SnapshotInterface>, token: Option<SessionToken>) -> Self {
		Self {
			implementation,
			token: token.filter(|token| !token.is_blank()),
		}
	}

	/// Loads the orders matching `filter`.
	///
	/// Issues exactly one request. An empty list is a valid result; a failed
	/// request yields an empty list together with the failure. No retry.
	pub async fn load(&self, filter: &StatusFilter) -> SnapshotLoad {
		match self
			.implementation
			.fetch_orders(filter, self.token.as_ref())
			.await
		{
			Ok(orders) => {
				tracing::debug!(filter = %filter, count = orders.len(), "Snapshot loaded");
				SnapshotLoad {
					orders,
					failure: None,
				}
			},
			Err(e) => {
				tracing::warn!(filter = %filter, "Failed to load orders: {}", e);
				SnapshotLoad {
					orders: Vec::new(),
					failure: Some(e),
				}
			},
		}
	}

	/// Fetches the valid status values.
	pub async fn statuses(&self) -> Result<Vec<OrderStatus>, SnapshotError> {
		self.implementation
			.fetch_statuses(self.token.as_ref())
			.await
	}

	/// Validates and submits a new order.
	///
	/// Nothing is sent if a required field is blank.
	pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<(), SnapshotError> {
		request.validate()?;

		self.implementation
			.create_order(request, self.token.as_ref())
			.await?;

		tracing::info!(order_id = %request.order_id, "Order submitted");
		Ok(())
	}
}
