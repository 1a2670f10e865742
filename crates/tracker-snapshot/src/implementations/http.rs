//! HTTP backend for the order API.
//!
//! Endpoints, relative to `base_url`:
//! - `GET /orders[?status=S]` returning `{"orders": [...]}`
//! - `GET {statuses_path}` returning `{"statuses": [...]}`
//! - `POST /orders` with a JSON order body
//!
//! Every request carries `Authorization: Bearer <token>` when the session
//! has a token.

use crate::{SnapshotError, SnapshotFactory, SnapshotInterface, SnapshotRegistry};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracker_types::{
	ConfigSchema, CreateOrderRequest, ErrorResponse, Field, FieldType, ImplementationRegistry,
	Order, OrderStatus, OrdersResponse, Schema, SessionToken, StatusFilter, StatusesResponse,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default path of the status enumeration endpoint.
const DEFAULT_STATUSES_PATH: &str = "/orders/statuses";

/// Order API client over HTTP.
pub struct HttpSnapshot {
	client: Client,
	/// API root without a trailing slash.
	base_url: String,
	/// Path of the status enumeration endpoint, starting with `/`.
	statuses_path: String,
}

impl HttpSnapshot {
	/// Creates a client for the API rooted at `base_url`.
	pub fn new(
		base_url: &str,
		statuses_path: &str,
		timeout: Duration,
	) -> Result<Self, SnapshotError> {
		let client = Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(timeout)
			.build()
			.map_err(|e| SnapshotError::Request(format!("Failed to build HTTP client: {}", e)))?;

		let statuses_path = if statuses_path.starts_with('/') {
			statuses_path.to_string()
		} else {
			format!("/{}", statuses_path)
		};

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			statuses_path,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn authorize(request: RequestBuilder, token: Option<&SessionToken>) -> RequestBuilder {
		match token {
			Some(token) => request.bearer_auth(token.expose_secret()),
			None => request,
		}
	}

	/// Sends a request and maps transport failures and non-success statuses.
	async fn send(request: RequestBuilder) -> Result<Response, SnapshotError> {
		let response = request
			.send()
			.await
			.map_err(|e| SnapshotError::Request(e.without_url().to_string()))?;

		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		let detail = serde_json::from_str::<ErrorResponse>(&body)
			.map(|error| error.message())
			.unwrap_or_else(|_| {
				if body.trim().is_empty() {
					status
						.canonical_reason()
						.unwrap_or("Unknown error")
						.to_string()
				} else {
					body
				}
			});

		Err(SnapshotError::Rejected {
			status: status.as_u16(),
			detail,
		})
	}

	async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, SnapshotError> {
		Self::send(request)
			.await?
			.json::<T>()
			.await
			.map_err(|e| SnapshotError::Decode(e.without_url().to_string()))
	}
}

/// Configuration schema for the HTTP backend.
pub struct HttpSnapshotSchema;

impl ConfigSchema for HttpSnapshotSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), tracker_types::ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![Field::new("base_url", FieldType::Url(&["http", "https"]))],
			// Optional fields
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("statuses_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if !path.trim().is_empty() => Ok(()),
						_ => Err("statuses_path cannot be empty".to_string()),
					}
				}),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl SnapshotInterface for HttpSnapshot {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpSnapshotSchema)
	}

	async fn fetch_orders(
		&self,
		filter: &StatusFilter,
		token: Option<&SessionToken>,
	) -> Result<Vec<Order>, SnapshotError> {
		let mut request = self.client.get(self.url("/orders"));
		if let Some(status) = filter.query_value() {
			request = request.query(&[("status", status)]);
		}

		let response: OrdersResponse = Self::get_json(Self::authorize(request, token)).await?;
		Ok(response.orders)
	}

	async fn fetch_statuses(
		&self,
		token: Option<&SessionToken>,
	) -> Result<Vec<OrderStatus>, SnapshotError> {
		let request = self.client.get(self.url(&self.statuses_path));
		let response: StatusesResponse = Self::get_json(Self::authorize(request, token)).await?;
		Ok(response.statuses)
	}

	async fn create_order(
		&self,
		request: &CreateOrderRequest,
		token: Option<&SessionToken>,
	) -> Result<(), SnapshotError> {
		let builder = self.client.post(self.url("/orders")).json(request);
		Self::send(Self::authorize(builder, token)).await?;
		Ok(())
	}
}

/// Factory function to create an HTTP backend from configuration.
///
/// Configuration parameters:
/// - `base_url`: root of the order API, http:// or https:// (required)
/// - `timeout_seconds`: per-request timeout (default: 30)
/// - `statuses_path`: status enumeration endpoint (default: "/orders/statuses")
pub fn create_snapshot(config: &toml::Value) -> Result<Box<dyn SnapshotInterface>, SnapshotError> {
	HttpSnapshotSchema
		.validate(config)
		.map_err(|e| SnapshotError::ValidationError(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| SnapshotError::ValidationError("base_url is required".to_string()))?;

	let timeout_secs = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECS);

	let statuses_path = config
		.get("statuses_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STATUSES_PATH);

	Ok(Box::new(HttpSnapshot::new(
		base_url,
		statuses_path,
		Duration::from_secs(timeout_secs),
	)?))
}

/// Registry for the HTTP backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = SnapshotFactory;

	fn factory() -> Self::Factory {
		create_snapshot
	}
}

impl SnapshotRegistry for Registry {}
