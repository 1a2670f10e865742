//! Live order update stream for the order tracker.
//!
//! This module owns the persistent server connection of a session. It
//! provides the transport abstraction, the connection handle that yields
//! lifecycle signals in delivery order, and the decoder that turns raw
//! frames into order events.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracker_types::{ConfigSchema, ImplementationRegistry, SessionToken};

pub mod decoder;

pub use decoder::{decode, DecodeError};

/// Re-export implementations
pub mod implementations {
	pub mod websocket;
}

/// Errors that can occur while opening a stream.
///
/// Failures after `open` returns are not errors; they arrive as
/// `ConnectionSignal::Error` and `ConnectionSignal::Closed`.
#[derive(Debug, Error)]
pub enum StreamError {
	/// The endpoint could not be turned into a connection target.
	#[error("Connection error: {0}")]
	Connection(String),
	/// The implementation configuration is invalid.
	#[error("Validation error: {0}")]
	ValidationError(String),
}

/// Lifecycle signal of an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSignal {
	/// The handshake completed and frames may follow.
	Opened,
	/// A raw text frame was received.
	Message(String),
	/// Something went wrong; the channel may still be usable or about to close.
	Error(String),
	/// The channel is no longer usable. Always the last signal.
	Closed,
}

/// Handle to one persistent connection.
///
/// Signals are queued in an unbounded channel in the order the transport
/// delivers them, so nothing is lost while the consumer is busy with a
/// snapshot fetch. Dropping the handle also tears the connection down;
/// `close` does so gracefully and waits for the transport task.
pub struct Connection {
	signals: mpsc::UnboundedReceiver<ConnectionSignal>,
	shutdown: Option<oneshot::Sender<()>>,
	task: Option<JoinHandle<()>>,
}

impl Connection {
	/// Wraps a signal receiver with no background task attached.
	pub fn new(signals: mpsc::UnboundedReceiver<ConnectionSignal>) -> Self {
		Self {
			signals,
			shutdown: None,
			task: None,
		}
	}

	/// Attaches the transport task and the channel used to stop it.
	pub fn with_task(mut self, shutdown: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
		self.shutdown = Some(shutdown);
		self.task = Some(task);
		self
	}

	/// Receives the next signal. Returns `None` once the transport is gone.
	pub async fn recv(&mut self) -> Option<ConnectionSignal> {
		self.signals.recv().await
	}

	/// Closes the connection and waits for the transport to finish.
	pub async fn close(mut self) {
		if let Some(shutdown) = self.shutdown.take() {
			let _ = shutdown.send(());
		}
		if let Some(task) = self.task.take() {
			if let Err(e) = task.await {
				tracing::warn!("Stream task ended abnormally: {}", e);
			}
		}
		self.signals.close();
	}
}

/// Trait defining the interface for live update transports.
#[async_trait]
pub trait StreamInterface: Send + Sync {
	/// Returns the configuration schema for this transport.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Starts a connection authenticated with `token`.
	///
	/// Returns as soon as the connection task is running. The handshake
	/// outcome is reported through the connection's signals.
	async fn connect(&self, token: &SessionToken) -> Result<Connection, StreamError>;
}

/// Type alias for stream factory functions.
pub type StreamFactory = fn(&toml::Value) -> Result<Box<dyn StreamInterface>, StreamError>;

/// Registry trait for stream implementations.
pub trait StreamRegistry: ImplementationRegistry<Factory = StreamFactory> {}

/// Get all registered stream implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StreamFactory)> {
	use implementations::websocket;

	vec![(websocket::Registry::NAME, websocket::Registry::factory())]
}

/// Connection manager of a session.
pub struct StreamService {
	/// The transport implementation.
	implementation: Box<dyn StreamInterface>,
}

impl StreamService {
	/// Creates a new StreamService with the specified transport.
	pub fn new(implementation: Box<dyn StreamInterface>) -> Self {
		Self { implementation }
	}

	/// Opens the live update connection for a session.
	///
	/// Returns `Ok(None)` without touching the transport when the token is
	/// absent or blank.
	pub async fn open(
		&self,
		token: Option<&SessionToken>,
	) -> Result<Option<Connection>, StreamError> {
		let Some(token) = token.filter(|token| !token.is_blank()) else {
			tracing::info!("No session token, live updates disabled");
			return Ok(None);
		};

		self.implementation.connect(token).await.map(Some)
	}
}
