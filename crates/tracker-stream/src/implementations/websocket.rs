//! WebSocket transport for live order updates.
//!
//! Connects to the configured endpoint with the session token appended as a
//! query parameter and forwards every received frame as a connection signal.
//! There is no reconnect: once the socket is gone the connection reports
//! `Closed` and stays closed.

use crate::{
	Connection, ConnectionSignal, StreamError, StreamFactory, StreamInterface, StreamRegistry,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracker_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SessionToken};
use url::Url;

/// Default name of the query parameter carrying the token.
const DEFAULT_TOKEN_PARAM: &str = "token";

/// Default handshake timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// How long a graceful close waits for the server's close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// WebSocket live update transport.
pub struct WebSocketStream {
	/// Endpoint without credentials.
	endpoint: Url,
	/// Query parameter the token is sent in.
	token_param: String,
	/// Upper bound on the opening handshake.
	connect_timeout: Duration,
}

impl WebSocketStream {
	/// Creates a transport for `endpoint`.
	pub fn new(endpoint: Url, token_param: impl Into<String>, connect_timeout: Duration) -> Self {
		Self {
			endpoint,
			token_param: token_param.into(),
			connect_timeout,
		}
	}

	/// Builds the authenticated target URL. Never logged.
	fn target(&self, token: &SessionToken) -> String {
		let mut url = self.endpoint.clone();
		url.query_pairs_mut()
			.append_pair(&self.token_param, token.expose_secret());
		url.into()
	}
}

/// Configuration schema for the WebSocket transport.
pub struct WebSocketStreamSchema;

impl ConfigSchema for WebSocketStreamSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), tracker_types::ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![Field::new("url", FieldType::Url(&["ws", "wss"]))],
			// Optional fields
			vec![
				Field::new("token_param", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(param) if !param.trim().is_empty() => Ok(()),
						_ => Err("token_param cannot be empty".to_string()),
					}
				}),
				Field::new(
					"connect_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(120),
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl StreamInterface for WebSocketStream {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WebSocketStreamSchema)
	}

	async fn connect(&self, token: &SessionToken) -> Result<Connection, StreamError> {
		let target = self.target(token);
		let (signal_tx, signal_rx) = mpsc::unbounded_channel();
		let (shutdown_tx, shutdown_rx) = oneshot::channel();

		tracing::info!(endpoint = %self.endpoint, "Opening live update stream");
		let task = tokio::spawn(run_connection(
			target,
			self.connect_timeout,
			signal_tx,
			shutdown_rx,
		));

		Ok(Connection::new(signal_rx).with_task(shutdown_tx, task))
	}
}

/// Drives one socket from handshake to close.
///
/// `Closed` is always the final signal. A dropped shutdown sender counts
/// as a shutdown request.
async fn run_connection(
	target: String,
	connect_timeout: Duration,
	signals: mpsc::UnboundedSender<ConnectionSignal>,
	mut shutdown: oneshot::Receiver<()>,
) {
	let handshake = tokio::select! {
		result = timeout(connect_timeout, connect_async(target)) => result,
		_ = &mut shutdown => {
			tracing::debug!("Stream closed before handshake completed");
			let _ = signals.send(ConnectionSignal::Closed);
			return;
		}
	};

	let ws_stream = match handshake {
		Ok(Ok((ws_stream, _response))) => ws_stream,
		Ok(Err(e)) => {
			tracing::warn!("Live update handshake failed: {}", e);
			let _ = signals.send(ConnectionSignal::Error(format!("Handshake failed: {}", e)));
			let _ = signals.send(ConnectionSignal::Closed);
			return;
		},
		Err(_) => {
			tracing::warn!("Live update handshake timed out after {:?}", connect_timeout);
			let _ = signals.send(ConnectionSignal::Error(format!(
				"Handshake timed out after {}s",
				connect_timeout.as_secs()
			)));
			let _ = signals.send(ConnectionSignal::Closed);
			return;
		},
	};

	tracing::info!("Live update stream open");
	if signals.send(ConnectionSignal::Opened).is_err() {
		return;
	}

	let (mut write, mut read) = ws_stream.split();

	loop {
		tokio::select! {
			_ = &mut shutdown => {
				tracing::debug!("Closing live update stream");
				// Sending the close frame and waiting for the reply share one deadline
				let closing = async {
					if let Err(e) = write.close().await {
						tracing::debug!("Close frame not sent: {}", e);
						return;
					}
					while let Some(Ok(msg)) = read.next().await {
						if msg.is_close() {
							break;
						}
					}
				};
				if timeout(CLOSE_GRACE, closing).await.is_err() {
					tracing::debug!("Server did not complete the close handshake within {:?}", CLOSE_GRACE);
				}
				break;
			}

			msg = read.next() => {
				let signal = match msg {
					Some(Ok(Message::Text(text))) => ConnectionSignal::Message(text),
					Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
						Ok(text) => ConnectionSignal::Message(text),
						Err(_) => ConnectionSignal::Error("Binary frame is not valid UTF-8".into()),
					},
					Some(Ok(Message::Close(frame))) => {
						tracing::info!("Live update stream closed by server: {:?}", frame);
						break;
					},
					// Control frames are answered by the protocol layer
					Some(Ok(_)) => continue,
					Some(Err(e)) => {
						tracing::warn!("Live update stream error: {}", e);
						let _ = signals.send(ConnectionSignal::Error(e.to_string()));
						break;
					},
					None => {
						tracing::info!("Live update stream ended");
						break;
					},
				};

				if signals.send(signal).is_err() {
					// Nobody is listening anymore
					let _ = timeout(CLOSE_GRACE, write.close()).await;
					break;
				}
			}
		}
	}

	let _ = signals.send(ConnectionSignal::Closed);
}

/// Factory function to create a WebSocket transport from configuration.
///
/// Configuration parameters:
/// - `url`: ws:// or wss:// endpoint of the order update channel (required)
/// - `token_param`: query parameter carrying the token (default: "token")
/// - `connect_timeout_seconds`: handshake timeout (default: 10)
pub fn create_stream(config: &toml::Value) -> Result<Box<dyn StreamInterface>, StreamError> {
	WebSocketStreamSchema
		.validate(config)
		.map_err(|e| StreamError::ValidationError(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StreamError::ValidationError("url is required".to_string()))?;
	let endpoint = Url::parse(url)
		.map_err(|e| StreamError::Connection(format!("Invalid stream url '{}': {}", url, e)))?;

	let token_param = config
		.get("token_param")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_TOKEN_PARAM);

	let connect_timeout = config
		.get("connect_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

	Ok(Box::new(WebSocketStream::new(
		endpoint,
		token_param,
		Duration::from_secs(connect_timeout),
	)))
}

/// Registry for the WebSocket transport.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "websocket";
	type Factory = StreamFactory;

	fn factory() -> Self::Factory {
		create_stream
	}
}

impl StreamRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::net::TcpListener;
	use tokio_tungstenite::accept_hdr_async;
	use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

	async fn next_signal(connection: &mut Connection) -> ConnectionSignal {
		timeout(Duration::from_secs(5), connection.recv())
			.await
			.expect("signal should arrive")
			.expect("channel should stay open until Closed")
	}

	fn transport(port: u16) -> Box<dyn StreamInterface> {
		let config: toml::Value = toml::from_str(&format!(
			"url = \"ws://127.0.0.1:{}/ws/orders\"\nconnect_timeout_seconds = 5",
			port
		))
		.unwrap();
		create_stream(&config).unwrap()
	}

	#[test]
	fn test_schema_rejects_http_url() {
		let config: toml::Value = toml::from_str("url = \"http://localhost:8000/ws\"").unwrap();
		assert!(create_stream(&config).is_err());

		let config: toml::Value =
			toml::from_str("url = \"ws://localhost:8000/ws\"\ntoken_param = \"\"").unwrap();
		assert!(create_stream(&config).is_err());
	}

	#[test]
	fn test_target_appends_token() {
		let stream = WebSocketStream::new(
			Url::parse("ws://localhost:8000/ws/orders").unwrap(),
			"token",
			Duration::from_secs(1),
		);
		let target = stream.target(&SessionToken::from("abc 123"));
		assert_eq!(target, "ws://localhost:8000/ws/orders?token=abc+123");
	}

	#[tokio::test]
	async fn test_frames_forwarded_in_order() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let (query_tx, query_rx) = oneshot::channel();

		tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let ws = accept_hdr_async(stream, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
				let _ = query_tx.send(req.uri().query().map(str::to_string));
				Ok(resp)
			})
			.await
			.unwrap();
			let (mut write, _read) = ws.split();
			write.send(Message::Text("first".into())).await.unwrap();
			write
				.send(Message::Binary(b"second".to_vec()))
				.await
				.unwrap();
			write.send(Message::Binary(vec![0xff, 0xfe])).await.unwrap();
			write.send(Message::Close(None)).await.unwrap();
		});

		let mut connection = transport(port)
			.connect(&SessionToken::from("secret"))
			.await
			.unwrap();

		assert_eq!(next_signal(&mut connection).await, ConnectionSignal::Opened);
		assert_eq!(
			next_signal(&mut connection).await,
			ConnectionSignal::Message("first".into())
		);
		assert_eq!(
			next_signal(&mut connection).await,
			ConnectionSignal::Message("second".into())
		);
		assert!(matches!(
			next_signal(&mut connection).await,
			ConnectionSignal::Error(_)
		));
		assert_eq!(next_signal(&mut connection).await, ConnectionSignal::Closed);

		assert_eq!(query_rx.await.unwrap().as_deref(), Some("token=secret"));
	}

	#[tokio::test]
	async fn test_failed_handshake_reports_error_then_closed() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();

		tokio::spawn(async move {
			// Accept the socket and drop it without a handshake
			let (stream, _) = listener.accept().await.unwrap();
			drop(stream);
		});

		let mut connection = transport(port)
			.connect(&SessionToken::from("secret"))
			.await
			.unwrap();

		assert!(matches!(
			next_signal(&mut connection).await,
			ConnectionSignal::Error(_)
		));
		assert_eq!(next_signal(&mut connection).await, ConnectionSignal::Closed);
	}

	#[tokio::test]
	async fn test_close_sends_close_frame() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let (closed_tx, closed_rx) = oneshot::channel();

		tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let ws = accept_hdr_async(
				stream,
				|_: &Request, resp: Response| -> Result<Response, ErrorResponse> { Ok(resp) },
			)
				.await
				.unwrap();
			let (_write, mut read) = ws.split();
			let mut saw_close = false;
			while let Some(Ok(msg)) = read.next().await {
				if msg.is_close() {
					saw_close = true;
				}
			}
			let _ = closed_tx.send(saw_close);
		});

		let mut connection = transport(port)
			.connect(&SessionToken::from("secret"))
			.await
			.unwrap();
		assert_eq!(next_signal(&mut connection).await, ConnectionSignal::Opened);

		connection.close().await;

		let saw_close = timeout(Duration::from_secs(5), closed_rx)
			.await
			.expect("server should finish")
			.unwrap();
		assert!(saw_close);
	}

	#[tokio::test]
	async fn test_close_is_bounded_when_server_goes_silent() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let (release_tx, release_rx) = oneshot::channel::<()>();

		tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let ws = accept_hdr_async(
				stream,
				|_: &Request, resp: Response| -> Result<Response, ErrorResponse> { Ok(resp) },
			)
			.await
			.unwrap();
			// Hold the socket open without reading or answering the close frame
			let _ = release_rx.await;
			drop(ws);
		});

		let mut connection = transport(port)
			.connect(&SessionToken::from("secret"))
			.await
			.unwrap();
		assert_eq!(next_signal(&mut connection).await, ConnectionSignal::Opened);

		timeout(CLOSE_GRACE + Duration::from_secs(2), connection.close())
			.await
			.expect("close should give up after the grace period");

		let _ = release_tx.send(());
	}
}
