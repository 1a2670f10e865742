//! Order synchronization session.
//!
//! One `OrderSync` drives one session: it loads the status domain and the
//! initial snapshot, opens the live channel, and then folds every received
//! frame into the collection while serving filter changes. All of this
//! happens on a single task, so events are applied strictly one at a time
//! in the order the transport delivered them. Frames that arrive while a
//! snapshot is being fetched wait in the connection's queue and are
//! applied once the fetch completes.

use crate::event_bus::EventBus;
use crate::events::SyncEvent;
use crate::reconciler::{ApplyOutcome, OrderCollection};
use crate::EngineError;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracker_config::SessionConfig;
use tracker_snapshot::SnapshotService;
use tracker_stream::{decode, Connection, ConnectionSignal, StreamService};
use tracker_types::{truncate_id, CreateOrderRequest, OrderStatus, StatusFilter};

/// Requests a running session accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
	/// Switch to another filter and replace the collection with its snapshot.
	SetFilter(StatusFilter),
	/// Reload the snapshot of the current filter.
	Reload,
	/// Close the live channel, if open, and open a new one.
	Reconnect,
	/// End the session.
	Shutdown,
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct SessionHandle {
	commands: mpsc::Sender<SessionCommand>,
	event_bus: EventBus,
}

impl SessionHandle {
	pub async fn set_filter(&self, filter: StatusFilter) -> Result<(), EngineError> {
		self.send(SessionCommand::SetFilter(filter)).await
	}

	pub async fn reload(&self) -> Result<(), EngineError> {
		self.send(SessionCommand::Reload).await
	}

	pub async fn reconnect(&self) -> Result<(), EngineError> {
		self.send(SessionCommand::Reconnect).await
	}

	pub async fn shutdown(&self) -> Result<(), EngineError> {
		self.send(SessionCommand::Shutdown).await
	}

	/// Subscribes to session events.
	pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
		self.event_bus.subscribe()
	}

	async fn send(&self, command: SessionCommand) -> Result<(), EngineError> {
		self.commands
			.send(command)
			.await
			.map_err(|_| EngineError::SessionClosed)
	}
}

/// State owned by the session task.
struct SessionState {
	filter: StatusFilter,
	/// Valid statuses; empty when the enumeration could not be fetched.
	domain: Vec<OrderStatus>,
	orders: Arc<OrderCollection>,
	/// At most one live channel per session.
	connection: Option<Connection>,
}

/// Synchronization core of one session.
pub struct OrderSync {
	session: SessionConfig,
	stream: StreamService,
	snapshot: SnapshotService,
	event_bus: EventBus,
}

impl OrderSync {
	pub fn new(
		session: SessionConfig,
		stream: StreamService,
		snapshot: SnapshotService,
		event_bus: EventBus,
	) -> Self {
		Self {
			session,
			stream,
			snapshot,
			event_bus,
		}
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Returns the session context.
	pub fn session(&self) -> &SessionConfig {
		&self.session
	}

	/// Creates the command channel of a session.
	///
	/// Pass the receiver to `run`; the handle may be cloned freely.
	pub fn handle(&self) -> (SessionHandle, mpsc::Receiver<SessionCommand>) {
		let (commands, receiver) = mpsc::channel(self.session.command_buffer);
		let handle = SessionHandle {
			commands,
			event_bus: self.event_bus.clone(),
		};
		(handle, receiver)
	}

	/// Submits a new order on behalf of the session's merchant.
	///
	/// The order is not added locally; it shows up through the live channel
	/// or the next snapshot.
	pub async fn create_order(&self, mut request: CreateOrderRequest) -> Result<(), EngineError> {
		if request.merchant_name.is_none() {
			request.merchant_name = self.session.merchant_name.clone();
		}

		self.snapshot
			.create_order(&request)
			.await
			.map_err(|e| EngineError::Service(e.user_message()))
	}

	/// Runs the session until shutdown.
	///
	/// Returns after `Shutdown` or once every handle is dropped, with the
	/// live channel closed.
	pub async fn run(&self, mut commands: mpsc::Receiver<SessionCommand>) {
		let domain = self.load_statuses().await;

		let mut filter = self.session.initial_filter.clone();
		if !filter.is_within(&domain) {
			tracing::warn!(filter = %filter, "Initial filter is not a known status, using ACTIVE");
			self.publish(SyncEvent::FilterRejected {
				filter,
				reason: "not a known order status".to_string(),
			});
			filter = StatusFilter::Active;
		}

		let orders = self.load(&filter).await;
		let mut state = SessionState {
			filter,
			domain,
			orders,
			connection: None,
		};
		self.publish_collection(&state);

		state.connection = self.open_connection().await;

		loop {
			tokio::select! {
				signal = next_signal(&mut state.connection) => {
					self.handle_signal(&mut state, signal).await;
				}

				command = commands.recv() => {
					match command {
						Some(SessionCommand::SetFilter(filter)) => {
							self.change_filter(&mut state, filter).await;
						}
						Some(SessionCommand::Reload) => {
							state.orders = self.load(&state.filter).await;
							self.publish_collection(&state);
						}
						Some(SessionCommand::Reconnect) => {
							self.reconnect(&mut state).await;
						}
						Some(SessionCommand::Shutdown) | None => break,
					}
				}
			}
		}

		if let Some(connection) = state.connection.take() {
			connection.close().await;
		}
		tracing::info!("Session ended");
	}

	async fn load_statuses(&self) -> Vec<OrderStatus> {
		match self.snapshot.statuses().await {
			Ok(statuses) => {
				tracing::info!(count = statuses.len(), "Loaded order statuses");
				self.publish(SyncEvent::StatusesLoaded {
					statuses: statuses.clone(),
				});
				statuses
			},
			Err(e) => {
				tracing::warn!("Failed to load order statuses: {}", e);
				self.publish(SyncEvent::SnapshotFailed {
					reason: format!("Failed to load statuses: {}", e),
				});
				Vec::new()
			},
		}
	}

	/// Fetches a snapshot. A failed fetch yields an empty collection.
	async fn load(&self, filter: &StatusFilter) -> Arc<OrderCollection> {
		let load = self.snapshot.load(filter).await;
		if let Some(failure) = load.failure {
			self.publish(SyncEvent::SnapshotFailed {
				reason: failure.to_string(),
			});
		}
		Arc::new(OrderCollection::from_snapshot(load.orders))
	}

	async fn change_filter(&self, state: &mut SessionState, filter: StatusFilter) {
		if !filter.is_within(&state.domain) {
			tracing::warn!(filter = %filter, "Rejecting filter outside the status domain");
			self.publish(SyncEvent::FilterRejected {
				filter,
				reason: "not a known order status".to_string(),
			});
			return;
		}

		tracing::info!(filter = %filter, "Switching status filter");
		state.orders = self.load(&filter).await;
		state.filter = filter;
		self.publish_collection(state);
	}

	async fn open_connection(&self) -> Option<Connection> {
		match self.stream.open(self.session.token.as_ref()).await {
			Ok(Some(connection)) => Some(connection),
			Ok(None) => {
				self.publish(SyncEvent::LiveUpdatesUnavailable);
				None
			},
			Err(e) => {
				tracing::warn!("Failed to open live update stream: {}", e);
				self.publish(SyncEvent::ConnectionError {
					reason: e.to_string(),
				});
				self.publish(SyncEvent::ConnectionClosed);
				None
			},
		}
	}

	async fn reconnect(&self, state: &mut SessionState) {
		if let Some(connection) = state.connection.take() {
			tracing::info!("Closing live update stream before reconnecting");
			connection.close().await;
			self.publish(SyncEvent::ConnectionClosed);
		}
		state.connection = self.open_connection().await;
	}

	async fn handle_signal(&self, state: &mut SessionState, signal: Option<ConnectionSignal>) {
		match signal {
			Some(ConnectionSignal::Opened) => {
				self.publish(SyncEvent::ConnectionOpened);
			},
			Some(ConnectionSignal::Message(raw)) => self.apply_frame(state, &raw),
			Some(ConnectionSignal::Error(reason)) => {
				tracing::warn!("Live update stream error: {}", reason);
				self.publish(SyncEvent::ConnectionError { reason });
			},
			Some(ConnectionSignal::Closed) | None => {
				if let Some(connection) = state.connection.take() {
					connection.close().await;
				}
				tracing::info!("Live updates stopped");
				self.publish(SyncEvent::ConnectionClosed);
			},
		}
	}

	/// Decodes one frame and folds it into the collection.
	///
	/// Events are merged whatever the current filter; an order outside it
	/// stays visible until the next snapshot replaces the collection.
	fn apply_frame(&self, state: &mut SessionState, raw: &str) {
		let event = match decode(raw) {
			Ok(event) => event,
			Err(e) => {
				tracing::warn!("Dropping live update frame: {}", e);
				self.publish(SyncEvent::FrameRejected {
					reason: e.to_string(),
				});
				return;
			},
		};

		let order_id = truncate_id(&event.order_id);
		match Arc::make_mut(&mut state.orders).upsert(&event) {
			ApplyOutcome::Updated { previous_status } => {
				tracing::info!(
					order_id = %order_id,
					from = %previous_status,
					to = %event.current_status,
					"Order status updated"
				);
			},
			ApplyOutcome::Inserted => {
				tracing::info!(
					order_id = %order_id,
					status = %event.current_status,
					"New order received"
				);
			},
		}

		if let StatusFilter::Status(selected) = &state.filter {
			if selected != &event.current_status {
				tracing::debug!(order_id = %order_id, "Merged order outside the current filter");
			}
		}

		self.publish_collection(state);
	}

	fn publish_collection(&self, state: &SessionState) {
		self.publish(SyncEvent::CollectionChanged {
			filter: state.filter.clone(),
			orders: state.orders.clone(),
		});
	}

	fn publish(&self, event: SyncEvent) {
		self.event_bus.publish(event).ok();
	}
}

/// Next signal of the open connection; pends forever when there is none.
async fn next_signal(connection: &mut Option<Connection>) -> Option<ConnectionSignal> {
	match connection {
		Some(connection) => connection.recv().await,
		None => std::future::pending().await,
	}
}
