//! Order state synchronization core.
//!
//! Reconciles an authoritative snapshot of orders with the stream of live
//! update events, while the selected status filter decides which snapshot
//! is authoritative. The session runs on a single task and publishes every
//! change on an event bus for observers such as a table view.

use thiserror::Error;

pub mod builder;
pub mod event_bus;
pub mod events;
pub mod reconciler;
pub mod session;

pub use builder::{BuilderError, TrackerBuilder, TrackerFactories};
pub use event_bus::EventBus;
pub use events::SyncEvent;
pub use reconciler::{apply, ApplyOutcome, OrderCollection};
pub use session::{OrderSync, SessionCommand, SessionHandle};

/// Errors that can occur while interacting with a session.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Service error: {0}")]
	Service(String),
	/// The session task has ended and no longer accepts commands.
	#[error("Session closed")]
	SessionClosed,
}
