//! Events published by a synchronization session.

use crate::reconciler::OrderCollection;
use std::sync::Arc;
use tracker_types::{OrderStatus, StatusFilter};

/// Something an observer of the session may want to react to.
#[derive(Debug, Clone)]
pub enum SyncEvent {
	/// The collection was replaced by a snapshot or changed by a live event.
	CollectionChanged {
		filter: StatusFilter,
		orders: Arc<OrderCollection>,
	},
	/// The status domain was fetched.
	StatusesLoaded { statuses: Vec<OrderStatus> },
	/// A snapshot or status request failed; the affected data is empty.
	SnapshotFailed { reason: String },
	ConnectionOpened,
	/// Non-fatal connection problem.
	ConnectionError { reason: String },
	/// The live channel is gone until a reconnect.
	ConnectionClosed,
	/// The session has no token, so no live channel was opened.
	LiveUpdatesUnavailable,
	/// A frame could not be decoded and was dropped.
	FrameRejected { reason: String },
	/// A requested filter was refused; the previous one stays active.
	FilterRejected { filter: StatusFilter, reason: String },
}
