//! Broadcast channel carrying session events to observers.

use crate::events::SyncEvent;
use tokio::sync::broadcast;

/// Fan-out of `SyncEvent`s to any number of subscribers.
///
/// Publishing never blocks. A slow subscriber that falls more than
/// `capacity` events behind receives `RecvError::Lagged` and skips ahead;
/// the next `CollectionChanged` carries the full collection again.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to all events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: SyncEvent,
	) -> Result<usize, broadcast::error::SendError<SyncEvent>> {
		self.sender.send(event)
	}
}
