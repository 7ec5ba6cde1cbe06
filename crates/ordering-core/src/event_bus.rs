//! Event bus for session events.
//!
//! Background tasks publish here instead of touching session state. Each
//! subscriber gets its own copy of every event published after it subscribed.

use ordering_types::SessionEvent;
use tokio::sync::broadcast;

/// Broadcast channel of [`SessionEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
	/// Creates an event bus that buffers up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event. Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: SessionEvent,
	) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
		self.sender.send(event)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.sender.subscribe()
	}
}
