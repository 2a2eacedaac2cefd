//! In-process broadcast of dashboard events.

use orderdesk_types::DeskEvent;
use tokio::sync::broadcast;

/// Broadcast channel for [`DeskEvent`]s.
///
/// Cloning the bus yields another handle to the same channel. Slow
/// subscribers lag rather than block publishers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<DeskEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DeskEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Fails only when nobody is subscribed.
	pub fn publish(&self, event: DeskEvent) -> Result<(), broadcast::error::SendError<DeskEvent>> {
		self.sender.send(event).map(|_| ())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderdesk_types::SyncEvent;

	#[tokio::test]
	async fn test_publish_reaches_every_subscriber() {
		let bus = EventBus::new(8);
		assert!(bus
			.publish(DeskEvent::Sync(SyncEvent::SubscriptionFailed {
				message: "nobody listening".into()
			}))
			.is_err());

		let mut first = bus.subscribe();
		let mut second = bus.clone().subscribe();
		bus.publish(DeskEvent::Sync(SyncEvent::SnapshotReplaced {
			version: 1,
			order_count: 3,
		}))
		.unwrap();

		for rx in [&mut first, &mut second] {
			match rx.recv().await.unwrap() {
				DeskEvent::Sync(SyncEvent::SnapshotReplaced { version, order_count }) => {
					assert_eq!((version, order_count), (1, 3));
				},
				other => panic!("unexpected event {:?}", other),
			}
		}
	}
}
