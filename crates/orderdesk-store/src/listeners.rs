//! Bookkeeping for live query listeners.

use crate::{Document, DocumentQuery, ListenerId, StoreError, StoreNotification};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

struct Listener {
	query: DocumentQuery,
	sender: mpsc::UnboundedSender<StoreNotification>,
}

/// Registered live queries of one backend.
///
/// Listeners whose receiving side has been dropped are pruned on the next
/// notification, so an engine that goes away without unlistening does not
/// leak.
#[derive(Clone, Default)]
pub struct ListenerSet {
	listeners: Arc<Mutex<HashMap<ListenerId, Listener>>>,
	next_id: Arc<AtomicU64>,
}

impl ListenerSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a listener and sends it its initial result set.
	pub async fn register(
		&self,
		query: DocumentQuery,
		sender: mpsc::UnboundedSender<StoreNotification>,
		initial: Vec<Document>,
	) -> ListenerId {
		let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
		let mut listeners = self.listeners.lock().await;
		// A closed receiver here means the caller already gave up; it is pruned later
		let _ = sender.send(StoreNotification::Snapshot(initial));
		listeners.insert(id, Listener { query, sender });
		id
	}

	pub async fn remove(&self, id: ListenerId) -> bool {
		self.listeners.lock().await.remove(&id).is_some()
	}

	/// Sends a fresh result set to every listener on `collection`.
	pub async fn notify_collection<F>(&self, collection: &str, run_query: F)
	where
		F: Fn(&DocumentQuery) -> Vec<Document>,
	{
		let mut listeners = self.listeners.lock().await;
		listeners.retain(|id, listener| {
			if listener.query.collection != collection {
				return !listener.sender.is_closed();
			}
			let delivered = listener
				.sender
				.send(StoreNotification::Snapshot(run_query(&listener.query)))
				.is_ok();
			if !delivered {
				tracing::debug!(listener = id.0, "Pruned closed listener");
			}
			delivered
		});
	}

	/// Sends a fresh result set to every listener regardless of collection.
	pub async fn notify_all<F>(&self, run_query: F)
	where
		F: Fn(&DocumentQuery) -> Vec<Document>,
	{
		let mut listeners = self.listeners.lock().await;
		listeners.retain(|_, listener| {
			listener
				.sender
				.send(StoreNotification::Snapshot(run_query(&listener.query)))
				.is_ok()
		});
	}

	/// Reports an error to every listener.
	pub async fn notify_error(&self, error: StoreError) {
		let mut listeners = self.listeners.lock().await;
		listeners.retain(|_, listener| {
			listener
				.sender
				.send(StoreNotification::Error(error.clone()))
				.is_ok()
		});
	}

	pub async fn len(&self) -> usize {
		self.listeners.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_register_sends_initial_and_prunes_closed() {
		let set = ListenerSet::new();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let id = set
			.register(DocumentQuery::orders_by_creation("orders"), tx, Vec::new())
			.await;
		assert!(matches!(rx.recv().await, Some(StoreNotification::Snapshot(docs)) if docs.is_empty()));
		assert_eq!(set.len().await, 1);

		drop(rx);
		set.notify_collection("orders", |_| Vec::new()).await;
		assert!(set.is_empty().await);
		assert!(!set.remove(id).await);
	}

	#[tokio::test]
	async fn test_notify_only_matching_collection() {
		let set = ListenerSet::new();
		let (tx, mut rx) = mpsc::unbounded_channel();
		set.register(DocumentQuery::orders_by_creation("orders"), tx, Vec::new())
			.await;
		let _ = rx.recv().await;

		set.notify_collection("customers", |_| Vec::new()).await;
		assert!(rx.try_recv().is_err());

		set.notify_error(StoreError::Unavailable("offline".into()))
			.await;
		assert!(matches!(
			rx.try_recv(),
			Ok(StoreNotification::Error(StoreError::Unavailable(_)))
		));
	}
}
