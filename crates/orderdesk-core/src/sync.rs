//! Live synchronization of the orders collection.
//!
//! The [`SyncEngine`] owns one live query against the store and mirrors its
//! result set into an immutable [`SyncState`]. Every delivery replaces the
//! whole snapshot; readers load the current state with a single atomic
//! pointer read and never observe a partially written one.

use crate::engine::event_bus::EventBus;
use arc_swap::ArcSwap;
use orderdesk_store::{
	Document, DocumentQuery, ListenerId, OrderStoreInterface, StoreError, StoreNotification,
};
use orderdesk_types::{truncate_id, DeskEvent, Order, SyncEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that can occur while establishing the live query.
///
/// Faults reported by an established subscription are not errors of this
/// kind; they are recorded in [`SyncState::error`].
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("Failed to subscribe to orders: {0}")]
	Store(#[from] StoreError),
}

/// Immutable view of the engine's state at one point in time.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
	/// Orders in delivery order (newest first).
	pub orders: Arc<[Order]>,
	/// True from `start` until the first delivery or error.
	pub loading: bool,
	/// Display message of the last subscription fault, cleared by the next delivery.
	pub error: Option<String>,
	/// Incremented on every snapshot replacement.
	pub version: u64,
}

/// Opaque token for one started subscription.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
	generation: u64,
}

struct ActiveSubscription {
	generation: u64,
	listener: ListenerId,
	pump: JoinHandle<()>,
}

/// State shared with the delivery pump.
#[derive(Clone)]
struct Shared {
	state: Arc<ArcSwap<SyncState>>,
	/// Generation allowed to write the state; 0 when stopped.
	current: Arc<Mutex<u64>>,
	event_bus: EventBus,
}

impl Shared {
	fn current(&self) -> MutexGuard<'_, u64> {
		self.current.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Replaces the state if `generation` is still the live one and
	/// announces the new state.
	///
	/// The announcement goes out before the gate is released, so no event
	/// for this generation is published once `stop` has returned.
	fn replace_if_live<F, A>(&self, generation: u64, next: F, announce: A) -> Option<Arc<SyncState>>
	where
		F: FnOnce(&SyncState) -> SyncState,
		A: FnOnce(&SyncState) -> SyncEvent,
	{
		let current = self.current();
		if *current != generation {
			return None;
		}
		let state = Arc::new(next(&self.state.load()));
		self.state.store(state.clone());
		self.event_bus
			.publish(DeskEvent::Sync(announce(&state)))
			.ok();
		drop(current);
		Some(state)
	}
}

/// Maintains the local snapshot of the orders collection.
pub struct SyncEngine {
	store: Arc<dyn OrderStoreInterface>,
	query: DocumentQuery,
	shared: Shared,
	next_generation: AtomicU64,
	active: tokio::sync::Mutex<Option<ActiveSubscription>>,
}

impl SyncEngine {
	pub fn new(store: Arc<dyn OrderStoreInterface>, collection: &str, event_bus: EventBus) -> Self {
		Self {
			store,
			query: DocumentQuery::orders_by_creation(collection),
			shared: Shared {
				state: Arc::new(ArcSwap::from_pointee(SyncState::default())),
				current: Arc::new(Mutex::new(0)),
				event_bus,
			},
			next_generation: AtomicU64::new(0),
			active: tokio::sync::Mutex::new(None),
		}
	}

	/// Starts the live query, stopping any subscription already running.
	///
	/// The snapshot is emptied and `loading` is set until the store answers.
	pub async fn start(&self) -> Result<SubscriptionHandle, SyncError> {
		let mut active = self.active.lock().await;
		if let Some(previous) = active.take() {
			self.release(previous).await;
		}

		let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
		{
			let mut current = self.shared.current();
			*current = generation;
			let version = self.shared.state.load().version;
			self.shared.state.store(Arc::new(SyncState {
				orders: Arc::from(Vec::new()),
				loading: true,
				error: None,
				version,
			}));
		}

		let (sender, receiver) = mpsc::unbounded_channel();
		let listener = match self.store.listen(&self.query, sender).await {
			Ok(listener) => listener,
			Err(e) => {
				tracing::warn!(collection = %self.query.collection, error = %e, "Failed to subscribe to orders");
				let message = fetch_error_message(&e);
				self.shared.replace_if_live(
					generation,
					|prev| SyncState {
						orders: prev.orders.clone(),
						loading: false,
						error: Some(message.clone()),
						version: prev.version,
					},
					|_| SyncEvent::SubscriptionFailed {
						message: message.clone(),
					},
				);
				*self.shared.current() = 0;
				return Err(SyncError::Store(e));
			},
		};

		let pump = tokio::spawn(pump(receiver, generation, self.shared.clone()));
		*active = Some(ActiveSubscription {
			generation,
			listener,
			pump,
		});
		tracing::info!(collection = %self.query.collection, listener = listener.0, "Started order subscription");

		Ok(SubscriptionHandle { generation })
	}

	/// Releases the subscription identified by `handle`.
	///
	/// No delivery or error is applied once this returns. Stopping a handle
	/// that is no longer active does nothing.
	pub async fn stop(&self, handle: &SubscriptionHandle) {
		let mut active = self.active.lock().await;
		match active.as_ref() {
			Some(subscription) if subscription.generation == handle.generation => {},
			_ => {
				tracing::debug!("Subscription already stopped");
				return;
			},
		}
		if let Some(subscription) = active.take() {
			self.release(subscription).await;
		}
	}

	pub async fn is_running(&self) -> bool {
		self.active.lock().await.is_some()
	}

	async fn release(&self, subscription: ActiveSubscription) {
		// Close the gate first so an in-flight delivery cannot land
		*self.shared.current() = 0;
		subscription.pump.abort();
		if let Err(e) = self.store.unlisten(subscription.listener).await {
			tracing::warn!(listener = subscription.listener.0, error = %e, "Failed to release order listener");
		}
		tracing::info!(collection = %self.query.collection, "Stopped order subscription");
	}

	/// Current state; cheap to call on every read.
	pub fn snapshot(&self) -> Arc<SyncState> {
		self.shared.state.load_full()
	}

	pub fn orders(&self) -> Arc<[Order]> {
		self.shared.state.load().orders.clone()
	}

	pub fn is_loading(&self) -> bool {
		self.shared.state.load().loading
	}

	pub fn last_error(&self) -> Option<String> {
		self.shared.state.load().error.clone()
	}
}

impl Drop for SyncEngine {
	fn drop(&mut self) {
		*self.shared.current() = 0;
		let Some(subscription) = self.active.get_mut().take() else {
			return;
		};
		subscription.pump.abort();

		let listener = subscription.listener;
		match tokio::runtime::Handle::try_current() {
			Ok(runtime) => {
				let store = self.store.clone();
				runtime.spawn(async move {
					if let Err(e) = store.unlisten(listener).await {
						tracing::warn!(listener = listener.0, error = %e, "Failed to release order listener");
					}
				});
			},
			Err(_) => {
				tracing::warn!(listener = listener.0, "No runtime to release order listener on drop");
			},
		}
	}
}

/// Applies store notifications to the state until the channel closes.
async fn pump(
	mut receiver: mpsc::UnboundedReceiver<StoreNotification>,
	generation: u64,
	shared: Shared,
) {
	while let Some(notification) = receiver.recv().await {
		match notification {
			StoreNotification::Snapshot(documents) => {
				let orders: Arc<[Order]> = decode(documents).into();
				let replaced = shared.replace_if_live(
					generation,
					|prev| SyncState {
						orders,
						loading: false,
						error: None,
						version: prev.version + 1,
					},
					|state| SyncEvent::SnapshotReplaced {
						version: state.version,
						order_count: state.orders.len(),
					},
				);
				match replaced {
					Some(state) => {
						tracing::debug!(version = state.version, orders = state.orders.len(), "Replaced order snapshot");
					},
					None => break,
				}
			},
			StoreNotification::Error(e) => {
				let message = fetch_error_message(&e);
				let replaced = shared.replace_if_live(
					generation,
					|prev| SyncState {
						orders: prev.orders.clone(),
						loading: false,
						error: Some(message.clone()),
						version: prev.version,
					},
					|_| SyncEvent::SubscriptionFailed {
						message: message.clone(),
					},
				);
				if replaced.is_none() {
					break;
				}
				tracing::warn!(error = %e, "Order subscription reported an error");
			},
		}
	}
}

/// Decodes documents in delivery order, skipping malformed ones.
fn decode(documents: Vec<Document>) -> Vec<Order> {
	documents
		.into_iter()
		.filter_map(|doc| match Order::from_fields(&doc.id, doc.fields) {
			Ok(order) => Some(order),
			Err(e) => {
				tracing::warn!(order_id = %truncate_id(&doc.id), error = %e, "Skipping malformed order document");
				None
			},
		})
		.collect()
}

fn fetch_error_message(error: &StoreError) -> String {
	format!("Failed to fetch orders: {}", error)
}
