//! Dashboard facade over the sync engine, derived views and mutation gateway.
//!
//! Presentation collaborators talk to a [`Dashboard`]: they start and stop
//! the live query, read views for their current filter criteria, and submit
//! status changes. Views are recomputed from one consistent snapshot per
//! call.

pub mod event_bus;

use crate::mutation::{MutationError, MutationGateway};
use crate::sync::{SubscriptionHandle, SyncEngine, SyncError, SyncState};
use crate::views::{aggregate, export_csv, filter_orders};
use event_bus::EventBus;
use orderdesk_store::OrderStoreInterface;
use orderdesk_types::{FilterCriteria, Order, OrderStats, OrderStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Filtered view of one snapshot, with the status needed to render it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
	pub orders: Vec<Order>,
	/// Number of orders after filtering.
	pub shown: usize,
	/// Number of orders in the snapshot.
	pub total: usize,
	pub loading: bool,
	pub error: Option<String>,
	pub version: u64,
}

/// Engine instance serving one desk.
pub struct Dashboard {
	sync: SyncEngine,
	mutation: MutationGateway,
	event_bus: EventBus,
	handle: Mutex<Option<SubscriptionHandle>>,
}

impl Dashboard {
	pub fn new(
		store: Arc<dyn OrderStoreInterface>,
		collection: &str,
		mutation_timeout: Duration,
		event_bus: EventBus,
	) -> Self {
		Self {
			sync: SyncEngine::new(store.clone(), collection, event_bus.clone()),
			mutation: MutationGateway::new(store, collection, mutation_timeout, event_bus.clone()),
			event_bus,
			handle: Mutex::new(None),
		}
	}

	/// Starts (or restarts) the live query.
	pub async fn start(&self) -> Result<(), SyncError> {
		let mut handle = self.handle.lock().await;
		handle.take();
		*handle = Some(self.sync.start().await?);
		Ok(())
	}

	/// Stops the live query if it is running.
	pub async fn stop(&self) {
		if let Some(handle) = self.handle.lock().await.take() {
			self.sync.stop(&handle).await;
		}
	}

	pub fn snapshot(&self) -> Arc<SyncState> {
		self.sync.snapshot()
	}

	/// Orders matching `criteria` plus counts and subscription status.
	pub fn view(&self, criteria: &FilterCriteria) -> DashboardView {
		let state = self.sync.snapshot();
		let orders: Vec<Order> = filter_orders(&state.orders, criteria)
			.into_iter()
			.cloned()
			.collect();
		DashboardView {
			shown: orders.len(),
			total: state.orders.len(),
			orders,
			loading: state.loading,
			error: state.error.clone(),
			version: state.version,
		}
	}

	/// Statistics over the whole snapshot, ignoring any filter.
	pub fn stats(&self) -> OrderStats {
		aggregate(&self.sync.snapshot().orders)
	}

	pub fn order(&self, id: &str) -> Option<Order> {
		self.sync
			.snapshot()
			.orders
			.iter()
			.find(|order| order.id == id)
			.cloned()
	}

	/// CSV text of the orders matching `criteria`.
	pub fn export_csv(&self, criteria: &FilterCriteria) -> String {
		let state = self.sync.snapshot();
		export_csv(filter_orders(&state.orders, criteria))
	}

	pub async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
	) -> Result<(), MutationError> {
		self.mutation.update_status(order_id, status).await
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn sync(&self) -> &SyncEngine {
		&self.sync
	}
}
