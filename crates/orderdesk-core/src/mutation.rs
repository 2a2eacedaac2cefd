//! Status writes to the remote store.
//!
//! The gateway never touches the local snapshot. An acknowledged write shows
//! up in the snapshot only when the live query delivers the change, which may
//! happen before or after `update_status` returns.

use crate::engine::event_bus::EventBus;
use orderdesk_store::{DocumentUpdate, OrderStoreInterface, StoreError};
use orderdesk_types::{truncate_id, DeskEvent, MutationEvent, OrderStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a status write.
#[derive(Debug, Clone, Error)]
pub enum MutationError {
	/// The write was rejected, timed out or addressed an unknown order.
	#[error("Failed to update order {order_id}: {cause}")]
	MutationFailed { order_id: String, cause: StoreError },
}

impl MutationError {
	pub fn cause(&self) -> &StoreError {
		match self {
			MutationError::MutationFailed { cause, .. } => cause,
		}
	}
}

/// Issues point updates of an order's status.
///
/// Calls are independent and may run concurrently. Two writes to the same
/// order race at the store, where the last applied one wins.
pub struct MutationGateway {
	store: Arc<dyn OrderStoreInterface>,
	collection: String,
	timeout: Duration,
	event_bus: EventBus,
}

impl MutationGateway {
	pub fn new(
		store: Arc<dyn OrderStoreInterface>,
		collection: impl Into<String>,
		timeout: Duration,
		event_bus: EventBus,
	) -> Self {
		Self {
			store,
			collection: collection.into(),
			timeout,
			event_bus,
		}
	}

	/// Sets `status` and a server-side `updatedAt` on one order.
	///
	/// Returns once the store acknowledges the write. There is no retry.
	pub async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
	) -> Result<(), MutationError> {
		let update = DocumentUpdate::new()
			.set("status", status.as_str())
			.server_timestamp("updatedAt");

		let write = self
			.store
			.update_document(&self.collection, order_id, update);
		let result = match tokio::time::timeout(self.timeout, write).await {
			Ok(result) => result,
			Err(_) => Err(StoreError::Unavailable(format!(
				"timed out after {:?}",
				self.timeout
			))),
		};

		match result {
			Ok(()) => {
				tracing::info!(order_id = %truncate_id(order_id), status = %status, "Order status updated");
				self.event_bus
					.publish(DeskEvent::Mutation(MutationEvent::StatusUpdated {
						order_id: order_id.to_string(),
						status,
					}))
					.ok();
				Ok(())
			},
			Err(cause) => {
				tracing::warn!(order_id = %truncate_id(order_id), status = %status, error = %cause, "Order status update failed");
				self.event_bus
					.publish(DeskEvent::Mutation(MutationEvent::StatusUpdateFailed {
						order_id: order_id.to_string(),
						error: cause.to_string(),
					}))
					.ok();
				Err(MutationError::MutationFailed {
					order_id: order_id.to_string(),
					cause,
				})
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{fields_of, order};
	use orderdesk_store::implementations::memory::MemoryStore;
	use orderdesk_types::OrderType;
	use serde_json::json;

	async fn seeded() -> (MemoryStore, MutationGateway, EventBus) {
		let store = MemoryStore::new();
		let a = order("A", "2024-03-01T09:00:00Z", OrderStatus::Pending, OrderType::Retail, 500);
		store
			.insert_document("orders", Some("A"), fields_of(&a))
			.await;
		let bus = EventBus::new(16);
		let gateway = MutationGateway::new(
			Arc::new(store.clone()),
			"orders",
			Duration::from_secs(5),
			bus.clone(),
		);
		(store, gateway, bus)
	}

	#[tokio::test]
	async fn test_update_writes_status_and_timestamp() {
		let (store, gateway, bus) = seeded().await;
		let mut events = bus.subscribe();

		gateway
			.update_status("A", OrderStatus::Delivered)
			.await
			.unwrap();

		let fields = store.document("orders", "A").await.unwrap();
		assert_eq!(fields["status"], json!("delivered"));
		assert!(fields["updatedAt"].is_string());
		assert_eq!(fields["fullName"], json!("Customer A"));
		assert!(matches!(
			events.try_recv().unwrap(),
			DeskEvent::Mutation(MutationEvent::StatusUpdated { status: OrderStatus::Delivered, .. })
		));
	}

	#[tokio::test]
	async fn test_any_transition_is_allowed() {
		let (store, gateway, _bus) = seeded().await;
		gateway
			.update_status("A", OrderStatus::Delivered)
			.await
			.unwrap();
		gateway
			.update_status("A", OrderStatus::Pending)
			.await
			.unwrap();
		let fields = store.document("orders", "A").await.unwrap();
		assert_eq!(fields["status"], json!("pending"));
	}

	#[tokio::test]
	async fn test_unknown_order_fails() {
		let (_store, gateway, bus) = seeded().await;
		let mut events = bus.subscribe();

		let err = gateway
			.update_status("missing", OrderStatus::Shipped)
			.await
			.unwrap_err();
		assert!(matches!(err.cause(), StoreError::NotFound(_)));
		assert!(err.to_string().contains("missing"));
		assert!(matches!(
			events.try_recv().unwrap(),
			DeskEvent::Mutation(MutationEvent::StatusUpdateFailed { .. })
		));
	}

	#[tokio::test]
	async fn test_rejected_write_carries_cause() {
		let (store, gateway, _bus) = seeded().await;
		store
			.fail_updates_with(Some(StoreError::PermissionDenied("read-only".into())))
			.await;

		let err = gateway
			.update_status("A", OrderStatus::Shipped)
			.await
			.unwrap_err();
		let MutationError::MutationFailed { order_id, cause } = err;
		assert_eq!(order_id, "A");
		assert_eq!(cause, StoreError::PermissionDenied("read-only".into()));
	}

	#[tokio::test]
	async fn test_slow_write_times_out() {
		let store = MemoryStore::new();
		store
			.set_update_delay(Some(Duration::from_secs(30)))
			.await;
		let gateway = MutationGateway::new(
			Arc::new(store),
			"orders",
			Duration::from_millis(20),
			EventBus::new(4),
		);

		let err = gateway
			.update_status("A", OrderStatus::Shipped)
			.await
			.unwrap_err();
		assert!(matches!(err.cause(), StoreError::Unavailable(msg) if msg.contains("timed out")));
	}

	#[tokio::test]
	async fn test_concurrent_updates_are_independent() {
		let (store, gateway, _bus) = seeded().await;
		let b = order("B", "2024-03-02T09:00:00Z", OrderStatus::Pending, OrderType::Retail, 1);
		store
			.insert_document("orders", Some("B"), fields_of(&b))
			.await;

		let (a, b) = tokio::join!(
			gateway.update_status("A", OrderStatus::Confirmed),
			gateway.update_status("B", OrderStatus::Cancelled),
		);
		a.unwrap();
		b.unwrap();
		assert_eq!(store.document("orders", "A").await.unwrap()["status"], json!("confirmed"));
		assert_eq!(store.document("orders", "B").await.unwrap()["status"], json!("cancelled"));
	}
}
