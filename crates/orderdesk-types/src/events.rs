//! Event types for in-process change notification.
//!
//! Events flow through the dashboard's event bus so that presentation
//! collaborators can re-derive their views when the snapshot changes instead
//! of polling the engine.

use crate::OrderStatus;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all dashboard events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeskEvent {
	/// Events from the sync engine.
	Sync(SyncEvent),
	/// Events from the mutation gateway.
	Mutation(MutationEvent),
}

/// Events related to the live order subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
	/// The snapshot has been replaced by a new delivery.
	SnapshotReplaced { version: u64, order_count: usize },
	/// The subscription reported an error; the last snapshot is retained.
	SubscriptionFailed { message: String },
}

/// Events related to status mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MutationEvent {
	/// The store acknowledged a status write. The snapshot may not reflect it yet.
	StatusUpdated {
		order_id: String,
		status: OrderStatus,
	},
	/// A status write was rejected or timed out.
	StatusUpdateFailed { order_id: String, error: String },
}
