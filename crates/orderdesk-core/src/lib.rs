//! Order synchronization and derived-view engine.
//!
//! The engine mirrors the remote orders collection into an immutable local
//! snapshot, derives filtered views and summary statistics from it, and
//! pushes status changes back to the store. The snapshot is only ever
//! replaced by a delivery from the store; status writes flow back through
//! the live query like any other change.

pub mod builder;
pub mod engine;
pub mod mutation;
pub mod sync;
pub mod views;

pub use builder::{BuilderError, DashboardBuilder};
pub use engine::{event_bus::EventBus, Dashboard, DashboardView};
pub use mutation::{MutationError, MutationGateway};
pub use sync::{SubscriptionHandle, SyncEngine, SyncError, SyncState};
pub use views::{aggregate, export_csv, export_file_name, filter_orders, OrderFilter};

#[cfg(test)]
pub(crate) mod test_support;
