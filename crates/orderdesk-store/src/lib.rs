//! Remote order store abstraction for the order desk.
//!
//! The store is a document-oriented collaborator with two primitives: a live
//! query that pushes the complete, ordered result set on every change, and a
//! partial point update keyed by document identity. Backends are pluggable
//! and selected by name from configuration.

use async_trait::async_trait;
use orderdesk_types::{ConfigSchema, Fields, ImplementationRegistry};
use thiserror::Error;
use tokio::sync::mpsc;

mod listeners;
mod query;

pub use listeners::ListenerSet;
pub use query::{Direction, DocumentQuery};

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
	/// The addressed document does not exist.
	#[error("Document not found: {0}")]
	NotFound(String),
	/// The store refused the operation.
	#[error("Permission denied: {0}")]
	PermissionDenied(String),
	/// The store could not be reached or did not answer in time.
	#[error("Store unavailable: {0}")]
	Unavailable(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A stored document: identity plus schemaless fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	pub id: String,
	pub fields: Fields,
}

/// Value written by a [`DocumentUpdate`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	/// A literal JSON value.
	Value(serde_json::Value),
	/// Replaced by the store's own clock when the write is applied.
	ServerTimestamp,
}

/// Partial update of a single document. Fields not named are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
	fields: Vec<(String, FieldValue)>,
}

impl DocumentUpdate {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.fields
			.push((field.into(), FieldValue::Value(value.into())));
		self
	}

	pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
		self.fields.push((field.into(), FieldValue::ServerTimestamp));
		self
	}

	pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.fields.iter().map(|(name, value)| (name.as_str(), value))
	}

	/// Applies the update to a field map using `now` for server timestamps.
	pub fn apply_to(&self, target: &mut Fields, now: &str) {
		for (name, value) in &self.fields {
			let value = match value {
				FieldValue::Value(v) => v.clone(),
				FieldValue::ServerTimestamp => serde_json::Value::String(now.to_string()),
			};
			target.insert(name.clone(), value);
		}
	}
}

/// Notification pushed to a live query listener.
#[derive(Debug, Clone)]
pub enum StoreNotification {
	/// The complete current result set, in query order.
	Snapshot(Vec<Document>),
	/// The listener hit a transport or permission fault.
	Error(StoreError),
}

/// Identity of a registered live query listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Trait defining the interface for remote order store backends.
#[async_trait]
pub trait OrderStoreInterface: Send + Sync {
	/// Returns the configuration schema for this backend.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Registers a live query.
	///
	/// The backend sends the current result set promptly after registration and
	/// a complete result set after every change. Notifications for one listener
	/// are never sent concurrently.
	async fn listen(
		&self,
		query: &DocumentQuery,
		sender: mpsc::UnboundedSender<StoreNotification>,
	) -> Result<ListenerId, StoreError>;

	/// Removes a live query. Removing an unknown listener is not an error.
	async fn unlisten(&self, listener: ListenerId) -> Result<(), StoreError>;

	/// Applies a partial update to one document.
	///
	/// Returns only after the write has been acknowledged.
	async fn update_document(
		&self,
		collection: &str,
		id: &str,
		update: DocumentUpdate,
	) -> Result<(), StoreError>;
}

/// Type alias for store factory functions.
pub type StoreFactory = fn(&toml::Value) -> Result<Box<dyn OrderStoreInterface>, StoreError>;

/// Registry trait for store implementations.
pub trait StoreRegistry: ImplementationRegistry<Factory = StoreFactory> {}

/// Get all registered store implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StoreFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Current time in the format used for server timestamps.
pub(crate) fn server_now() -> String {
	chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
