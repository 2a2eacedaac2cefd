//! In-memory order store.
//!
//! Holds documents in process memory and pushes full result sets to live
//! queries after every write. Besides backing local development it doubles
//! as the injectable fake for tests: documents can be seeded directly,
//! listener errors can be emitted on demand and writes can be made to fail
//! or stall.

use crate::{
	server_now, DocumentQuery, DocumentUpdate, ListenerId, ListenerSet, OrderStoreInterface,
	StoreError, StoreFactory, StoreNotification, StoreRegistry,
};
use async_trait::async_trait;
use orderdesk_types::{ConfigSchema, Fields, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

type Collections = HashMap<String, HashMap<String, Fields>>;

/// In-memory store implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
	collections: Arc<RwLock<Collections>>,
	listeners: ListenerSet,
	/// Error returned by every update while set.
	update_failure: Arc<Mutex<Option<StoreError>>>,
	/// Artificial latency applied before every update.
	update_delay: Arc<Mutex<Option<Duration>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a document and notifies listeners.
	///
	/// A missing `createdAt` field is filled with the server time, as a real
	/// store would on creation. Returns the document id, generated when `id`
	/// is `None`.
	pub async fn insert_document(
		&self,
		collection: &str,
		id: Option<&str>,
		mut fields: Fields,
	) -> String {
		let id = id
			.map(str::to_string)
			.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
		fields
			.entry("createdAt")
			.or_insert_with(|| serde_json::Value::String(server_now()));

		let mut collections = self.collections.write().await;
		collections
			.entry(collection.to_string())
			.or_default()
			.insert(id.clone(), fields);
		Self::notify(&self.listeners, &collections, collection).await;
		id
	}

	/// Deletes a document and notifies listeners. Returns whether it existed.
	pub async fn delete_document(&self, collection: &str, id: &str) -> bool {
		let mut collections = self.collections.write().await;
		let removed = collections
			.get_mut(collection)
			.and_then(|docs| docs.remove(id))
			.is_some();
		if removed {
			Self::notify(&self.listeners, &collections, collection).await;
		}
		removed
	}

	/// Returns a copy of a document's fields.
	pub async fn document(&self, collection: &str, id: &str) -> Option<Fields> {
		let collections = self.collections.read().await;
		collections.get(collection)?.get(id).cloned()
	}

	/// Pushes an error to every live query, as a dropped connection would.
	pub async fn emit_error(&self, error: StoreError) {
		self.listeners.notify_error(error).await;
	}

	/// Makes every following update fail with `error` until cleared with `None`.
	pub async fn fail_updates_with(&self, error: Option<StoreError>) {
		*self.update_failure.lock().await = error;
	}

	/// Delays every following update by `delay` until cleared with `None`.
	pub async fn set_update_delay(&self, delay: Option<Duration>) {
		*self.update_delay.lock().await = delay;
	}

	pub async fn listener_count(&self) -> usize {
		self.listeners.len().await
	}

	async fn notify(listeners: &ListenerSet, collections: &Collections, collection: &str) {
		let empty = HashMap::new();
		let docs = collections.get(collection).unwrap_or(&empty);
		listeners
			.notify_collection(collection, |query| query.run(docs))
			.await;
	}
}

#[async_trait]
impl OrderStoreInterface for MemoryStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStoreSchema)
	}

	async fn listen(
		&self,
		query: &DocumentQuery,
		sender: mpsc::UnboundedSender<StoreNotification>,
	) -> Result<ListenerId, StoreError> {
		// Holding the read lock keeps writes from slipping between the
		// initial result set and registration
		let collections = self.collections.read().await;
		let initial = match collections.get(&query.collection) {
			Some(docs) => query.run(docs),
			None => Vec::new(),
		};
		let id = self
			.listeners
			.register(query.clone(), sender, initial)
			.await;
		tracing::debug!(listener = id.0, collection = %query.collection, "Registered listener");
		Ok(id)
	}

	async fn unlisten(&self, listener: ListenerId) -> Result<(), StoreError> {
		self.listeners.remove(listener).await;
		Ok(())
	}

	async fn update_document(
		&self,
		collection: &str,
		id: &str,
		update: DocumentUpdate,
	) -> Result<(), StoreError> {
		let delay = *self.update_delay.lock().await;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		if let Some(error) = self.update_failure.lock().await.clone() {
			return Err(error);
		}

		let mut collections = self.collections.write().await;
		let fields = collections
			.get_mut(collection)
			.and_then(|docs| docs.get_mut(id))
			.ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;
		update.apply_to(fields, &server_now());
		Self::notify(&self.listeners, &collections, collection).await;
		Ok(())
	}
}

/// Configuration schema for MemoryStore.
pub struct MemoryStoreSchema;

impl ConfigSchema for MemoryStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// No options
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory store from configuration.
pub fn create_store(config: &toml::Value) -> Result<Box<dyn OrderStoreInterface>, StoreError> {
	MemoryStoreSchema
		.validate(config)
		.map_err(|e| StoreError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStore::new()))
}

/// Registry for the memory store implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StoreFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl StoreRegistry for Registry {}
