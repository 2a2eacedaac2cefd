//! JSON file order store.
//!
//! All collections live in a single JSON document shaped as
//! `{ "<collection>": { "<id>": { ...fields } } }`. Updates rewrite the file
//! atomically through a temporary file. Edits made by other processes are
//! picked up by polling the file's metadata while at least one live query is
//! registered.

use crate::{
	server_now, DocumentQuery, DocumentUpdate, ListenerId, ListenerSet, OrderStoreInterface,
	StoreError, StoreFactory, StoreNotification, StoreRegistry,
};
use async_trait::async_trait;
use orderdesk_types::{
	ConfigSchema, Field, FieldType, Fields, ImplementationRegistry, Schema, ValidationError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type Collections = HashMap<String, HashMap<String, Fields>>;

/// Modification time and length of the backing file, `None` when absent.
type Fingerprint = Option<(SystemTime, u64)>;

const DEFAULT_PATH: &str = "./data/orders.json";
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// File-backed store implementation.
pub struct FileStore {
	path: PathBuf,
	poll_interval: Duration,
	listeners: ListenerSet,
	/// Last fingerprint pushed to listeners. Holding the lock serializes
	/// writes, registrations and change detection.
	seen: Arc<Mutex<Fingerprint>>,
	watcher: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl FileStore {
	pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
		Self {
			path: path.into(),
			poll_interval,
			listeners: ListenerSet::new(),
			seen: Arc::new(Mutex::new(None)),
			watcher: std::sync::Mutex::new(None),
		}
	}

	/// Starts the change watcher unless it is already running.
	fn ensure_watcher(&self) {
		let mut watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
		if watcher.is_none() {
			tracing::debug!(path = %self.path.display(), interval_ms = self.poll_interval.as_millis() as u64, "Starting file watcher");
			*watcher = Some(tokio::spawn(watch(
				self.path.clone(),
				self.poll_interval,
				self.listeners.clone(),
				self.seen.clone(),
			)));
		}
	}
}

impl Drop for FileStore {
	fn drop(&mut self) {
		let watcher = self.watcher.get_mut().unwrap_or_else(|e| e.into_inner());
		if let Some(handle) = watcher.take() {
			handle.abort();
		}
	}
}

#[async_trait]
impl OrderStoreInterface for FileStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStoreSchema)
	}

	async fn listen(
		&self,
		query: &DocumentQuery,
		sender: mpsc::UnboundedSender<StoreNotification>,
	) -> Result<ListenerId, StoreError> {
		self.ensure_watcher();

		let mut seen = self.seen.lock().await;
		let data = load(&self.path).await?;
		*seen = fingerprint(&self.path).await;
		let initial = run_on(query, &data);
		Ok(self.listeners.register(query.clone(), sender, initial).await)
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
		let mut seen = self.seen.lock().await;
		let mut data = load(&self.path).await?;
		let fields = data
			.get_mut(collection)
			.and_then(|docs| docs.get_mut(id))
			.ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;
		update.apply_to(fields, &server_now());

		save(&self.path, &data).await?;
		*seen = fingerprint(&self.path).await;
		tracing::debug!(collection, id, "Updated document");

		self.listeners
			.notify_collection(collection, |query| run_on(query, &data))
			.await;
		Ok(())
	}
}

/// Polls the file and pushes result sets to every listener when it changes.
async fn watch(
	path: PathBuf,
	interval: Duration,
	listeners: ListenerSet,
	seen: Arc<Mutex<Fingerprint>>,
) {
	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

	loop {
		ticker.tick().await;
		if listeners.is_empty().await {
			continue;
		}

		let mut seen = seen.lock().await;
		let current = fingerprint(&path).await;
		if current == *seen {
			continue;
		}
		*seen = current;

		match load(&path).await {
			Ok(data) => {
				tracing::debug!(path = %path.display(), "Detected external change");
				listeners.notify_all(|query| run_on(query, &data)).await;
			},
			Err(e) => {
				tracing::warn!(path = %path.display(), error = %e, "Failed to reload order file");
				listeners.notify_error(e).await;
			},
		}
	}
}

fn run_on(query: &DocumentQuery, data: &Collections) -> Vec<crate::Document> {
	match data.get(&query.collection) {
		Some(docs) => query.run(docs),
		None => Vec::new(),
	}
}

/// Reads all collections. A missing or blank file holds no documents.
async fn load(path: &Path) -> Result<Collections, StoreError> {
	let content = match fs::read_to_string(path).await {
		Ok(content) => content,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Collections::new()),
		Err(e) => return Err(io_error(path, e)),
	};
	if content.trim().is_empty() {
		return Ok(Collections::new());
	}
	serde_json::from_str(&content).map_err(|e| {
		StoreError::Serialization(format!("Invalid order file {}: {}", path.display(), e))
	})
}

/// Writes all collections through a temporary file and a rename.
async fn save(path: &Path, data: &Collections) -> Result<(), StoreError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| io_error(parent, e))?;
		}
	}

	let bytes =
		serde_json::to_vec_pretty(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
	let temp_path = path.with_extension("tmp");
	fs::write(&temp_path, bytes)
		.await
		.map_err(|e| io_error(&temp_path, e))?;
	fs::rename(&temp_path, path)
		.await
		.map_err(|e| io_error(path, e))
}

async fn fingerprint(path: &Path) -> Fingerprint {
	let metadata = fs::metadata(path).await.ok()?;
	Some((metadata.modified().ok()?, metadata.len()))
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
	let message = format!("{}: {}", path.display(), e);
	match e.kind() {
		std::io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(message),
		_ => StoreError::Backend(message),
	}
}

/// Configuration schema for FileStore.
pub struct FileStoreSchema;

impl ConfigSchema for FileStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if !path.trim().is_empty() => Ok(()),
						_ => Err("path cannot be empty".to_string()),
					}
				}),
				Field::new(
					"poll_interval_ms",
					FieldType::Integer {
						min: Some(10),
						max: Some(60_000),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file store from configuration.
///
/// Configuration parameters:
/// - `path`: JSON file holding all collections (default: "./data/orders.json")
/// - `poll_interval_ms`: how often to check for external edits (default: 500)
pub fn create_store(config: &toml::Value) -> Result<Box<dyn OrderStoreInterface>, StoreError> {
	FileStoreSchema
		.validate(config)
		.map_err(|e| StoreError::Configuration(e.to_string()))?;

	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_PATH);
	let poll_interval_ms = config
		.get("poll_interval_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_POLL_INTERVAL_MS);

	Ok(Box::new(FileStore::new(
		path,
		Duration::from_millis(poll_interval_ms),
	)))
}

/// Registry for the file store implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StoreFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl StoreRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Document;
	use serde_json::json;
	use tempfile::TempDir;

	fn seed(path: &Path, value: serde_json::Value) {
		std::fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
	}

	async fn next_snapshot(
		rx: &mut mpsc::UnboundedReceiver<StoreNotification>,
	) -> Vec<Document> {
		let notification = tokio::time::timeout(Duration::from_secs(5), rx.recv())
			.await
			.unwrap();
		match notification {
			Some(StoreNotification::Snapshot(docs)) => docs,
			other => panic!("expected snapshot, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_missing_file_is_empty() {
		let temp_dir = TempDir::new().unwrap();
		let store = FileStore::new(temp_dir.path().join("orders.json"), Duration::from_millis(10));

		let (tx, mut rx) = mpsc::unbounded_channel();
		store
			.listen(&DocumentQuery::orders_by_creation("orders"), tx)
			.await
			.unwrap();
		assert!(next_snapshot(&mut rx).await.is_empty());
	}

	#[tokio::test]
	async fn test_update_persists_and_notifies() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("orders.json");
		seed(
			&path,
			json!({
				"orders": {
					"a": { "createdAt": "2024-03-01T08:00:00Z", "status": "pending" },
					"b": { "createdAt": "2024-03-02T08:00:00Z", "status": "pending" }
				}
			}),
		);
		let store = FileStore::new(&path, Duration::from_millis(10));

		let (tx, mut rx) = mpsc::unbounded_channel();
		store
			.listen(&DocumentQuery::orders_by_creation("orders"), tx)
			.await
			.unwrap();
		let initial = next_snapshot(&mut rx).await;
		assert_eq!(initial[0].id, "b");

		store
			.update_document(
				"orders",
				"a",
				DocumentUpdate::new()
					.set("status", "confirmed")
					.server_timestamp("updatedAt"),
			)
			.await
			.unwrap();

		let docs = next_snapshot(&mut rx).await;
		assert_eq!(docs[1].fields["status"], json!("confirmed"));

		let on_disk: serde_json::Value =
			serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
		assert_eq!(on_disk["orders"]["a"]["status"], json!("confirmed"));
		assert!(on_disk["orders"]["a"]["updatedAt"].is_string());
		assert_eq!(on_disk["orders"]["b"]["status"], json!("pending"));
	}

	#[tokio::test]
	async fn test_update_unknown_document_is_not_found() {
		let temp_dir = TempDir::new().unwrap();
		let store = FileStore::new(temp_dir.path().join("orders.json"), Duration::from_millis(10));
		let result = store
			.update_document("orders", "nope", DocumentUpdate::new().set("status", "shipped"))
			.await;
		assert!(matches!(result, Err(StoreError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_external_edit_is_detected() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("orders.json");
		seed(&path, json!({ "orders": {} }));
		let store = FileStore::new(&path, Duration::from_millis(10));

		let (tx, mut rx) = mpsc::unbounded_channel();
		store
			.listen(&DocumentQuery::orders_by_creation("orders"), tx)
			.await
			.unwrap();
		assert!(next_snapshot(&mut rx).await.is_empty());

		seed(
			&path,
			json!({
				"orders": {
					"external": { "createdAt": "2024-03-05T10:00:00Z", "status": "pending" }
				}
			}),
		);
		let docs = next_snapshot(&mut rx).await;
		assert_eq!(docs.len(), 1);
		assert_eq!(docs[0].id, "external");
	}

	#[tokio::test]
	async fn test_corrupt_file_reports_error() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("orders.json");
		seed(&path, json!({ "orders": {} }));
		let store = FileStore::new(&path, Duration::from_millis(10));

		let (tx, mut rx) = mpsc::unbounded_channel();
		store
			.listen(&DocumentQuery::orders_by_creation("orders"), tx)
			.await
			.unwrap();
		let _ = next_snapshot(&mut rx).await;

		std::fs::write(&path, "{ not json").unwrap();
		let notification = tokio::time::timeout(Duration::from_secs(5), rx.recv())
			.await
			.unwrap();
		assert!(matches!(
			notification,
			Some(StoreNotification::Error(StoreError::Serialization(_)))
		));

		let (tx, _rx) = mpsc::unbounded_channel();
		let result = store
			.listen(&DocumentQuery::orders_by_creation("orders"), tx)
			.await;
		assert!(matches!(result, Err(StoreError::Serialization(_))));
	}

	#[test]
	fn test_schema_bounds() {
		let schema = FileStoreSchema;
		let ok: toml::Value =
			toml::from_str("path = \"orders.json\"\npoll_interval_ms = 250").unwrap();
		assert!(schema.validate(&ok).is_ok());

		let too_fast: toml::Value = toml::from_str("poll_interval_ms = 1").unwrap();
		assert!(schema.validate(&too_fast).is_err());

		let empty_path: toml::Value = toml::from_str("path = \"  \"").unwrap();
		assert!(schema.validate(&empty_path).is_err());
	}
}
