//! Fixtures shared by the engine tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderdesk_store::{
	Document, DocumentQuery, DocumentUpdate, ListenerId, OrderStoreInterface, StoreError,
	StoreNotification,
};
use orderdesk_types::{
	ConfigSchema, DeskEvent, Fields, Order, OrderStatus, OrderType, ValidationError,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub fn order(
	id: &str,
	created_at: &str,
	status: OrderStatus,
	order_type: OrderType,
	total: i64,
) -> Order {
	Order {
		id: id.to_string(),
		full_name: format!("Customer {}", id),
		email: format!("{}@example.com", id.to_lowercase()),
		phone: "0917-555-0100".to_string(),
		address: "12 Mabini St".to_string(),
		city: "Quezon City".to_string(),
		province: "Metro Manila".to_string(),
		zip_code: "1100".to_string(),
		order_type,
		quantity: 1,
		price_per_pack: Decimal::new(total, 0),
		total_price: Decimal::new(total, 0),
		message: String::new(),
		created_at: created_at.parse::<DateTime<Utc>>().unwrap(),
		status,
	}
}

/// Field map of an order as the store would hold it.
pub fn fields_of(order: &Order) -> Fields {
	match serde_json::to_value(order).unwrap() {
		serde_json::Value::Object(mut fields) => {
			fields.remove("id");
			fields
		},
		_ => unreachable!(),
	}
}

pub fn document_of(order: &Order) -> Document {
	Document {
		id: order.id.clone(),
		fields: fields_of(order),
	}
}

pub async fn next_event(rx: &mut broadcast::Receiver<DeskEvent>) -> DeskEvent {
	tokio::time::timeout(Duration::from_secs(5), rx.recv())
		.await
		.expect("timed out waiting for event")
		.unwrap()
}

struct NoOptions;

impl ConfigSchema for NoOptions {
	fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
		Ok(())
	}
}

/// Store whose notifications are driven by the test.
///
/// Senders are kept after `unlisten`, so a test can push a delivery that
/// arrives after the engine has torn its subscription down.
#[derive(Default)]
pub struct ScriptedStore {
	senders: Mutex<Vec<mpsc::UnboundedSender<StoreNotification>>>,
	listen_failure: Mutex<Option<StoreError>>,
	pub listens: AtomicUsize,
	pub unlistens: AtomicUsize,
}

impl ScriptedStore {
	/// Pushes a full result set to the most recent listener.
	pub fn deliver(&self, orders: &[Order]) -> bool {
		let docs = orders.iter().map(document_of).collect();
		self.send(StoreNotification::Snapshot(docs))
	}

	/// Pushes raw documents to the most recent listener.
	pub fn deliver_documents(&self, docs: Vec<Document>) -> bool {
		self.send(StoreNotification::Snapshot(docs))
	}

	pub fn fail(&self, error: StoreError) -> bool {
		self.send(StoreNotification::Error(error))
	}

	pub fn fail_listen_with(&self, error: StoreError) {
		*self.listen_failure.lock().unwrap() = Some(error);
	}

	fn send(&self, notification: StoreNotification) -> bool {
		let senders = self.senders.lock().unwrap();
		senders
			.last()
			.map(|sender| sender.send(notification).is_ok())
			.unwrap_or(false)
	}
}

#[async_trait]
impl OrderStoreInterface for ScriptedStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoOptions)
	}

	async fn listen(
		&self,
		_query: &DocumentQuery,
		sender: mpsc::UnboundedSender<StoreNotification>,
	) -> Result<ListenerId, StoreError> {
		if let Some(error) = self.listen_failure.lock().unwrap().clone() {
			return Err(error);
		}
		let mut senders = self.senders.lock().unwrap();
		senders.push(sender);
		let n = self.listens.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(ListenerId(n as u64))
	}

	async fn unlisten(&self, _listener: ListenerId) -> Result<(), StoreError> {
		self.unlistens.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn update_document(
		&self,
		_collection: &str,
		_id: &str,
		_update: DocumentUpdate,
	) -> Result<(), StoreError> {
		Ok(())
	}
}
