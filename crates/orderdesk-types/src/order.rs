//! Order types shared by the sync engine, the derived views and the API.
//!
//! Orders arrive from the remote store as schemaless documents. The
//! document identity is carried outside the field map, so decoding an order
//! always takes the identity separately and never trusts an `id` field.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field map of a single stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A customer order as mirrored from the remote store.
///
/// Orders are immutable by convention: the engine replaces whole snapshots
/// and never edits an order in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Document identity assigned by the store.
	#[serde(default)]
	pub id: String,
	pub full_name: String,
	pub email: String,
	pub phone: String,
	pub address: String,
	pub city: String,
	pub province: String,
	pub zip_code: String,
	pub order_type: OrderType,
	pub quantity: u32,
	pub price_per_pack: Decimal,
	/// Trusted as given; never re-derived from quantity and pack price.
	pub total_price: Decimal,
	#[serde(default)]
	pub message: String,
	/// Server-assigned creation timestamp.
	pub created_at: DateTime<Utc>,
	pub status: OrderStatus,
}

impl Order {
	/// Decodes an order from a document's identity and field map.
	///
	/// Any `id` key inside the field map is ignored in favour of the
	/// document identity. Unknown fields such as `updatedAt` are skipped.
	pub fn from_fields(id: &str, fields: Fields) -> Result<Self, serde_json::Error> {
		let mut order: Order = serde_json::from_value(serde_json::Value::Object(fields))?;
		order.id = id.to_string();
		Ok(order)
	}
}

/// Fulfilment status of an order.
///
/// Every status may move to every other status; no workflow is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	Pending,
	Confirmed,
	Processing,
	Shipped,
	Delivered,
	Cancelled,
}

impl OrderStatus {
	/// All statuses in display order.
	pub const ALL: [OrderStatus; 6] = [
		OrderStatus::Pending,
		OrderStatus::Confirmed,
		OrderStatus::Processing,
		OrderStatus::Shipped,
		OrderStatus::Delivered,
		OrderStatus::Cancelled,
	];

	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::Processing => "processing",
			OrderStatus::Shipped => "shipped",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns the human-readable label of the status.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pending",
			OrderStatus::Confirmed => "Confirmed",
			OrderStatus::Processing => "Processing",
			OrderStatus::Shipped => "Shipped",
			OrderStatus::Delivered => "Delivered",
			OrderStatus::Cancelled => "Cancelled",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OrderStatus::ALL
			.into_iter()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| ParseEnumError::new("order status", s))
	}
}

/// Commercial channel of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
	Retail,
	Distributor,
}

impl OrderType {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderType::Retail => "retail",
			OrderType::Distributor => "distributor",
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			OrderType::Retail => "Retail",
			OrderType::Distributor => "Distributor",
		}
	}
}

impl fmt::Display for OrderType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderType {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"retail" => Ok(OrderType::Retail),
			"distributor" => Ok(OrderType::Distributor),
			other => Err(ParseEnumError::new("order type", other)),
		}
	}
}

/// Error returned when a string does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct ParseEnumError {
	kind: &'static str,
	value: String,
}

impl ParseEnumError {
	pub fn new(kind: &'static str, value: &str) -> Self {
		Self {
			kind,
			value: value.to_string(),
		}
	}
}
