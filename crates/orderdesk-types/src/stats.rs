//! Summary statistics derived from a snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate figures over the full synchronized set of orders.
///
/// Always computed from the whole snapshot, never from a filtered view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
	pub total_orders: usize,
	pub pending_count: usize,
	pub total_revenue: Decimal,
	pub retail_count: usize,
}
