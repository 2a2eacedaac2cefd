//! Summary statistics over the full snapshot.

use orderdesk_types::{Order, OrderStats, OrderStatus, OrderType};

/// Computes the summary figures in one pass over `orders`.
///
/// Callers pass the whole snapshot, not a filtered view. Revenue saturates
/// at the bounds of [`Decimal`](rust_decimal::Decimal) instead of overflowing.
pub fn aggregate(orders: &[Order]) -> OrderStats {
	orders
		.iter()
		.fold(OrderStats::default(), |mut stats, order| {
			stats.total_orders += 1;
			stats.total_revenue = stats.total_revenue.saturating_add(order.total_price);
			if order.status == OrderStatus::Pending {
				stats.pending_count += 1;
			}
			if order.order_type == OrderType::Retail {
				stats.retail_count += 1;
			}
			stats
		})
}
