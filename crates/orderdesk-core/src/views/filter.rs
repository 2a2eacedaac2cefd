//! Filtering of the order snapshot by search text, status, type and date.

use orderdesk_types::{FilterCriteria, Order};

/// Criteria prepared for repeated matching.
///
/// The search text is lowercased once rather than per order.
pub struct OrderFilter<'c> {
	criteria: &'c FilterCriteria,
	needle: String,
}

impl<'c> OrderFilter<'c> {
	pub fn new(criteria: &'c FilterCriteria) -> Self {
		Self {
			criteria,
			needle: criteria.search_query.to_lowercase(),
		}
	}

	/// Returns true when the order satisfies every dimension.
	pub fn matches(&self, order: &Order) -> bool {
		self.matches_search(order)
			&& self.criteria.status_filter.accepts(order.status)
			&& self.criteria.type_filter.accepts(order.order_type)
			&& self.matches_dates(order)
	}

	fn matches_search(&self, order: &Order) -> bool {
		if self.needle.is_empty() {
			return true;
		}
		order.full_name.to_lowercase().contains(&self.needle)
			|| order.email.to_lowercase().contains(&self.needle)
			|| order.id.to_lowercase().contains(&self.needle)
			// Phone digits are compared as typed, separators included
			|| order.phone.contains(self.criteria.search_query.as_str())
	}

	fn matches_dates(&self, order: &Order) -> bool {
		let created = order.created_at.date_naive();
		self.criteria.date_from.is_none_or(|from| created >= from)
			&& self.criteria.date_to.is_none_or(|to| created <= to)
	}
}

/// Returns the orders matching `criteria`, in snapshot order.
pub fn filter_orders<'a>(orders: &'a [Order], criteria: &FilterCriteria) -> Vec<&'a Order> {
	let filter = OrderFilter::new(criteria);
	orders.iter().filter(|order| filter.matches(order)).collect()
}
