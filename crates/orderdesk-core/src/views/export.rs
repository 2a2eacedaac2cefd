//! CSV export of a filtered view.

use chrono::NaiveDate;
use orderdesk_types::Order;
use std::borrow::Cow;

const HEADER: [&str; 9] = [
	"Order ID", "Customer", "Email", "Phone", "Type", "Quantity", "Total", "Status", "Date",
];

/// Renders orders as CSV text, one row per order in the given order.
///
/// Dates are the calendar date of `createdAt` in UTC, written `M/D/YYYY`.
/// Rows are separated by `\n` with no trailing newline.
pub fn export_csv<'a, I>(orders: I) -> String
where
	I: IntoIterator<Item = &'a Order>,
{
	let mut lines = vec![HEADER.join(",")];
	for order in orders {
		let row = [
			csv_field(&order.id),
			csv_field(&order.full_name),
			csv_field(&order.email),
			csv_field(&order.phone),
			Cow::Borrowed(order.order_type.as_str()),
			Cow::Owned(order.quantity.to_string()),
			Cow::Owned(order.total_price.normalize().to_string()),
			Cow::Borrowed(order.status.as_str()),
			Cow::Owned(order.created_at.format("%-m/%-d/%Y").to_string()),
		];
		lines.push(row.join(","));
	}
	lines.join("\n")
}

/// Suggested download name for an export made on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
	format!("orders-{}.csv", date.format("%Y-%m-%d"))
}

fn csv_field(value: &str) -> Cow<'_, str> {
	if value.contains([',', '"', '\n', '\r']) {
		Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
	} else {
		Cow::Borrowed(value)
	}
}
