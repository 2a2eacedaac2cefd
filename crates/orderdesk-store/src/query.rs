//! Live query description and result ordering shared by the backends.

use crate::Document;
use chrono::{DateTime, FixedOffset};
use orderdesk_types::Fields;
use serde_json::Value;
use std::cmp::Ordering;

/// Sort direction of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Ascending,
	Descending,
}

/// A query over one collection ordered by one field.
///
/// Documents lacking the ordering field are not part of the result set.
/// Equal values are ordered by document id in the same direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
	pub collection: String,
	pub order_by: String,
	pub direction: Direction,
}

impl DocumentQuery {
	/// The dashboard's query: every order, newest first.
	pub fn orders_by_creation(collection: impl Into<String>) -> Self {
		Self {
			collection: collection.into(),
			order_by: "createdAt".to_string(),
			direction: Direction::Descending,
		}
	}

	/// Evaluates the query over the documents of its collection.
	pub fn run<'a, I>(&self, documents: I) -> Vec<Document>
	where
		I: IntoIterator<Item = (&'a String, &'a Fields)>,
	{
		let mut matched: Vec<(&String, &Fields, &Value)> = documents
			.into_iter()
			.filter_map(|(id, fields)| fields.get(&self.order_by).map(|key| (id, fields, key)))
			.collect();

		matched.sort_by(|(a_id, _, a_key), (b_id, _, b_key)| {
			let ordering = compare_values(a_key, b_key).then_with(|| a_id.cmp(b_id));
			match self.direction {
				Direction::Ascending => ordering,
				Direction::Descending => ordering.reverse(),
			}
		});

		matched
			.into_iter()
			.map(|(id, fields, _)| Document {
				id: id.clone(),
				fields: fields.clone(),
			})
			.collect()
	}
}

/// Rank of a value's type when values of different types are compared.
fn type_rank(value: &Value) -> u8 {
	match value {
		Value::Null => 0,
		Value::Bool(_) => 1,
		Value::Number(_) => 2,
		Value::String(s) if parse_timestamp(s).is_some() => 3,
		Value::String(_) => 4,
		Value::Array(_) => 5,
		Value::Object(_) => 6,
	}
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
	DateTime::parse_from_rfc3339(s).ok()
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
	let rank = type_rank(a).cmp(&type_rank(b));
	if rank != Ordering::Equal {
		return rank;
	}

	match (a, b) {
		(Value::Bool(x), Value::Bool(y)) => x.cmp(y),
		(Value::Number(x), Value::Number(y)) => {
			let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
			x.partial_cmp(&y).unwrap_or(Ordering::Equal)
		},
		(Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
			(Some(x), Some(y)) => x.cmp(&y),
			_ => x.cmp(y),
		},
		_ => Ordering::Equal,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::collections::HashMap;

	fn doc(created_at: Value) -> Fields {
		let mut fields = Fields::new();
		fields.insert("createdAt".into(), created_at);
		fields
	}

	fn ids(docs: &[Document]) -> Vec<&str> {
		docs.iter().map(|d| d.id.as_str()).collect()
	}

	#[test]
	fn test_newest_first_with_id_tiebreak() {
		let mut collection = HashMap::new();
		collection.insert("a".to_string(), doc(json!("2024-03-01T08:00:00Z")));
		collection.insert("b".to_string(), doc(json!("2024-03-02T08:00:00Z")));
		collection.insert("c".to_string(), doc(json!("2024-03-01T08:00:00Z")));
		// Same instant as "b" written with an offset
		collection.insert("d".to_string(), doc(json!("2024-03-02T16:00:00+08:00")));

		let result = DocumentQuery::orders_by_creation("orders").run(&collection);
		assert_eq!(ids(&result), vec!["d", "b", "c", "a"]);
	}

	#[test]
	fn test_documents_without_order_field_are_excluded() {
		let mut collection = HashMap::new();
		collection.insert("a".to_string(), doc(json!("2024-03-01T08:00:00Z")));
		collection.insert("draft".to_string(), Fields::new());

		let result = DocumentQuery::orders_by_creation("orders").run(&collection);
		assert_eq!(ids(&result), vec!["a"]);
	}

	#[test]
	fn test_ascending_numbers() {
		let mut collection = HashMap::new();
		collection.insert("x".to_string(), doc(json!(3)));
		collection.insert("y".to_string(), doc(json!(1.5)));
		let query = DocumentQuery {
			collection: "orders".into(),
			order_by: "createdAt".into(),
			direction: Direction::Ascending,
		};
		assert_eq!(ids(&query.run(&collection)), vec!["y", "x"]);
	}
}
