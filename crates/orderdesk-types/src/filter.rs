//! Filter criteria supplied by the presentation layer.

use crate::{OrderStatus, OrderType, ParseEnumError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status dimension of a filter: every status, or exactly one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
	#[default]
	All,
	Only(OrderStatus),
}

impl StatusFilter {
	pub fn accepts(&self, status: OrderStatus) -> bool {
		match self {
			StatusFilter::All => true,
			StatusFilter::Only(wanted) => *wanted == status,
		}
	}
}

impl FromStr for StatusFilter {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"all" => Ok(StatusFilter::All),
			other => other.parse().map(StatusFilter::Only),
		}
	}
}

impl fmt::Display for StatusFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StatusFilter::All => f.write_str("all"),
			StatusFilter::Only(status) => write!(f, "{}", status),
		}
	}
}

/// Order-type dimension of a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
	#[default]
	All,
	Only(OrderType),
}

impl TypeFilter {
	pub fn accepts(&self, order_type: OrderType) -> bool {
		match self {
			TypeFilter::All => true,
			TypeFilter::Only(wanted) => *wanted == order_type,
		}
	}
}

impl FromStr for TypeFilter {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"all" => Ok(TypeFilter::All),
			other => other.parse().map(TypeFilter::Only),
		}
	}
}

impl fmt::Display for TypeFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TypeFilter::All => f.write_str("all"),
			TypeFilter::Only(order_type) => write!(f, "{}", order_type),
		}
	}
}

macro_rules! string_serde {
	($ty:ty) => {
		impl Serialize for $ty {
			fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
				serializer.collect_str(self)
			}
		}

		impl<'de> Deserialize<'de> for $ty {
			fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
				let raw = String::deserialize(deserializer)?;
				raw.parse().map_err(serde::de::Error::custom)
			}
		}
	};
}

string_serde!(StatusFilter);
string_serde!(TypeFilter);

/// Transient filter state owned by the presentation layer.
///
/// The default value is the identity filter: it matches every order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
	#[serde(default)]
	pub search_query: String,
	#[serde(default)]
	pub status_filter: StatusFilter,
	#[serde(default)]
	pub type_filter: TypeFilter,
	/// Inclusive lower bound on the creation date (UTC).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date_from: Option<NaiveDate>,
	/// Inclusive upper bound on the creation date (UTC).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
	pub fn with_search(mut self, query: impl Into<String>) -> Self {
		self.search_query = query.into();
		self
	}

	pub fn with_status(mut self, status: StatusFilter) -> Self {
		self.status_filter = status;
		self
	}

	pub fn with_type(mut self, order_type: TypeFilter) -> Self {
		self.type_filter = order_type;
		self
	}

	pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
		self.date_from = from;
		self.date_to = to;
		self
	}

	/// Returns true when any dimension narrows the view.
	pub fn is_active(&self) -> bool {
		!self.search_query.is_empty()
			|| self.status_filter != StatusFilter::All
			|| self.type_filter != TypeFilter::All
			|| self.date_from.is_some()
			|| self.date_to.is_some()
	}

	/// Resets every dimension to the identity filter.
	pub fn clear(&mut self) {
		*self = Self::default();
	}

	/// Applies a quick filter preset, leaving the other dimensions untouched.
	pub fn apply_quick(&mut self, quick: QuickFilter) {
		match quick {
			QuickFilter::Pending => self.status_filter = StatusFilter::Only(OrderStatus::Pending),
			QuickFilter::Confirmed => {
				self.status_filter = StatusFilter::Only(OrderStatus::Confirmed)
			},
			QuickFilter::Shipped => self.status_filter = StatusFilter::Only(OrderStatus::Shipped),
			QuickFilter::Distributors => {
				self.type_filter = TypeFilter::Only(OrderType::Distributor)
			},
		}
	}
}

/// One-click presets offered next to the filter inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickFilter {
	Pending,
	Confirmed,
	Shipped,
	Distributors,
}

impl FromStr for QuickFilter {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(QuickFilter::Pending),
			"confirmed" => Ok(QuickFilter::Confirmed),
			"shipped" => Ok(QuickFilter::Shipped),
			"distributors" => Ok(QuickFilter::Distributors),
			other => Err(ParseEnumError::new("quick filter", other)),
		}
	}
}
