//! Order endpoints of the desk API.
//!
//! Reads are served from the dashboard's current snapshot. Status changes go
//! to the store and become visible in reads once the live query delivers
//! them.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::{NaiveDate, Utc};
use orderdesk_core::{export_file_name, DashboardView, MutationError};
use orderdesk_store::StoreError;
use orderdesk_types::{
	truncate_id, APIError, FilterCriteria, HealthResponse, Order, OrderStats, QuickFilter,
	StatusFilter, StatusUpdateRequest, TypeFilter,
};
use serde::Deserialize;

use crate::server::AppState;

/// Query parameters accepted by the list and export endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
	pub search: Option<String>,
	pub status: Option<String>,
	#[serde(rename = "type")]
	pub order_type: Option<String>,
	pub quick: Option<String>,
	pub from: Option<String>,
	pub to: Option<String>,
}

impl OrdersQuery {
	/// Converts the raw parameters into filter criteria.
	pub fn into_criteria(self) -> Result<FilterCriteria, APIError> {
		let mut criteria = FilterCriteria::default();
		if let Some(search) = self.search {
			criteria.search_query = search;
		}
		if let Some(status) = self.status {
			criteria.status_filter = status
				.parse::<StatusFilter>()
				.map_err(|e| bad_request("INVALID_STATUS", e.to_string()))?;
		}
		if let Some(order_type) = self.order_type {
			criteria.type_filter = order_type
				.parse::<TypeFilter>()
				.map_err(|e| bad_request("INVALID_TYPE", e.to_string()))?;
		}
		if let Some(quick) = self.quick {
			let quick = quick
				.parse::<QuickFilter>()
				.map_err(|e| bad_request("INVALID_QUICK_FILTER", e.to_string()))?;
			criteria.apply_quick(quick);
		}
		criteria.date_from = self.from.as_deref().map(|d| parse_date("from", d)).transpose()?;
		criteria.date_to = self.to.as_deref().map(|d| parse_date("to", d)).transpose()?;
		Ok(criteria)
	}
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, APIError> {
	value.parse::<NaiveDate>().map_err(|_| {
		bad_request(
			"INVALID_DATE",
			format!("'{}' must be a YYYY-MM-DD date, got '{}'", field, value),
		)
	})
}

fn bad_request(error_type: &str, message: String) -> APIError {
	APIError::BadRequest {
		error_type: error_type.to_string(),
		message,
	}
}

/// Maps a failed status write to its HTTP error.
pub fn mutation_error_response(error: &MutationError) -> APIError {
	let message = error.to_string();
	match error.cause() {
		StoreError::NotFound(_) => APIError::NotFound {
			error_type: "ORDER_NOT_FOUND".to_string(),
			message,
		},
		StoreError::PermissionDenied(_) => APIError::Forbidden {
			error_type: "PERMISSION_DENIED".to_string(),
			message,
		},
		_ => APIError::BadGateway {
			error_type: "MUTATION_FAILED".to_string(),
			message,
		},
	}
}

/// Handles GET /api/orders.
pub async fn list_orders(
	State(state): State<AppState>,
	Query(query): Query<OrdersQuery>,
) -> Result<Json<DashboardView>, APIError> {
	let criteria = query.into_criteria()?;
	Ok(Json(state.dashboard.view(&criteria)))
}

/// Handles GET /api/orders/stats.
pub async fn get_stats(State(state): State<AppState>) -> Json<OrderStats> {
	Json(state.dashboard.stats())
}

/// Handles GET /api/orders/export.
pub async fn export_orders(
	State(state): State<AppState>,
	Query(query): Query<OrdersQuery>,
) -> Result<Response, APIError> {
	let criteria = query.into_criteria()?;
	let csv = state.dashboard.export_csv(&criteria);
	let disposition = format!(
		"attachment; filename=\"{}\"",
		export_file_name(Utc::now().date_naive())
	);
	Ok((
		[
			(header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
			(header::CONTENT_DISPOSITION, disposition),
		],
		csv,
	)
		.into_response())
}

/// Handles GET /api/orders/{id}.
pub async fn get_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	state
		.dashboard
		.order(&id)
		.map(Json)
		.ok_or_else(|| APIError::NotFound {
			error_type: "ORDER_NOT_FOUND".to_string(),
			message: format!("Order {} not found", id),
		})
}

/// Handles PATCH /api/orders/{id}/status.
///
/// Responds once the store acknowledges the write.
pub async fn update_status(
	State(state): State<AppState>,
	Path(id): Path<String>,
	payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<StatusCode, APIError> {
	let Json(request) = payload.map_err(|e| bad_request("INVALID_REQUEST", e.body_text()))?;

	tracing::info!(order_id = %truncate_id(&id), status = %request.status, "Status update requested");
	state
		.dashboard
		.update_status(&id, request.status)
		.await
		.map_err(|e| mutation_error_response(&e))?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles GET /api/health.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	let snapshot = state.dashboard.snapshot();
	Json(HealthResponse {
		loading: snapshot.loading,
		error: snapshot.error.clone(),
		version: snapshot.version,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderdesk_types::{OrderStatus, OrderType};

	#[test]
	fn test_query_to_criteria() {
		let query = OrdersQuery {
			search: Some("jane".into()),
			status: Some("pending".into()),
			order_type: Some("all".into()),
			from: Some("2024-03-01".into()),
			..Default::default()
		};
		let criteria = query.into_criteria().unwrap();
		assert_eq!(criteria.search_query, "jane");
		assert_eq!(criteria.status_filter, StatusFilter::Only(OrderStatus::Pending));
		assert_eq!(criteria.type_filter, TypeFilter::All);
		assert_eq!(criteria.date_from, NaiveDate::from_ymd_opt(2024, 3, 1));
		assert_eq!(criteria.date_to, None);
	}

	#[test]
	fn test_quick_filter_parameter() {
		let query = OrdersQuery {
			quick: Some("distributors".into()),
			..Default::default()
		};
		let criteria = query.into_criteria().unwrap();
		assert_eq!(criteria.type_filter, TypeFilter::Only(OrderType::Distributor));
	}

	#[test]
	fn test_invalid_parameters_are_bad_requests() {
		let bad_status = OrdersQuery {
			status: Some("lost".into()),
			..Default::default()
		};
		assert_eq!(
			bad_status.into_criteria().unwrap_err().status_code(),
			StatusCode::BAD_REQUEST
		);

		let bad_date = OrdersQuery {
			to: Some("03/01/2024".into()),
			..Default::default()
		};
		let err = bad_date.into_criteria().unwrap_err();
		assert_eq!(err.to_error_response().error, "INVALID_DATE");
	}

	#[test]
	fn test_mutation_error_mapping() {
		let failed = |cause| MutationError::MutationFailed {
			order_id: "A".into(),
			cause,
		};
		assert_eq!(
			mutation_error_response(&failed(StoreError::NotFound("orders/A".into()))).status_code(),
			StatusCode::NOT_FOUND
		);
		assert_eq!(
			mutation_error_response(&failed(StoreError::PermissionDenied("no".into())))
				.status_code(),
			StatusCode::FORBIDDEN
		);
		assert_eq!(
			mutation_error_response(&failed(StoreError::Unavailable("timed out".into())))
				.status_code(),
			StatusCode::BAD_GATEWAY
		);
	}
}
