//! API types for the order desk HTTP endpoints.

use crate::OrderStatus;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for `PATCH /api/orders/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
	pub status: OrderStatus,
}

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub loading: bool,
	pub error: Option<String>,
	pub version: u64,
}

/// JSON error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

/// API error with its HTTP mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request or query parameters (400).
	BadRequest { error_type: String, message: String },
	/// The store refused the write (403).
	Forbidden { error_type: String, message: String },
	/// Unknown order (404).
	NotFound { error_type: String, message: String },
	/// The store failed or timed out (502).
	BadGateway { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::Forbidden { .. } => StatusCode::FORBIDDEN,
			APIError::NotFound { .. } => StatusCode::NOT_FOUND,
			APIError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::Forbidden {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::BadGateway {
				error_type,
				message,
			} => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", self.status_code(), response.error, response.message)
	}
}

impl std::error::Error for APIError {}

impl IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_mapping() {
		let err = APIError::NotFound {
			error_type: "ORDER_NOT_FOUND".into(),
			message: "Order abc not found".into(),
		};
		assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(err.to_error_response().error, "ORDER_NOT_FOUND");
	}

	#[test]
	fn test_status_update_request_parses_lowercase() {
		let req: StatusUpdateRequest = serde_json::from_str(r#"{"status":"delivered"}"#).unwrap();
		assert_eq!(req.status, OrderStatus::Delivered);
		assert!(serde_json::from_str::<StatusUpdateRequest>(r#"{"status":"Delivered"}"#).is_err());
	}
}
