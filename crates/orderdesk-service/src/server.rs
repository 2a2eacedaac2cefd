//! HTTP server for the order desk API.

use crate::apis::orders;
use axum::{
	routing::{get, patch},
	Router,
};
use orderdesk_config::ApiConfig;
use orderdesk_core::Dashboard;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub dashboard: Arc<Dashboard>,
}

/// Builds the router with every endpoint nested under `/api`.
pub fn build_router(dashboard: Arc<Dashboard>, cors: bool) -> Router {
	let api = Router::new()
		.route("/orders", get(orders::list_orders))
		.route("/orders/stats", get(orders::get_stats))
		.route("/orders/export", get(orders::export_orders))
		.route("/orders/{id}", get(orders::get_order))
		.route("/orders/{id}/status", patch(orders::update_status))
		.route("/health", get(orders::health));

	let app = Router::new()
		.nest("/api", api)
		.with_state(AppState { dashboard });

	if cors {
		app.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
	} else {
		app
	}
}

/// Serves the API until `shutdown` resolves.
pub async fn start_server<F>(
	api_config: ApiConfig,
	dashboard: Arc<Dashboard>,
	shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
	F: Future<Output = ()> + Send + 'static,
{
	let app = build_router(dashboard, api_config.cors);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Order desk API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}
