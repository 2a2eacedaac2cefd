//! Main entry point for the order desk service.
//!
//! Mirrors the configured order store into a live dashboard and serves its
//! views and status mutations over HTTP. Store backends are pluggable and
//! selected by configuration.

use clap::Parser;
use orderdesk_config::Config;
use orderdesk_core::Dashboard;
use orderdesk_types::{truncate_id, DeskEvent, MutationEvent, SyncEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the order desk service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started order desk");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.desk.id);

	let dashboard = Arc::new(factory_registry::build_dashboard_from_config(config.clone())?);
	tokio::spawn(log_events(dashboard.clone()));

	// A failed subscription is recorded on the dashboard and reported by
	// /api/health, so the service keeps running
	if let Err(e) = dashboard.start().await {
		tracing::error!(error = %e, "Order subscription could not be established");
	}

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			server::start_server(api_config, dashboard.clone(), shutdown_signal()).await?;
		},
		None => {
			tracing::info!("API disabled, syncing only");
			shutdown_signal().await;
		},
	}

	dashboard.stop().await;
	tracing::info!("Stopped order desk");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Failed to listen for shutdown signal");
	}
	tracing::info!("Shutdown requested");
}

/// Logs dashboard events until the bus closes.
async fn log_events(dashboard: Arc<Dashboard>) {
	let mut events = dashboard.event_bus().subscribe();
	drop(dashboard);

	loop {
		match events.recv().await {
			Ok(DeskEvent::Sync(SyncEvent::SnapshotReplaced {
				version,
				order_count,
			})) => {
				tracing::info!(version, orders = order_count, "Orders synchronized");
			},
			Ok(DeskEvent::Sync(SyncEvent::SubscriptionFailed { message })) => {
				tracing::warn!(%message, "Order subscription failed");
			},
			Ok(DeskEvent::Mutation(MutationEvent::StatusUpdated { order_id, status })) => {
				tracing::info!(order_id = %truncate_id(&order_id), %status, "Status change acknowledged");
			},
			Ok(DeskEvent::Mutation(MutationEvent::StatusUpdateFailed { order_id, error })) => {
				tracing::warn!(order_id = %truncate_id(&order_id), %error, "Status change rejected");
			},
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event logger fell behind");
			},
			Err(RecvError::Closed) => break,
		}
	}
}
