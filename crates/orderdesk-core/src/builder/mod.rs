//! Builder for constructing a dashboard from configuration.
//!
//! Store backends are created through factory functions keyed by
//! implementation name. Every configured implementation is constructed, which
//! validates its table, and the primary one backs the dashboard.

use crate::engine::{event_bus::EventBus, Dashboard};
use orderdesk_config::Config;
use orderdesk_store::{OrderStoreInterface, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during dashboard construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for a [`Dashboard`] with a pluggable store.
pub struct DashboardBuilder {
	config: Config,
	event_bus_capacity: usize,
}

impl DashboardBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			event_bus_capacity: 1000,
		}
	}

	pub fn with_event_bus_capacity(mut self, capacity: usize) -> Self {
		self.event_bus_capacity = capacity;
		self
	}

	/// Builds the dashboard using the given store factories.
	pub fn build<F>(self, store_factories: HashMap<String, F>) -> Result<Dashboard, BuilderError>
	where
		F: Fn(&toml::Value) -> Result<Box<dyn OrderStoreInterface>, StoreError>,
	{
		let mut store_impls = HashMap::new();
		for (name, config) in &self.config.store.implementations {
			let Some(factory) = store_factories.get(name) else {
				tracing::warn!(component = "store", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.store.primary == name;
					tracing::info!(component = "store", implementation = %name, enabled = %is_primary, "Loaded");
					store_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "store",
						implementation = %name,
						error = %e,
						"Failed to create store implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create store implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		if store_impls.is_empty() {
			return Err(BuilderError::Config(
				"No valid store implementations available".into(),
			));
		}

		let primary = &self.config.store.primary;
		let store: Arc<dyn OrderStoreInterface> = store_impls
			.remove(primary)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"Primary store '{}' failed to load or has no registered factory",
					primary
				))
			})?
			.into();

		tracing::info!(
			desk = %self.config.desk.id,
			collection = %self.config.store.collection,
			timeout_seconds = self.config.mutation.timeout_seconds,
			"Dashboard assembled"
		);

		Ok(Dashboard::new(
			store,
			&self.config.store.collection,
			Duration::from_secs(self.config.mutation.timeout_seconds),
			EventBus::new(self.event_bus_capacity),
		))
	}
}
