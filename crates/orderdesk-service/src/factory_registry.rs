//! Registry of store factories available to the service.

use orderdesk_config::Config;
use orderdesk_core::{Dashboard, DashboardBuilder};
use orderdesk_store::StoreFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Factories for every compiled-in store backend, keyed by name.
pub struct FactoryRegistry {
	pub store: HashMap<String, StoreFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			store: HashMap::new(),
		}
	}

	pub fn register_store(&mut self, name: impl Into<String>, factory: StoreFactory) {
		self.store.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in orderdesk_store::get_all_implementations() {
			tracing::debug!("Registering store implementation: {}", name);
			registry.register_store(name, factory);
		}
		registry
	})
}

/// Builds the dashboard for `config` from the registered factories.
///
/// Every configured store implementation must be known to the registry.
pub fn build_dashboard_from_config(
	config: Config,
) -> Result<Dashboard, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut factories = HashMap::new();
	for name in config.store.implementations.keys() {
		match registry.store.get(name) {
			Some(factory) => {
				factories.insert(name.clone(), *factory);
			},
			None => {
				let mut available: Vec<_> = registry.store.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown store implementation '{}'. Available: [{}]",
					name,
					available.join(", ")
				)
				.into());
			},
		}
	}

	Ok(DashboardBuilder::new(config).build(factories)?)
}
