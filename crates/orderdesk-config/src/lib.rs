//! Configuration module for the order desk.
//!
//! Configuration is loaded from TOML files. String values may reference
//! environment variables as `${VAR}` or `${VAR:-default}`.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["store.toml", "api.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering dumps the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the order desk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this desk instance.
	pub desk: DeskConfig,
	/// Remote order store selection.
	pub store: StoreConfig,
	/// Status mutation settings.
	#[serde(default)]
	pub mutation: MutationConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the desk instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeskConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Configuration for the remote order store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Collection holding the order documents.
	#[serde(default = "default_collection")]
	pub collection: String,
	/// Map of store implementation names to their raw configuration tables.
	pub implementations: HashMap<String, toml::Value>,
}

fn default_collection() -> String {
	"orders".to_string()
}

/// Configuration for status mutations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MutationConfig {
	/// Seconds to wait for the store to acknowledge a write.
	#[serde(default = "default_mutation_timeout")]
	pub timeout_seconds: u64,
}

impl Default for MutationConfig {
	fn default() -> Self {
		Self {
			timeout_seconds: default_mutation_timeout(),
		}
	}
}

fn default_mutation_timeout() -> u64 {
	10
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Installs a permissive CORS layer for browser front-ends.
	#[serde(default)]
	pub cors: bool,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Returns the raw table of the primary store implementation.
	pub fn primary_store(&self) -> Option<&toml::Value> {
		self.store.implementations.get(&self.store.primary)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.desk.id.is_empty() {
			return Err(ConfigError::Validation("Desk ID cannot be empty".into()));
		}

		if self.store.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one store implementation must be configured".into(),
			));
		}
		if self.store.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Store primary implementation cannot be empty".into(),
			));
		}
		if !self.store.implementations.contains_key(&self.store.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary store '{}' not found in implementations",
				self.store.primary
			)));
		}
		if self.store.collection.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Store collection cannot be empty".into(),
			));
		}

		if !(1..=300).contains(&self.mutation.timeout_seconds) {
			return Err(ConfigError::Validation(format!(
				"mutation.timeout_seconds must be between 1 and 300, got {}",
				self.mutation.timeout_seconds
			)));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[desk]
id = "main-desk"

[store]
primary = "memory"
[store.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("ORDERDESK_TEST_HOST", "localhost");
		std::env::set_var("ORDERDESK_TEST_PORT", "3001");

		let input = "host = \"${ORDERDESK_TEST_HOST}:${ORDERDESK_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:3001\"");

		std::env::remove_var("ORDERDESK_TEST_HOST");
		std::env::remove_var("ORDERDESK_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${ORDERDESK_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${ORDERDESK_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("ORDERDESK_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.desk.id, "main-desk");
		assert_eq!(config.store.collection, "orders");
		assert_eq!(config.mutation.timeout_seconds, 10);
		assert!(config.api.is_none());
		assert!(config.primary_store().is_some());
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("ORDERDESK_TEST_DESK_ID", "desk-from-env");

		let config_str = r#"
[desk]
id = "${ORDERDESK_TEST_DESK_ID}"

[store]
primary = "file"
collection = "orders"
[store.implementations.file]
path = "${ORDERDESK_TEST_ORDERS_PATH:-./data/orders.json}"

[api]
enabled = true
port = 8080
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.desk.id, "desk-from-env");
		assert_eq!(
			config.primary_store().and_then(|t| t.get("path")).and_then(|v| v.as_str()),
			Some("./data/orders.json")
		);
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
		assert!(!api.cors);

		std::env::remove_var("ORDERDESK_TEST_DESK_ID");
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = r#"
[desk]
id = "main-desk"

[store]
primary = "firestore"
[store.implementations.memory]
"#;
		let err = Config::from_str(config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary store 'firestore' not found in implementations"));
	}

	#[test]
	fn test_empty_desk_id_rejected() {
		let config_str = MINIMAL.replace("main-desk", "");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Desk ID cannot be empty"));
	}

	#[test]
	fn test_mutation_timeout_bounds() {
		let config_str = format!("{}\n[mutation]\ntimeout_seconds = 0\n", MINIMAL);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("timeout_seconds"));

		let config_str = format!("{}\n[mutation]\ntimeout_seconds = 30\n", MINIMAL);
		let config = Config::from_str(&config_str).unwrap();
		assert_eq!(config.mutation.timeout_seconds, 30);
	}
}
