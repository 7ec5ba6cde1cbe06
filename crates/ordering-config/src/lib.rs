//! Configuration module for the order submission wizard.
//!
//! Configuration is loaded from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`. Large configurations can be
//! split across files with `include = ["catalog.toml", "storage.toml"]`; each
//! top-level section must then appear in exactly one file.

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
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Wizard session behaviour.
	#[serde(default)]
	pub session: SessionConfig,
	/// Pricing catalog sources.
	pub catalog: CatalogConfig,
	/// Draft store implementations.
	pub drafts: DraftsConfig,
	/// Key/value storage backends used by local draft stores.
	pub storage: StorageConfig,
}

/// Wizard session behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
	/// Quiet period before a pending autosave snapshot is written.
	/// Defaults to 2000 ms.
	#[serde(default = "default_autosave_debounce_ms")]
	pub autosave_debounce_ms: u64,
	/// Authenticated customer. Absent means the wizard runs unauthenticated
	/// and no draft is created when leaving the welcome step.
	#[serde(default)]
	pub owner_id: Option<String>,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			autosave_debounce_ms: default_autosave_debounce_ms(),
			owner_id: None,
		}
	}
}

fn default_autosave_debounce_ms() -> u64 {
	2000
}

/// Upper bound for the autosave quiet period.
const MAX_AUTOSAVE_DEBOUNCE_MS: u64 = 60_000;

/// Pricing catalog sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of catalog source names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Draft store implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DraftsConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of draft store names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Key/value storage backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of VAR_NAME, or with `default` for
/// `${VAR_NAME:-default}` when the variable is unset. Input is limited to 1MB.
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

	let mut replacements = Vec::new();
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};
		replacements.push((full_match.range(), value));
	}

	// Apply back to front so earlier ranges stay valid
	let mut result = input.to_string();
	for (range, value) in replacements.into_iter().rev() {
		result.replace_range(range, &value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path.display())))?;

		let mut loader = loader::ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// Validates cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.session.autosave_debounce_ms > MAX_AUTOSAVE_DEBOUNCE_MS {
			return Err(ConfigError::Validation(format!(
				"session.autosave_debounce_ms cannot exceed {}",
				MAX_AUTOSAVE_DEBOUNCE_MS
			)));
		}
		if self
			.session
			.owner_id
			.as_deref()
			.is_some_and(|owner| owner.trim().is_empty())
		{
			return Err(ConfigError::Validation(
				"session.owner_id cannot be empty when set".into(),
			));
		}

		validate_primary("catalog", &self.catalog.primary, &self.catalog.implementations)?;
		validate_primary("drafts", &self.drafts.primary, &self.drafts.implementations)?;
		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;

		Ok(())
	}

	/// Minimal in-memory configuration for tests.
	#[cfg(any(test, feature = "testing"))]
	pub fn for_testing() -> Self {
		let empty = || toml::Value::Table(toml::map::Map::new());
		Self {
			session: SessionConfig {
				autosave_debounce_ms: default_autosave_debounce_ms(),
				owner_id: Some("test-owner".into()),
			},
			catalog: CatalogConfig {
				primary: "static".into(),
				implementations: HashMap::from([("static".to_string(), empty())]),
			},
			drafts: DraftsConfig {
				primary: "local".into(),
				implementations: HashMap::from([("local".to_string(), empty())]),
			},
			storage: StorageConfig {
				primary: "memory".into(),
				implementations: HashMap::from([("memory".to_string(), empty())]),
			},
		}
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses, resolves environment variables and validates a configuration string.
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

	const BASE: &str = r#"
[catalog]
primary = "static"
[catalog.implementations.static]

[drafts]
primary = "local"
[drafts.implementations.local]

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("ORDERING_TEST_HOST", "localhost");
		std::env::set_var("ORDERING_TEST_PORT", "5432");

		let input = "host = \"${ORDERING_TEST_HOST}:${ORDERING_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("ORDERING_TEST_HOST");
		std::env::remove_var("ORDERING_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${ORDERING_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${ORDERING_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.unwrap_err().to_string().contains("ORDERING_MISSING_VAR"));
	}

	#[test]
	fn test_session_defaults() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.session.autosave_debounce_ms, 2000);
		assert_eq!(config.session.owner_id, None);
		assert_eq!(config.catalog.primary, "static");
	}

	#[test]
	fn test_owner_from_env() {
		std::env::set_var("ORDERING_TEST_OWNER", "customer-42");
		let config_str = format!(
			"[session]\nowner_id = \"${{ORDERING_TEST_OWNER}}\"\nautosave_debounce_ms = 500\n{}",
			BASE
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.session.owner_id.as_deref(), Some("customer-42"));
		assert_eq!(config.session.autosave_debounce_ms, 500);
		std::env::remove_var("ORDERING_TEST_OWNER");
	}

	#[test]
	fn test_primary_must_be_configured() {
		let config_str = BASE.replace("primary = \"memory\"", "primary = \"redis\"");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary storage 'redis'"));
	}

	#[test]
	fn test_debounce_upper_bound() {
		let config_str = format!("[session]\nautosave_debounce_ms = 120000\n{}", BASE);
		assert!(config_str.parse::<Config>().is_err());
	}

	#[test]
	fn test_for_testing_is_valid() {
		assert!(Config::for_testing().validate().is_ok());
	}
}
