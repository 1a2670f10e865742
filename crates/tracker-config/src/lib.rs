//! Configuration module for the order tracker.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, which keeps the session token
//! out of the file itself.
//!
//! ## Modular Configuration Support
//!
//! A file may pull in others with `include = ["stream.toml", "snapshot.toml"]`.
//! Each top-level section must appear in exactly one of the files.

mod loader;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracker_types::{SessionToken, StatusFilter};

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

/// Top-level tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Session context: token, initial filter, merchant identity.
	#[serde(default)]
	pub session: SessionConfig,
	/// Live update transport.
	pub stream: ImplementationsConfig,
	/// Snapshot, status enumeration and create-order source.
	pub snapshot: ImplementationsConfig,
}

/// Session context handed to the synchronization core at construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
	/// Bearer token of the session. A blank value counts as absent.
	#[serde(default, deserialize_with = "deserialize_token")]
	pub token: Option<SessionToken>,
	/// Filter the first snapshot is loaded with.
	#[serde(default)]
	pub initial_filter: StatusFilter,
	/// Merchant name attached to created orders.
	#[serde(default)]
	pub merchant_name: Option<String>,
	/// Capacity of the session command channel.
	#[serde(default = "default_command_buffer")]
	pub command_buffer: usize,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			token: None,
			initial_filter: StatusFilter::Active,
			merchant_name: None,
			command_buffer: default_command_buffer(),
		}
	}
}

/// Returns the default session command channel capacity.
fn default_command_buffer() -> usize {
	32
}

fn deserialize_token<'de, D>(deserializer: D) -> Result<Option<SessionToken>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;
	Ok(raw.and_then(SessionToken::non_empty))
}

/// A component with pluggable implementations.
///
/// `primary` names the implementation to use; `implementations` maps each
/// implementation name to its raw settings, validated later by that
/// implementation's own schema.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImplementationsConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

impl ImplementationsConfig {
	/// Returns the settings table of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}

	fn validate(&self, section: &str) -> Result<(), ConfigError> {
		if self.implementations.is_empty() {
			return Err(ConfigError::Validation(format!(
				"At least one {} implementation must be configured",
				section
			)));
		}
		if self.primary.is_empty() {
			return Err(ConfigError::Validation(format!(
				"{} primary implementation cannot be empty",
				section
			)));
		}
		if !self.implementations.contains_key(&self.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary {} '{}' not found in implementations",
				section, self.primary
			)));
		}
		Ok(())
	}
}

fn env_var_pattern() -> Result<&'static Regex, ConfigError> {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	if let Some(re) = PATTERN.get() {
		return Ok(re);
	}
	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;
	Ok(PATTERN.get_or_init(|| re))
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of VAR_NAME and supports defaults
/// with `${VAR_NAME:-default_value}`. An empty default is allowed, which
/// is how an optional token is written.
///
/// Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = env_var_pattern()?;
	let mut missing = None;

	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match std::env::var(var_name) {
			Ok(value) => value,
			Err(_) => match caps.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					missing.get_or_insert_with(|| var_name.to_string());
					String::new()
				},
			},
		}
	});

	if let Some(var_name) = missing {
		return Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		)));
	}

	Ok(resolved.into_owned())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;

		let mut loader = loader::ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// Validates cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.session.command_buffer == 0 || self.session.command_buffer > 1024 {
			return Err(ConfigError::Validation(
				"session.command_buffer must be between 1 and 1024".into(),
			));
		}

		if let Some(merchant) = &self.session.merchant_name {
			if merchant.trim().is_empty() {
				return Err(ConfigError::Validation(
					"session.merchant_name cannot be blank".into(),
				));
			}
		}

		self.stream.validate("stream")?;
		self.snapshot.validate("snapshot")?;

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating.
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
[stream]
primary = "websocket"
[stream.implementations.websocket]
url = "ws://localhost:8000/ws/orders"

[snapshot]
primary = "http"
[snapshot.implementations.http]
base_url = "http://localhost:8000"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TRACKER_TEST_HOST", "localhost");
		std::env::set_var("TRACKER_TEST_PORT", "8000");

		let input = "url = \"ws://${TRACKER_TEST_HOST}:${TRACKER_TEST_PORT}/ws\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"ws://localhost:8000/ws\"");

		std::env::remove_var("TRACKER_TEST_HOST");
		std::env::remove_var("TRACKER_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${TRACKER_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "value = \"fallback\"");

		let empty = "token = \"${TRACKER_MISSING_VAR:-}\"";
		assert_eq!(resolve_env_vars(empty).unwrap(), "token = \"\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${TRACKER_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("TRACKER_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = BASE.parse().unwrap();
		assert!(config.session.token.is_none());
		assert_eq!(config.session.initial_filter, StatusFilter::Active);
		assert_eq!(config.session.command_buffer, 32);
		assert_eq!(config.stream.primary, "websocket");
		assert!(config.snapshot.primary_config().is_some());
	}

	#[test]
	fn test_session_section() {
		std::env::set_var("TRACKER_TEST_TOKEN", "secret-token");

		let config_str = format!(
			r#"
[session]
token = "${{TRACKER_TEST_TOKEN}}"
initial_filter = "delivered"
merchant_name = "acme"
{}"#,
			BASE
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(
			config.session.token.as_ref().map(|t| t.expose_secret()),
			Some("secret-token")
		);
		assert_eq!(
			config.session.initial_filter,
			StatusFilter::Status("delivered".into())
		);
		assert_eq!(config.session.merchant_name.as_deref(), Some("acme"));

		std::env::remove_var("TRACKER_TEST_TOKEN");
	}

	#[test]
	fn test_blank_token_is_absent() {
		let config_str = format!(
			r#"
[session]
token = "${{TRACKER_UNSET_TOKEN:-}}"
{}"#,
			BASE
		);
		let config: Config = config_str.parse().unwrap();
		assert!(config.session.token.is_none());
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = BASE.replace("primary = \"http\"", "primary = \"grpc\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary snapshot 'grpc' not found in implementations"));
	}

	#[test]
	fn test_command_buffer_bounds() {
		let config_str = format!("[session]\ncommand_buffer = 0\n{}", BASE);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("command_buffer"));
	}

	#[test]
	fn test_missing_stream_section() {
		let config_str = r#"
[snapshot]
primary = "http"
[snapshot.implementations.http]
base_url = "http://localhost:8000"
"#;
		assert!(matches!(
			Config::from_str(config_str),
			Err(ConfigError::Parse(_))
		));
	}
}
