//! Dynamic factory registry for tracker implementations.
//!
//! Every implementation crate lists its factories through
//! `get_all_implementations()`. The registry collects them once so the
//! binary can pick implementations by the names used in configuration.

use std::collections::HashMap;
use std::sync::OnceLock;
use tracker_config::Config;
use tracker_core::{OrderSync, TrackerBuilder, TrackerFactories};
use tracker_snapshot::SnapshotFactory;
use tracker_stream::StreamFactory;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub stream: HashMap<String, StreamFactory>,
	pub snapshot: HashMap<String, SnapshotFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			stream: HashMap::new(),
			snapshot: HashMap::new(),
		}
	}

	/// Register a stream implementation
	pub fn register_stream(&mut self, name: impl Into<String>, factory: StreamFactory) {
		self.stream.insert(name.into(), factory);
	}

	/// Register a snapshot implementation
	pub fn register_snapshot(&mut self, name: impl Into<String>, factory: SnapshotFactory) {
		self.snapshot.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

// Global registry instance
static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in tracker_stream::get_all_implementations() {
			tracing::debug!("Registering stream implementation: {}", name);
			registry.register_stream(name, factory);
		}

		for (name, factory) in tracker_snapshot::get_all_implementations() {
			tracing::debug!("Registering snapshot implementation: {}", name);
			registry.register_snapshot(name, factory);
		}

		registry
	})
}

/// Macro to build factories from config implementations
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds a synchronization session from configuration.
///
/// Every implementation named in the config must be registered, not only
/// the primary one, so a typo in an unused table is still reported.
pub fn build_tracker_from_config(config: Config) -> Result<OrderSync, Box<dyn std::error::Error>> {
	let registry = initialize_registry();

	let stream_factories = build_factories!(registry, config.stream.implementations, stream, "stream");
	let snapshot_factories = build_factories!(
		registry,
		config.snapshot.implementations,
		snapshot,
		"snapshot"
	);

	let factories = TrackerFactories {
		stream_factories,
		snapshot_factories,
	};

	Ok(TrackerBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	const CONFIG: &str = r#"
[session]
token = "token-123"
merchant_name = "Corner Shop"

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
	fn test_registry_contains_all_implementations() {
		let registry = initialize_registry();
		assert!(registry.stream.contains_key("websocket"));
		assert!(registry.snapshot.contains_key("http"));
	}

	#[test]
	fn test_build_tracker_from_config() {
		let config: Config = CONFIG.parse().unwrap();
		let sync = build_tracker_from_config(config).unwrap();
		assert_eq!(sync.session().merchant_name.as_deref(), Some("Corner Shop"));
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let config: Config = CONFIG
			.replace(
				"[snapshot.implementations.http]",
				"[snapshot.implementations.grpc]\nendpoint = \"x\"\n[snapshot.implementations.http]",
			)
			.parse()
			.unwrap();

		let error = build_tracker_from_config(config).err().unwrap().to_string();
		assert!(error.contains("Unknown snapshot implementation 'grpc'"));
		assert!(error.contains("Available: [http]"));
	}
}
