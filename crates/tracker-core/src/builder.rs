//! Builder for composing an `OrderSync` from configured implementations.

use crate::event_bus::EventBus;
use crate::session::OrderSync;
use std::collections::HashMap;
use thiserror::Error;
use tracker_config::{Config, ImplementationsConfig};
use tracker_snapshot::{SnapshotError, SnapshotInterface, SnapshotService};
use tracker_stream::{StreamError, StreamInterface, StreamService};

/// Capacity of the session event bus.
const EVENT_BUS_CAPACITY: usize = 256;

/// Errors that can occur while building a session.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions keyed by implementation name.
pub struct TrackerFactories<SF, PF> {
	pub stream_factories: HashMap<String, SF>,
	pub snapshot_factories: HashMap<String, PF>,
}

/// Builds an `OrderSync` with pluggable stream and snapshot implementations.
pub struct TrackerBuilder {
	config: Config,
}

impl TrackerBuilder {
	/// Creates a new TrackerBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Instantiates the primary stream and snapshot implementations.
	pub fn build<SF, PF>(self, factories: TrackerFactories<SF, PF>) -> Result<OrderSync, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StreamInterface>, StreamError>,
		PF: Fn(&toml::Value) -> Result<Box<dyn SnapshotInterface>, SnapshotError>,
	{
		let stream_impl = create_primary::<dyn StreamInterface, StreamError, SF>(
			"stream",
			&self.config.stream,
			&factories.stream_factories,
		)?;
		let snapshot_impl = create_primary::<dyn SnapshotInterface, SnapshotError, PF>(
			"snapshot",
			&self.config.snapshot,
			&factories.snapshot_factories,
		)?;

		let session = self.config.session;
		if session.token.is_none() {
			tracing::warn!("No session token configured; only snapshots will be available");
		}

		let stream = StreamService::new(stream_impl);
		let snapshot = SnapshotService::new(snapshot_impl, session.token.clone());

		Ok(OrderSync::new(
			session,
			stream,
			snapshot,
			EventBus::new(EVENT_BUS_CAPACITY),
		))
	}
}

/// Runs the factory registered for the section's primary implementation.
fn create_primary<T: ?Sized, E, F>(
	component: &str,
	section: &ImplementationsConfig,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	E: std::fmt::Display,
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let name = &section.primary;
	let config = section.primary_config().ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' has no configuration",
			component, name
		))
	})?;
	let factory = factories.get(name).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"No {} implementation registered as '{}'",
			component, name
		))
	})?;

	match factory(config) {
		Ok(implementation) => {
			tracing::info!(component = %component, implementation = %name, "Loaded");
			Ok(implementation)
		},
		Err(e) => {
			tracing::error!(
				component = %component,
				implementation = %name,
				error = %e,
				"Failed to create implementation"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, name, e
			)))
		},
	}
}
