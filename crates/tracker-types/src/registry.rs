//! Registry trait for self-registering implementations.
//!
//! Stream transports and snapshot sources each provide a Registry struct
//! that declares the name used for them in configuration files and the
//! factory function that builds them.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// For example "websocket" for `stream.implementations.websocket` or
	/// "http" for `snapshot.implementations.http`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
