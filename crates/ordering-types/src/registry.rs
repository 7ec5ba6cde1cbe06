//! Registry trait for self-registering implementations.
//!
//! Storage backends, draft stores and catalog sources each expose a `Registry`
//! struct implementing this trait, so the service binary can build a
//! name-to-factory map without knowing the concrete types.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// Name used in configuration files to reference this implementation,
	/// e.g. "memory" for `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// Factory function type this implementation provides.
	type Factory;

	/// Returns the factory that builds this implementation from its config section.
	fn factory() -> Self::Factory;
}
