//! Registry of implementation factories.
//!
//! Collects every storage backend, draft store and catalog source the binary
//! ships with, keyed by the name used in configuration.

use ordering_config::Config;
use ordering_core::{BuilderError, OrderingBuilder, OrderingEngine, OrderingFactories};
use ordering_drafts::DraftStoreFactory;
use ordering_pricing::CatalogSourceFactory;
use ordering_storage::StorageFactory;
use std::collections::HashMap;

pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub drafts: HashMap<String, DraftStoreFactory>,
	pub catalog: HashMap<String, CatalogSourceFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			drafts: HashMap::new(),
			catalog: HashMap::new(),
		}
	}

	/// Registry holding every built-in implementation.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		for (name, factory) in ordering_storage::get_all_implementations() {
			registry.register_storage(name, factory);
		}
		for (name, factory) in ordering_drafts::get_all_implementations() {
			registry.register_drafts(name, factory);
		}
		for (name, factory) in ordering_pricing::get_all_implementations() {
			registry.register_catalog(name, factory);
		}
		registry
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_drafts(&mut self, name: impl Into<String>, factory: DraftStoreFactory) {
		self.drafts.insert(name.into(), factory);
	}

	pub fn register_catalog(&mut self, name: impl Into<String>, factory: CatalogSourceFactory) {
		self.catalog.insert(name.into(), factory);
	}

	/// Builds an engine from `config` with the registered factories.
	pub fn build_engine(self, config: Config) -> Result<OrderingEngine, BuilderError> {
		OrderingBuilder::new(config).build(OrderingFactories {
			storage_factories: self.storage,
			draft_factories: self.drafts,
			catalog_factories: self.catalog,
		})
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::with_defaults()
	}
}
