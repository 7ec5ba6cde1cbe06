//! Builder pattern for constructing the ordering engine.
//!
//! Composes an [`OrderingEngine`] from storage, draft store and catalog
//! source implementations selected by configuration. Each implementation is
//! created by a factory function keyed by its configured name.

use crate::OrderingEngine;
use ordering_config::Config;
use ordering_drafts::{DraftStoreError, DraftStoreInterface, DraftStoreService};
use ordering_pricing::{CatalogError, CatalogService, CatalogSourceInterface};
use ordering_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every component the engine needs, keyed by
/// implementation name.
pub struct OrderingFactories<SF, DF, CF> {
	pub storage_factories: HashMap<String, SF>,
	pub draft_factories: HashMap<String, DF>,
	pub catalog_factories: HashMap<String, CF>,
}

/// Builder for constructing an [`OrderingEngine`] with pluggable implementations.
pub struct OrderingBuilder {
	config: Config,
}

impl OrderingBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine. Only the primary implementation of each component
	/// is kept, but every configured one must construct.
	pub fn build<SF, DF, CF>(
		self,
		factories: OrderingFactories<SF, DF, CF>,
	) -> Result<OrderingEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		DF: Fn(&toml::Value, Arc<StorageService>) -> Result<Box<dyn DraftStoreInterface>, DraftStoreError>,
		CF: Fn(&toml::Value) -> Result<Box<dyn CatalogSourceInterface>, CatalogError>,
	{
		let storage_backend = select_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
			|factory, config| factory(config),
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let draft_backend = select_primary(
			"drafts",
			&self.config.drafts.primary,
			&self.config.drafts.implementations,
			&factories.draft_factories,
			|factory, config| factory(config, storage.clone()),
		)?;
		let drafts = DraftStoreService::new(Arc::from(draft_backend));

		let catalog_source = select_primary(
			"catalog",
			&self.config.catalog.primary,
			&self.config.catalog.implementations,
			&factories.catalog_factories,
			|factory, config| factory(config),
		)?;
		let catalog = Arc::new(CatalogService::new(Arc::from(catalog_source)));

		Ok(OrderingEngine::new(self.config, drafts, catalog))
	}
}

/// Constructs every configured implementation of one component and returns
/// the primary one.
///
/// Names without a registered factory are skipped with a warning.
fn select_primary<F, T, E>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
	create: impl Fn(&F, &toml::Value) -> Result<T, E>,
) -> Result<T, BuilderError>
where
	E: Display,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component = %component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match create(factory, config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component = %component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component = %component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}
