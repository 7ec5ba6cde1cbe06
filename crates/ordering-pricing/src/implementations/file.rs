//! JSON file catalog source.
//!
//! Reads the catalog from a JSON document on every fetch, so edits to the file
//! are picked up by [`CatalogService::refresh_catalog`](crate::CatalogService::refresh_catalog).

use crate::{
	validate_promo_locally, CatalogError, CatalogSourceFactory, CatalogSourceInterface,
	CatalogSourceRegistry,
};
use async_trait::async_trait;
use chrono::Utc;
use ordering_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, PricingCatalog, PromoValidation,
	Schema, ValidationError,
};
use std::path::PathBuf;

/// Catalog source that reads a JSON file.
pub struct FileCatalogSource {
	path: PathBuf,
}

impl FileCatalogSource {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}

	async fn read_catalog(&self) -> Result<PricingCatalog, CatalogError> {
		let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
			CatalogError::Unavailable(format!("{}: {}", self.path.display(), e))
		})?;
		serde_json::from_slice(&bytes).map_err(|e| CatalogError::Invalid(e.to_string()))
	}
}

#[async_trait]
impl CatalogSourceInterface for FileCatalogSource {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileCatalogSchema)
	}

	async fn get_catalog(&self) -> Result<PricingCatalog, CatalogError> {
		tracing::debug!(path = %self.path.display(), "Reading catalog file");
		self.read_catalog().await
	}

	async fn validate_promo(&self, code: &str) -> Result<PromoValidation, CatalogError> {
		let catalog = self.read_catalog().await?;
		Ok(validate_promo_locally(&catalog, code, Utc::now()))
	}
}

/// Configuration schema for the file catalog source.
pub struct FileCatalogSchema;

impl ConfigSchema for FileCatalogSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("path cannot be empty".to_string()),
				}
			})],
			vec![],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file catalog source from configuration.
///
/// Configuration parameters:
/// - `path`: JSON file holding the catalog (required)
pub fn create_catalog_source(
	config: &toml::Value,
) -> Result<Box<dyn CatalogSourceInterface>, CatalogError> {
	FileCatalogSchema
		.validate(config)
		.map_err(|e| CatalogError::Configuration(e.to_string()))?;

	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| CatalogError::Configuration("path is required".into()))?;

	Ok(Box::new(FileCatalogSource::new(PathBuf::from(path))))
}

/// Registry for the file catalog source.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = CatalogSourceFactory;

	fn factory() -> Self::Factory {
		create_catalog_source
	}
}

impl CatalogSourceRegistry for Registry {}
