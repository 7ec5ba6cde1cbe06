//! Static catalog source.
//!
//! Serves the built-in default catalog, optionally overridden from the
//! configuration section. Map entries override single keys; `extras` and
//! `free_includes` replace the default lists when present. Promo codes are
//! checked against the configured `promo_codes` table.

use crate::{
	validate_promo_locally, CatalogError, CatalogSourceFactory, CatalogSourceInterface,
	CatalogSourceRegistry,
};
use async_trait::async_trait;
use chrono::Utc;
use ordering_types::{
	deserialize_known_keys, AcademicLevel, ConfigSchema, DeadlineUrgency, Extra, Field, FieldType,
	FreeInclude, ImplementationRegistry, Money, PricingCatalog, PromoCode, PromoValidation, Schema,
	ServiceType, ValidationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Overrides applied on top of [`PricingCatalog::default`].
#[derive(Debug, Default, Deserialize)]
struct StaticCatalogConfig {
	#[serde(default, deserialize_with = "deserialize_known_keys")]
	base_price_per_level: HashMap<AcademicLevel, Money>,
	#[serde(default, deserialize_with = "deserialize_known_keys")]
	deadline_multipliers: HashMap<DeadlineUrgency, Decimal>,
	#[serde(default, deserialize_with = "deserialize_known_keys")]
	service_multipliers: HashMap<ServiceType, Decimal>,
	source_cost: Option<Money>,
	extras: Option<Vec<Extra>>,
	free_includes: Option<Vec<FreeInclude>>,
	#[serde(default)]
	promo_codes: Vec<PromoCode>,
	money_back_guarantee_days: Option<u32>,
	quote_expiration_days: Option<u32>,
}

impl StaticCatalogConfig {
	fn into_catalog(self) -> PricingCatalog {
		let mut catalog = PricingCatalog::default();
		catalog.base_price_per_level.extend(self.base_price_per_level);
		catalog.deadline_multipliers.extend(self.deadline_multipliers);
		catalog.service_multipliers.extend(self.service_multipliers);
		if let Some(source_cost) = self.source_cost {
			catalog.source_cost = source_cost;
		}
		if let Some(extras) = self.extras {
			catalog.extras = extras;
		}
		if let Some(free_includes) = self.free_includes {
			catalog.free_includes = free_includes;
		}
		catalog.promo_codes = self.promo_codes;
		if let Some(days) = self.money_back_guarantee_days {
			catalog.money_back_guarantee_days = days;
		}
		if let Some(days) = self.quote_expiration_days {
			catalog.quote_expiration_days = days;
		}
		catalog
	}
}

/// Catalog source backed by configuration.
pub struct StaticCatalogSource {
	catalog: PricingCatalog,
}

impl StaticCatalogSource {
	pub fn new(catalog: PricingCatalog) -> Self {
		Self { catalog }
	}
}

#[async_trait]
impl CatalogSourceInterface for StaticCatalogSource {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(StaticCatalogSchema)
	}

	async fn get_catalog(&self) -> Result<PricingCatalog, CatalogError> {
		Ok(self.catalog.clone())
	}

	async fn validate_promo(&self, code: &str) -> Result<PromoValidation, CatalogError> {
		Ok(validate_promo_locally(&self.catalog, code, Utc::now()))
	}
}

fn non_negative_decimal() -> FieldType {
	FieldType::Decimal {
		min: Some(Decimal::ZERO),
	}
}

/// Configuration schema for the static catalog source.
pub struct StaticCatalogSchema;

impl ConfigSchema for StaticCatalogSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let extra = Schema::new(
			vec![
				Field::new("id", FieldType::String),
				Field::new("name", FieldType::String),
				Field::new("price", non_negative_decimal()),
			],
			vec![Field::new("active", FieldType::Boolean)],
		);
		let free_include = Schema::new(
			vec![
				Field::new("name", FieldType::String),
				Field::new("display_price", FieldType::String),
			],
			vec![Field::new("active", FieldType::Boolean)],
		);
		let promo_code = Schema::new(
			vec![
				Field::new("code", FieldType::String),
				Field::new("discount_type", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some("percentage") | Some("fixed") => Ok(()),
						_ => Err("discount_type must be 'percentage' or 'fixed'".to_string()),
					}
				}),
				Field::new("value", non_negative_decimal()),
			],
			vec![
				Field::new("active", FieldType::Boolean),
				Field::new("expires_at", FieldType::String),
				Field::new(
					"usage_limit",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new(
					"usage_count",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
			],
		);

		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"base_price_per_level",
					FieldType::Map(Box::new(non_negative_decimal())),
				),
				Field::new(
					"deadline_multipliers",
					FieldType::Map(Box::new(non_negative_decimal())),
				),
				Field::new(
					"service_multipliers",
					FieldType::Map(Box::new(non_negative_decimal())),
				),
				Field::new("source_cost", non_negative_decimal()),
				Field::new("extras", FieldType::Array(Box::new(FieldType::Table(extra)))),
				Field::new(
					"free_includes",
					FieldType::Array(Box::new(FieldType::Table(free_include))),
				),
				Field::new(
					"promo_codes",
					FieldType::Array(Box::new(FieldType::Table(promo_code))),
				),
				Field::new(
					"money_back_guarantee_days",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new(
					"quote_expiration_days",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a static catalog source from configuration.
///
/// An empty section serves the built-in default catalog unchanged.
pub fn create_catalog_source(
	config: &toml::Value,
) -> Result<Box<dyn CatalogSourceInterface>, CatalogError> {
	StaticCatalogSchema
		.validate(config)
		.map_err(|e| CatalogError::Configuration(e.to_string()))?;

	let overrides: StaticCatalogConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| CatalogError::Configuration(e.message().to_string()))?;
	let catalog = overrides.into_catalog();
	catalog
		.validate()
		.map_err(|e| CatalogError::Configuration(e.to_string()))?;

	Ok(Box::new(StaticCatalogSource::new(catalog)))
}

/// Registry for the static catalog source.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "static";
	type Factory = CatalogSourceFactory;

	fn factory() -> Self::Factory {
		create_catalog_source
	}
}

impl CatalogSourceRegistry for Registry {}
