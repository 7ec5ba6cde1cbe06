//! Pricing module for the order wizard.
//!
//! This module turns order parameters into a price breakdown. It holds the
//! pure pricing engine, the catalog sources that supply base prices,
//! multipliers, extras and promo codes, a cached catalog service with a static
//! fallback, and the promo resolver that keeps at most one code applied.

use async_trait::async_trait;
use ordering_types::{ConfigSchema, ImplementationRegistry, PricingCatalog, PromoValidation};
use thiserror::Error;

pub mod catalog;
pub mod engine;
pub mod promo;
pub mod quote;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod static_catalog;
}

pub use catalog::CatalogService;
pub use engine::compute_breakdown;
pub use promo::{validate_promo_locally, AppliedPromo, PromoResolver};
pub use quote::{Quote, QuoteService};

/// Errors that can occur while fetching a catalog or validating a promo code.
#[derive(Debug, Error)]
pub enum CatalogError {
	/// Error that occurs while talking to a remote catalog.
	#[error("Network error: {0}")]
	Network(String),
	/// The catalog could not be read.
	#[error("Catalog unavailable: {0}")]
	Unavailable(String),
	/// The catalog was read but its content is unusable.
	#[error("Invalid catalog: {0}")]
	Invalid(String),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Errors surfaced when applying a promo code.
#[derive(Debug, Error)]
pub enum PromoError {
	#[error("Promo code is empty")]
	Empty,
	/// The code was checked and refused. `message` is shown to the customer.
	#[error("Promo code {code} rejected: {message}")]
	Rejected { code: String, message: String },
	/// The code could not be checked.
	#[error("Promo validation unavailable: {0}")]
	Unavailable(String),
}

/// Trait defining the interface for catalog sources.
///
/// A source supplies the pricing catalog and answers promo code checks. The
/// production source is a remote API; the bundled ones read the catalog from
/// configuration or a JSON file and check promo codes against it.
#[async_trait]
pub trait CatalogSourceInterface: Send + Sync {
	/// Returns the configuration schema for this catalog source.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the full pricing catalog.
	async fn get_catalog(&self) -> Result<PricingCatalog, CatalogError>;

	/// Checks whether `code` can be redeemed now.
	///
	/// A refused code is an `Ok` response with `valid == false`; `Err` means the
	/// check itself could not be carried out.
	async fn validate_promo(&self, code: &str) -> Result<PromoValidation, CatalogError>;
}

/// Type alias for catalog source factory functions.
pub type CatalogSourceFactory =
	fn(&toml::Value) -> Result<Box<dyn CatalogSourceInterface>, CatalogError>;

/// Registry trait for catalog source implementations.
pub trait CatalogSourceRegistry: ImplementationRegistry<Factory = CatalogSourceFactory> {}

/// Get all registered catalog source implementations.
///
/// Returns a vector of (name, factory) tuples for all available catalog sources.
pub fn get_all_implementations() -> Vec<(&'static str, CatalogSourceFactory)> {
	use implementations::{file, static_catalog};

	vec![
		(static_catalog::Registry::NAME, static_catalog::Registry::factory()),
		(file::Registry::NAME, file::Registry::factory()),
	]
}
