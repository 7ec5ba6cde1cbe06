//! Cached access to the pricing catalog.
//!
//! The catalog is fetched once per session and shared read-only afterwards.
//! Concurrent first loads share a single fetch. When the source fails, callers
//! that need some catalog get the static default instead of an error, and the
//! source is not asked again until the retry interval has passed.

use crate::{CatalogError, CatalogSourceInterface};
use ordering_types::{PricingCatalog, PromoValidation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// How long a failed fetch keeps quotes on the static default.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// The last failed fetch.
#[derive(Debug, Clone)]
struct Fallback {
	failed_at: Instant,
	reason: String,
}

/// Service that loads, validates and caches the pricing catalog.
pub struct CatalogService {
	source: Arc<dyn CatalogSourceInterface>,
	cached: RwLock<Option<Arc<PricingCatalog>>>,
	/// Held while fetching so only one load is in flight.
	fetch_lock: Mutex<()>,
	fallback: RwLock<Option<Fallback>>,
	retry_interval: Duration,
	default_catalog: Arc<PricingCatalog>,
}

impl CatalogService {
	pub fn new(source: Arc<dyn CatalogSourceInterface>) -> Self {
		Self {
			source,
			cached: RwLock::new(None),
			fetch_lock: Mutex::new(()),
			fallback: RwLock::new(None),
			retry_interval: DEFAULT_RETRY_INTERVAL,
			default_catalog: Arc::new(PricingCatalog::default()),
		}
	}

	pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
		self.retry_interval = retry_interval;
		self
	}

	/// Returns the cached catalog, fetching it on first use.
	///
	/// A fetched catalog that fails validation is reported as
	/// [`CatalogError::Invalid`] and is not cached.
	pub async fn load_catalog(&self) -> Result<Arc<PricingCatalog>, CatalogError> {
		if let Some(catalog) = self.cached.read().await.clone() {
			return Ok(catalog);
		}

		let _guard = self.fetch_lock.lock().await;
		// Another caller may have finished the fetch while we waited
		if let Some(catalog) = self.cached.read().await.clone() {
			return Ok(catalog);
		}
		self.fetch_and_cache().await
	}

	/// Drops the cached catalog and fetches it again.
	///
	/// On failure the cache stays empty, so the next load retries.
	pub async fn refresh_catalog(&self) -> Result<Arc<PricingCatalog>, CatalogError> {
		let _guard = self.fetch_lock.lock().await;
		*self.cached.write().await = None;
		self.fetch_and_cache().await
	}

	/// Returns the loaded catalog, or the static default if it cannot be loaded.
	pub async fn catalog_or_default(&self) -> Arc<PricingCatalog> {
		self.resolve().await.0
	}

	/// Like [`catalog_or_default`](Self::catalog_or_default), also returning the
	/// reason when the default was used.
	///
	/// After a failed fetch the default is served without contacting the
	/// source until the retry interval has passed or the catalog is refreshed.
	pub async fn resolve(&self) -> (Arc<PricingCatalog>, Option<String>) {
		if let Some(catalog) = self.cached.read().await.clone() {
			return (catalog, None);
		}
		if let Some(fallback) = self.fallback.read().await.as_ref() {
			if fallback.failed_at.elapsed() < self.retry_interval {
				return (self.default_catalog.clone(), Some(fallback.reason.clone()));
			}
		}

		match self.load_catalog().await {
			Ok(catalog) => (catalog, None),
			Err(e) => {
				tracing::warn!(
					error = %e,
					retry_in_secs = self.retry_interval.as_secs(),
					"Catalog unavailable, using static default"
				);
				(self.default_catalog.clone(), Some(e.to_string()))
			},
		}
	}

	/// Returns the catalog if it has already been loaded, without fetching.
	pub async fn cached(&self) -> Option<Arc<PricingCatalog>> {
		self.cached.read().await.clone()
	}

	/// Forwards a promo check to the catalog source.
	pub async fn validate_promo(&self, code: &str) -> Result<PromoValidation, CatalogError> {
		self.source.validate_promo(code).await
	}

	async fn fetch_and_cache(&self) -> Result<Arc<PricingCatalog>, CatalogError> {
		let fetched = self.source.get_catalog().await.and_then(|catalog| {
			catalog
				.validate()
				.map_err(|e| CatalogError::Invalid(e.to_string()))?;
			Ok(catalog)
		});
		let catalog = match fetched {
			Ok(catalog) => Arc::new(catalog),
			Err(e) => {
				*self.fallback.write().await = Some(Fallback {
					failed_at: Instant::now(),
					reason: e.to_string(),
				});
				return Err(e);
			},
		};

		*self.fallback.write().await = None;
		*self.cached.write().await = Some(catalog.clone());
		tracing::info!(
			extras = catalog.extras.len(),
			promo_codes = catalog.promo_codes.len(),
			"Loaded pricing catalog"
		);
		Ok(catalog)
	}
}
