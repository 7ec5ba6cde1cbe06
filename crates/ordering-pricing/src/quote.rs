//! Price quotes for a session.

use crate::{compute_breakdown, AppliedPromo, CatalogService, PromoError, PromoResolver};
use ordering_types::{OrderParameters, PricingBreakdown};
use std::sync::Arc;

/// A price breakdown together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
	pub breakdown: PricingBreakdown,
	/// Set when the catalog could not be loaded and the static default was used.
	pub fallback_reason: Option<String>,
}

/// Combines the catalog, the applied promo and the pricing engine.
///
/// Owned by one session; the catalog service behind it may be shared.
pub struct QuoteService {
	catalog: Arc<CatalogService>,
	promo: PromoResolver,
}

impl QuoteService {
	pub fn new(catalog: Arc<CatalogService>) -> Self {
		Self {
			catalog,
			promo: PromoResolver::new(),
		}
	}

	/// Prices `params` with the current catalog and promo.
	///
	/// Page and source counts are clamped first.
	pub async fn quote(&self, params: &OrderParameters) -> Quote {
		let (catalog, fallback_reason) = self.catalog.resolve().await;
		Quote {
			breakdown: compute_breakdown(&catalog, &params.clamped(), &self.promo.discount()),
			fallback_reason,
		}
	}

	pub async fn apply_promo(&mut self, code: &str) -> Result<&AppliedPromo, PromoError> {
		self.promo.apply(&self.catalog, code).await
	}

	pub fn clear_promo(&mut self) -> Option<AppliedPromo> {
		self.promo.clear()
	}

	pub fn applied_promo(&self) -> Option<&AppliedPromo> {
		self.promo.applied()
	}

	pub fn catalog(&self) -> &Arc<CatalogService> {
		&self.catalog
	}
}
