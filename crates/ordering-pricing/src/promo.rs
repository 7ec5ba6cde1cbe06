//! Promo code resolution.
//!
//! At most one promo code is applied at a time. Applying a new code replaces
//! the previous one only once the new code is confirmed; a refused code or a
//! failed check leaves no code applied.

use crate::{CatalogService, PromoError};
use chrono::{DateTime, Utc};
use ordering_types::{PricingCatalog, PromoDiscount, PromoValidation};

/// Checks a promo code against a catalog's promo table.
///
/// Used by catalog sources that hold the promo table themselves.
pub fn validate_promo_locally(
	catalog: &PricingCatalog,
	code: &str,
	now: DateTime<Utc>,
) -> PromoValidation {
	let Some(promo) = catalog.find_promo(code) else {
		return PromoValidation::rejected("Invalid promo code");
	};
	match promo.rejection_reason(now) {
		Some(reason) => PromoValidation::rejected(reason),
		None => PromoValidation::accepted(promo.discount_type, promo.value),
	}
}

/// A promo code confirmed by the catalog source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPromo {
	/// The code as entered, trimmed.
	pub code: String,
	pub discount: PromoDiscount,
}

/// Holds the single promo code applied to a session.
#[derive(Debug, Clone, Default)]
pub struct PromoResolver {
	applied: Option<AppliedPromo>,
}

impl PromoResolver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Validates `code` and applies it, replacing any previous code.
	///
	/// On any failure no code remains applied.
	pub async fn apply(
		&mut self,
		catalog: &CatalogService,
		code: &str,
	) -> Result<&AppliedPromo, PromoError> {
		let code = code.trim();
		if code.is_empty() {
			self.applied = None;
			return Err(PromoError::Empty);
		}

		let response = match catalog.validate_promo(code).await {
			Ok(response) => response,
			Err(e) => {
				self.applied = None;
				tracing::warn!(promo_code = %code, error = %e, "Promo validation failed");
				return Err(PromoError::Unavailable(e.to_string()));
			},
		};

		match response.discount() {
			Some(discount) => {
				tracing::info!(promo_code = %code, "Applied promo code");
				Ok(self.applied.insert(AppliedPromo {
					code: code.to_string(),
					discount,
				}))
			},
			None => {
				self.applied = None;
				tracing::debug!(promo_code = %code, message = %response.message, "Promo code rejected");
				Err(PromoError::Rejected {
					code: code.to_string(),
					message: response.message,
				})
			},
		}
	}

	/// Removes the applied code, returning it.
	pub fn clear(&mut self) -> Option<AppliedPromo> {
		self.applied.take()
	}

	pub fn applied(&self) -> Option<&AppliedPromo> {
		self.applied.as_ref()
	}

	/// The discount to hand to the pricing engine.
	pub fn discount(&self) -> PromoDiscount {
		self.applied
			.as_ref()
			.map(|applied| applied.discount)
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::tests::CountingSource;
	use chrono::Duration;
	use ordering_types::{DiscountType, PromoCode};
	use rust_decimal_macros::dec;
	use std::sync::Arc;

	fn promo(code: &str, discount_type: DiscountType, value: rust_decimal::Decimal) -> PromoCode {
		PromoCode {
			code: code.into(),
			discount_type,
			value,
			active: true,
			expires_at: None,
			usage_limit: None,
			usage_count: None,
		}
	}

	#[test]
	fn test_local_validation() {
		let now = Utc::now();
		let mut catalog = PricingCatalog::empty();
		catalog
			.promo_codes
			.push(promo("SAVE10", DiscountType::Percentage, dec!(10)));
		catalog.promo_codes.push(PromoCode {
			expires_at: Some(now - Duration::days(1)),
			..promo("OLD", DiscountType::Fixed, dec!(5))
		});
		catalog.promo_codes.push(PromoCode {
			usage_limit: Some(3),
			usage_count: Some(3),
			..promo("USEDUP", DiscountType::Fixed, dec!(5))
		});

		let accepted = validate_promo_locally(&catalog, " save10 ", now);
		assert!(accepted.valid);
		assert_eq!(accepted.discount(), Some(PromoDiscount::Percentage(dec!(0.10))));

		assert_eq!(
			validate_promo_locally(&catalog, "OLD", now).message,
			"Promo code has expired"
		);
		assert_eq!(
			validate_promo_locally(&catalog, "USEDUP", now).message,
			"Promo code usage limit reached"
		);
		assert!(!validate_promo_locally(&catalog, "NOPE", now).valid);
	}

	fn service_with(response: PromoValidation) -> CatalogService {
		let mut source = CountingSource::new(PricingCatalog::default());
		source.promo_response = Some(response);
		CatalogService::new(Arc::new(source))
	}

	#[tokio::test]
	async fn test_apply_valid_code() {
		let service = service_with(PromoValidation::accepted(DiscountType::Fixed, dec!(15)));
		let mut resolver = PromoResolver::new();

		let applied = resolver.apply(&service, " WELCOME ").await.unwrap();
		assert_eq!(applied.code, "WELCOME");
		assert_eq!(resolver.discount(), PromoDiscount::Fixed(dec!(15)));
	}

	#[tokio::test]
	async fn test_new_code_replaces_previous() {
		let mut resolver = PromoResolver::new();
		resolver
			.apply(
				&service_with(PromoValidation::accepted(DiscountType::Fixed, dec!(15))),
				"FIRST",
			)
			.await
			.unwrap();
		resolver
			.apply(
				&service_with(PromoValidation::accepted(DiscountType::Percentage, dec!(20))),
				"SECOND",
			)
			.await
			.unwrap();

		assert_eq!(resolver.applied().map(|p| p.code.as_str()), Some("SECOND"));
		assert_eq!(resolver.discount(), PromoDiscount::Percentage(dec!(0.20)));
	}

	#[tokio::test]
	async fn test_rejected_code_clears_previous() {
		let mut resolver = PromoResolver::new();
		resolver
			.apply(
				&service_with(PromoValidation::accepted(DiscountType::Fixed, dec!(15))),
				"FIRST",
			)
			.await
			.unwrap();

		let result = resolver
			.apply(&service_with(PromoValidation::rejected("Promo code has expired")), "OLD")
			.await;
		match result {
			Err(PromoError::Rejected { code, message }) => {
				assert_eq!(code, "OLD");
				assert_eq!(message, "Promo code has expired");
			},
			other => panic!("unexpected result: {:?}", other),
		}
		assert!(resolver.applied().is_none());
		assert_eq!(resolver.discount(), PromoDiscount::None);
	}

	#[tokio::test]
	async fn test_valid_response_without_value_is_rejected() {
		let mut resolver = PromoResolver::new();
		let response = PromoValidation {
			valid: true,
			discount_type: Some(DiscountType::Fixed),
			value: None,
			message: "ok".into(),
		};
		assert!(resolver.apply(&service_with(response), "HALF").await.is_err());
		assert!(resolver.applied().is_none());
	}

	#[tokio::test]
	async fn test_transport_failure_clears_code() {
		let mut resolver = PromoResolver::new();
		resolver
			.apply(
				&service_with(PromoValidation::accepted(DiscountType::Fixed, dec!(15))),
				"FIRST",
			)
			.await
			.unwrap();

		let failing = CatalogService::new(Arc::new(CountingSource::failing()));
		assert!(matches!(
			resolver.apply(&failing, "SECOND").await,
			Err(PromoError::Unavailable(_))
		));
		assert!(resolver.applied().is_none());
	}

	#[tokio::test]
	async fn test_empty_code_and_clear() {
		let mut resolver = PromoResolver::new();
		assert!(matches!(
			resolver
				.apply(&service_with(PromoValidation::rejected("x")), "   ")
				.await,
			Err(PromoError::Empty)
		));

		resolver
			.apply(
				&service_with(PromoValidation::accepted(DiscountType::Fixed, dec!(15))),
				"FIRST",
			)
			.await
			.unwrap();
		assert_eq!(resolver.clear().map(|p| p.code), Some("FIRST".to_string()));
		assert_eq!(resolver.discount(), PromoDiscount::None);
	}
}
