//! Price breakdown and promo discount descriptors.

use crate::{DiscountType, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discount the pricing engine applies on top of the subtotal.
///
/// A promo is opaque to the engine until validated; afterwards the engine
/// only ever sees one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PromoDiscount {
	#[default]
	None,
	/// Fraction of the subtotal, e.g. `0.10` for 10 %.
	Percentage(Decimal),
	/// Fixed amount, capped at the subtotal.
	Fixed(Money),
}

impl PromoDiscount {
	/// Converts a validated promo descriptor into a discount.
	///
	/// Percentage descriptors carry percent points (10 = 10 %) and become a
	/// fraction here.
	pub fn from_descriptor(discount_type: DiscountType, value: Decimal) -> Self {
		match discount_type {
			DiscountType::Percentage => PromoDiscount::Percentage(value / Decimal::ONE_HUNDRED),
			DiscountType::Fixed => PromoDiscount::Fixed(value),
		}
	}

	pub fn is_none(&self) -> bool {
		matches!(self, PromoDiscount::None)
	}
}

/// Response of a promo code validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoValidation {
	pub valid: bool,
	pub discount_type: Option<DiscountType>,
	pub value: Option<Decimal>,
	pub message: String,
}

impl PromoValidation {
	/// A positive validation for the given descriptor.
	pub fn accepted(discount_type: DiscountType, value: Decimal) -> Self {
		Self {
			valid: true,
			discount_type: Some(discount_type),
			value: Some(value),
			message: "Promo code applied".to_string(),
		}
	}

	/// A negative validation carrying the reason shown to the customer.
	pub fn rejected(message: impl Into<String>) -> Self {
		Self {
			valid: false,
			discount_type: None,
			value: None,
			message: message.into(),
		}
	}

	/// The discount described by a valid response.
	///
	/// Returns `None` for invalid responses and for valid ones that are missing
	/// the type or the value.
	pub fn discount(&self) -> Option<PromoDiscount> {
		if !self.valid {
			return None;
		}
		match (self.discount_type, self.value) {
			(Some(discount_type), Some(value)) => {
				Some(PromoDiscount::from_descriptor(discount_type, value))
			}
			_ => None,
		}
	}
}

/// Derived price of an order. Recomputed on every relevant change and never
/// treated as the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
	pub base_price: Money,
	pub deadline_multiplier: Decimal,
	pub service_multiplier: Decimal,
	pub price_per_page: Money,
	pub pages_total: Money,
	pub sources_total: Money,
	pub extras_total: Money,
	pub subtotal: Money,
	pub discount: Money,
	pub final_price: Money,
}
