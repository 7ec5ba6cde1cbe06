//! Pricing catalog and the static default tables.
//!
//! The catalog is loaded once per session and treated as immutable afterwards.
//! Lookups never fail: a key missing from the catalog resolves through a single
//! fallback policy per table, defined here and nowhere else.
//!
//! | Lookup                | Fallback when the key is absent                 |
//! |-----------------------|-------------------------------------------------|
//! | `base_price`          | [`default_base_price`] for the level            |
//! | `deadline_multiplier` | [`NEUTRAL_MULTIPLIER`] (1.0)                    |
//! | `service_multiplier`  | [`NEUTRAL_MULTIPLIER`] (1.0)                    |
//!
//! [`PricingCatalog::default`] is the complete static catalog used when the
//! remote catalog cannot be fetched at all.

use crate::utils::deserialize_known_keys;
use crate::{AcademicLevel, DeadlineUrgency, Money, ServiceType, ValidationError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Multiplier applied when a deadline or service key is missing from the catalog.
pub const NEUTRAL_MULTIPLIER: Decimal = Decimal::ONE;

/// Cost per cited source when the catalog omits it.
pub const DEFAULT_SOURCE_COST: Money = dec!(2.50);

/// Money-back guarantee window when the catalog omits it.
pub const DEFAULT_MONEY_BACK_GUARANTEE_DAYS: u32 = 30;

/// Quote validity window when the catalog omits it.
pub const DEFAULT_QUOTE_EXPIRATION_DAYS: u32 = 7;

/// Base per-page price used when the catalog has no entry for a level.
pub fn default_base_price(level: AcademicLevel) -> Money {
	match level {
		AcademicLevel::HighSchool => dec!(15.00),
		AcademicLevel::Undergraduate => dec!(20.00),
		AcademicLevel::Masters => dec!(25.00),
		AcademicLevel::Phd => dec!(30.00),
	}
}

/// Deadline multipliers of the static default catalog.
pub fn default_deadline_multiplier(urgency: DeadlineUrgency) -> Decimal {
	match urgency {
		DeadlineUrgency::Hours6 => dec!(2.50),
		DeadlineUrgency::Hours12 => dec!(2.00),
		DeadlineUrgency::Hours24 => dec!(1.75),
		DeadlineUrgency::Hours48 => dec!(1.50),
		DeadlineUrgency::Days3 => dec!(1.30),
		DeadlineUrgency::Days5 => dec!(1.15),
		DeadlineUrgency::Days7 => dec!(1.00),
		DeadlineUrgency::Days14 => dec!(0.90),
	}
}

/// Service multipliers of the static default catalog.
pub fn default_service_multiplier(service: ServiceType) -> Decimal {
	match service {
		ServiceType::Writing => dec!(1.00),
		ServiceType::Rewriting => dec!(0.80),
		ServiceType::Editing => dec!(0.60),
		ServiceType::Proofreading => dec!(0.40),
		ServiceType::ProblemSolving => dec!(1.20),
	}
}

/// An optional paid add-on selectable during review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extra {
	pub id: String,
	pub name: String,
	pub price: Money,
	#[serde(default = "default_active")]
	pub active: bool,
}

/// A feature bundled at no charge. Shown for perceived value, never priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeInclude {
	pub name: String,
	pub display_price: String,
	#[serde(default = "default_active")]
	pub active: bool,
}

/// How a promo code's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
	/// `value` is in percent points (10 = 10 %).
	Percentage,
	/// `value` is an amount of money.
	Fixed,
}

/// A promo code as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
	pub code: String,
	pub discount_type: DiscountType,
	pub value: Decimal,
	#[serde(default = "default_active")]
	pub active: bool,
	#[serde(default)]
	pub expires_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub usage_limit: Option<u32>,
	#[serde(default)]
	pub usage_count: Option<u32>,
}

impl PromoCode {
	/// Returns why the code cannot be redeemed at `now`, or `None` if it can.
	pub fn rejection_reason(&self, now: DateTime<Utc>) -> Option<&'static str> {
		if !self.active {
			return Some("Promo code is no longer active");
		}
		if self.expires_at.is_some_and(|expires_at| expires_at <= now) {
			return Some("Promo code has expired");
		}
		if let Some(limit) = self.usage_limit {
			if self.usage_count.unwrap_or(0) >= limit {
				return Some("Promo code usage limit reached");
			}
		}
		None
	}
}

fn default_active() -> bool {
	true
}

fn default_source_cost() -> Money {
	DEFAULT_SOURCE_COST
}

fn default_money_back_guarantee_days() -> u32 {
	DEFAULT_MONEY_BACK_GUARANTEE_DAYS
}

fn default_quote_expiration_days() -> u32 {
	DEFAULT_QUOTE_EXPIRATION_DAYS
}

/// Configuration describing base prices, multipliers, extras, free includes
/// and promo codes.
///
/// Map entries whose key is not a known level, tier or service are dropped
/// while deserializing, so a catalog that grows a new tier still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingCatalog {
	#[serde(default, deserialize_with = "deserialize_known_keys")]
	pub base_price_per_level: HashMap<AcademicLevel, Money>,
	#[serde(default, deserialize_with = "deserialize_known_keys")]
	pub deadline_multipliers: HashMap<DeadlineUrgency, Decimal>,
	#[serde(default, deserialize_with = "deserialize_known_keys")]
	pub service_multipliers: HashMap<ServiceType, Decimal>,
	#[serde(default = "default_source_cost")]
	pub source_cost: Money,
	#[serde(default)]
	pub extras: Vec<Extra>,
	#[serde(default)]
	pub free_includes: Vec<FreeInclude>,
	#[serde(default)]
	pub promo_codes: Vec<PromoCode>,
	#[serde(default = "default_money_back_guarantee_days")]
	pub money_back_guarantee_days: u32,
	#[serde(default = "default_quote_expiration_days")]
	pub quote_expiration_days: u32,
}

impl PricingCatalog {
	/// Catalog with no priced entries. Every lookup resolves through the fallbacks.
	pub fn empty() -> Self {
		Self {
			base_price_per_level: HashMap::new(),
			deadline_multipliers: HashMap::new(),
			service_multipliers: HashMap::new(),
			source_cost: DEFAULT_SOURCE_COST,
			extras: Vec::new(),
			free_includes: Vec::new(),
			promo_codes: Vec::new(),
			money_back_guarantee_days: DEFAULT_MONEY_BACK_GUARANTEE_DAYS,
			quote_expiration_days: DEFAULT_QUOTE_EXPIRATION_DAYS,
		}
	}

	/// Base per-page price for a level.
	pub fn base_price(&self, level: AcademicLevel) -> Money {
		self.base_price_per_level
			.get(&level)
			.copied()
			.unwrap_or_else(|| default_base_price(level))
	}

	/// Multiplier for a deadline tier.
	pub fn deadline_multiplier(&self, urgency: DeadlineUrgency) -> Decimal {
		self.deadline_multipliers
			.get(&urgency)
			.copied()
			.unwrap_or(NEUTRAL_MULTIPLIER)
	}

	/// Multiplier for a service type.
	pub fn service_multiplier(&self, service: ServiceType) -> Decimal {
		self.service_multipliers
			.get(&service)
			.copied()
			.unwrap_or(NEUTRAL_MULTIPLIER)
	}

	/// Looks up an extra by id, active or not.
	pub fn extra(&self, id: &str) -> Option<&Extra> {
		self.extras.iter().find(|extra| extra.id == id)
	}

	/// Extras that can currently be selected, in catalog order.
	pub fn active_extras(&self) -> impl Iterator<Item = &Extra> {
		self.extras.iter().filter(|extra| extra.active)
	}

	/// Free includes that are currently advertised.
	pub fn active_free_includes(&self) -> impl Iterator<Item = &FreeInclude> {
		self.free_includes.iter().filter(|include| include.active)
	}

	/// Finds a promo code, ignoring case and surrounding whitespace.
	pub fn find_promo(&self, code: &str) -> Option<&PromoCode> {
		let code = code.trim();
		self.promo_codes
			.iter()
			.find(|promo| promo.code.eq_ignore_ascii_case(code))
	}

	/// Checks that every price and multiplier is non-negative and that
	/// percentage promos stay within 0..=100.
	pub fn validate(&self) -> Result<(), ValidationError> {
		for (level, price) in &self.base_price_per_level {
			non_negative(&format!("base_price_per_level.{}", level), *price)?;
		}
		for (urgency, multiplier) in &self.deadline_multipliers {
			non_negative(&format!("deadline_multipliers.{}", urgency), *multiplier)?;
		}
		for (service, multiplier) in &self.service_multipliers {
			non_negative(&format!("service_multipliers.{}", service), *multiplier)?;
		}
		non_negative("source_cost", self.source_cost)?;
		for extra in &self.extras {
			non_negative(&format!("extras.{}.price", extra.id), extra.price)?;
		}
		for promo in &self.promo_codes {
			let field = format!("promo_codes.{}.value", promo.code);
			non_negative(&field, promo.value)?;
			if promo.discount_type == DiscountType::Percentage && promo.value > dec!(100) {
				return Err(ValidationError::InvalidValue {
					field,
					message: "Percentage discount cannot exceed 100".into(),
				});
			}
		}
		Ok(())
	}
}

fn non_negative(field: &str, value: Decimal) -> Result<(), ValidationError> {
	if value.is_sign_negative() && !value.is_zero() {
		return Err(ValidationError::InvalidValue {
			field: field.to_string(),
			message: format!("must be non-negative, got {}", value),
		});
	}
	Ok(())
}

/// Extras offered by the static default catalog.
pub fn default_extras() -> Vec<Extra> {
	[
		("plagiarism-report", "Plagiarism Report", dec!(9.99)),
		("one-page-summary", "One-Page Summary", dec!(17.99)),
		("priority-support", "Priority Support", dec!(14.99)),
		("top-writer", "Top Writer", dec!(19.99)),
	]
	.into_iter()
	.map(|(id, name, price)| Extra {
		id: id.to_string(),
		name: name.to_string(),
		price,
		active: true,
	})
	.collect()
}

/// Free includes advertised by the static default catalog.
pub fn default_free_includes() -> Vec<FreeInclude> {
	[
		("Title page", "$10"),
		("Bibliography", "$15"),
		("Formatting", "$8"),
		("Unlimited revisions", "$30"),
	]
	.into_iter()
	.map(|(name, display_price)| FreeInclude {
		name: name.to_string(),
		display_price: display_price.to_string(),
		active: true,
	})
	.collect()
}

impl Default for PricingCatalog {
	/// The static default catalog. Total over every level, tier and service.
	fn default() -> Self {
		Self {
			base_price_per_level: AcademicLevel::all()
				.map(|level| (level, default_base_price(level)))
				.collect(),
			deadline_multipliers: DeadlineUrgency::all()
				.map(|urgency| (urgency, default_deadline_multiplier(urgency)))
				.collect(),
			service_multipliers: ServiceType::all()
				.map(|service| (service, default_service_multiplier(service)))
				.collect(),
			source_cost: DEFAULT_SOURCE_COST,
			extras: default_extras(),
			free_includes: default_free_includes(),
			promo_codes: Vec::new(),
			money_back_guarantee_days: DEFAULT_MONEY_BACK_GUARANTEE_DAYS,
			quote_expiration_days: DEFAULT_QUOTE_EXPIRATION_DAYS,
		}
	}
}
