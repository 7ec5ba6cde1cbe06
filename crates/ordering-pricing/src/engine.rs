//! Deterministic pricing engine.
//!
//! Every intermediate aggregate is rounded to the cent before it feeds the
//! next one, so a breakdown shown to the customer always adds up.

use ordering_types::{round2, OrderParameters, PricingBreakdown, PricingCatalog, PromoDiscount};
use rust_decimal::Decimal;

/// Computes the price breakdown of an order.
///
/// Pure and total: missing catalog keys resolve through the catalog's
/// fallbacks, unknown or inactive extras contribute nothing, and the discount
/// is always kept within `0..=subtotal`. Callers are expected to pass
/// parameters already clamped with [`OrderParameters::clamped`].
pub fn compute_breakdown(
	catalog: &PricingCatalog,
	params: &OrderParameters,
	promo: &PromoDiscount,
) -> PricingBreakdown {
	let base_price = catalog.base_price(params.academic_level);
	let deadline_multiplier = catalog.deadline_multiplier(params.deadline_urgency);
	let service_multiplier = catalog.service_multiplier(params.service_type);

	let price_per_page = round2(base_price * deadline_multiplier * service_multiplier);
	let pages_total = round2(price_per_page * Decimal::from(params.number_of_pages));
	let sources_total = round2(catalog.source_cost * Decimal::from(params.number_of_sources));
	let extras_total = round2(
		params
			.selected_extra_ids
			.iter()
			.filter_map(|id| catalog.extra(id))
			.filter(|extra| extra.active)
			.map(|extra| extra.price)
			.sum(),
	);

	let subtotal = round2(pages_total + sources_total + extras_total);
	let discount = discount_for(promo, subtotal);
	let final_price = clamp_non_negative(round2(subtotal - discount));

	PricingBreakdown {
		base_price,
		deadline_multiplier,
		service_multiplier,
		price_per_page,
		pages_total,
		sources_total,
		extras_total,
		subtotal,
		discount,
		final_price,
	}
}

fn discount_for(promo: &PromoDiscount, subtotal: Decimal) -> Decimal {
	let raw = match promo {
		PromoDiscount::None => return Decimal::ZERO,
		PromoDiscount::Percentage(rate) => subtotal * *rate,
		PromoDiscount::Fixed(amount) => *amount,
	};
	clamp_non_negative(round2(raw.min(subtotal)))
}

/// Clamps below at zero, keeping the scale of non-negative values.
fn clamp_non_negative(value: Decimal) -> Decimal {
	if value.is_sign_negative() && !value.is_zero() {
		Decimal::ZERO
	} else {
		value
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ordering_types::{
		AcademicLevel, DeadlineUrgency, Extra, ServiceType, NEUTRAL_MULTIPLIER,
	};
	use rust_decimal_macros::dec;
	use std::collections::BTreeSet;

	fn scenario_catalog() -> PricingCatalog {
		let mut catalog = PricingCatalog::empty();
		catalog
			.base_price_per_level
			.insert(AcademicLevel::Undergraduate, dec!(20.00));
		catalog
			.deadline_multipliers
			.insert(DeadlineUrgency::Hours48, dec!(1.5));
		catalog
			.service_multipliers
			.insert(ServiceType::Writing, dec!(1.0));
		catalog.source_cost = dec!(5.00);
		catalog.extras.push(Extra {
			id: "plagiarism-report".into(),
			name: "Plagiarism Report".into(),
			price: dec!(8.00),
			active: true,
		});
		catalog
	}

	fn scenario_params() -> OrderParameters {
		OrderParameters {
			academic_level: AcademicLevel::Undergraduate,
			service_type: ServiceType::Writing,
			deadline_urgency: DeadlineUrgency::Hours48,
			number_of_pages: 4,
			number_of_sources: 2,
			selected_extra_ids: BTreeSet::from(["plagiarism-report".to_string()]),
			..Default::default()
		}
	}

	#[test]
	fn test_breakdown_without_promo() {
		let breakdown = compute_breakdown(&scenario_catalog(), &scenario_params(), &PromoDiscount::None);
		assert_eq!(breakdown.base_price, dec!(20.00));
		assert_eq!(breakdown.price_per_page, dec!(30.00));
		assert_eq!(breakdown.pages_total, dec!(120.00));
		assert_eq!(breakdown.sources_total, dec!(10.00));
		assert_eq!(breakdown.extras_total, dec!(8.00));
		assert_eq!(breakdown.subtotal, dec!(138.00));
		assert_eq!(breakdown.discount, Decimal::ZERO);
		assert_eq!(breakdown.final_price, dec!(138.00));
	}

	#[test]
	fn test_percentage_promo() {
		let breakdown = compute_breakdown(
			&scenario_catalog(),
			&scenario_params(),
			&PromoDiscount::Percentage(dec!(0.10)),
		);
		assert_eq!(breakdown.discount, dec!(13.80));
		assert_eq!(breakdown.final_price, dec!(124.20));
	}

	#[test]
	fn test_fixed_promo_is_capped_at_subtotal() {
		let breakdown = compute_breakdown(
			&scenario_catalog(),
			&scenario_params(),
			&PromoDiscount::Fixed(dec!(200)),
		);
		assert_eq!(breakdown.discount, dec!(138.00));
		assert_eq!(breakdown.final_price, dec!(0.00));
		assert_eq!(breakdown.final_price.to_string(), "0.00");
	}

	#[test]
	fn test_missing_deadline_uses_neutral_multiplier() {
		let params = OrderParameters {
			deadline_urgency: DeadlineUrgency::Hours6,
			..scenario_params()
		};
		let breakdown = compute_breakdown(&scenario_catalog(), &params, &PromoDiscount::None);
		assert_eq!(breakdown.deadline_multiplier, NEUTRAL_MULTIPLIER);
		assert_eq!(breakdown.price_per_page, dec!(20.00));
	}

	#[test]
	fn test_missing_base_price_uses_level_default() {
		let params = OrderParameters {
			academic_level: AcademicLevel::Masters,
			..scenario_params()
		};
		let breakdown = compute_breakdown(&scenario_catalog(), &params, &PromoDiscount::None);
		assert_eq!(breakdown.base_price, dec!(25.00));
	}

	#[test]
	fn test_unknown_and_inactive_extras_contribute_nothing() {
		let mut catalog = scenario_catalog();
		catalog.extras.push(Extra {
			id: "retired".into(),
			name: "Retired".into(),
			price: dec!(50.00),
			active: false,
		});
		let params = OrderParameters {
			selected_extra_ids: BTreeSet::from(["retired".to_string(), "no-such-extra".to_string()]),
			..scenario_params()
		};
		let breakdown = compute_breakdown(&catalog, &params, &PromoDiscount::None);
		assert_eq!(breakdown.extras_total, Decimal::ZERO);
	}

	#[test]
	fn test_intermediate_rounding() {
		let mut catalog = PricingCatalog::empty();
		catalog
			.base_price_per_level
			.insert(AcademicLevel::HighSchool, dec!(15.00));
		catalog
			.deadline_multipliers
			.insert(DeadlineUrgency::Days5, dec!(1.15));
		catalog
			.service_multipliers
			.insert(ServiceType::Proofreading, dec!(0.33));
		let params = OrderParameters {
			academic_level: AcademicLevel::HighSchool,
			deadline_urgency: DeadlineUrgency::Days5,
			service_type: ServiceType::Proofreading,
			number_of_pages: 3,
			number_of_sources: 0,
			..Default::default()
		};
		let breakdown = compute_breakdown(&catalog, &params, &PromoDiscount::None);
		// 15 * 1.15 * 0.33 = 5.6925, rounded before multiplying by pages
		assert_eq!(breakdown.price_per_page, dec!(5.69));
		assert_eq!(breakdown.pages_total, dec!(17.07));
	}

	#[test]
	fn test_default_catalog_prices_every_combination() {
		let catalog = PricingCatalog::default();
		for level in AcademicLevel::all() {
			for urgency in DeadlineUrgency::all() {
				for service in ServiceType::all() {
					let params = OrderParameters {
						academic_level: level,
						deadline_urgency: urgency,
						service_type: service,
						..Default::default()
					};
					let breakdown = compute_breakdown(&catalog, &params, &PromoDiscount::None);
					assert!(breakdown.final_price > Decimal::ZERO);
				}
			}
		}
	}
}
