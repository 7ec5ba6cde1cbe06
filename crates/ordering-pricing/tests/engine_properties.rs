use ordering_pricing::compute_breakdown;
use ordering_types::{
	AcademicLevel, DeadlineUrgency, OrderParameters, PricingCatalog, PromoDiscount, ServiceType,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

fn params_strategy() -> impl Strategy<Value = OrderParameters> {
	(
		0usize..4,
		0usize..5,
		0usize..8,
		1u32..500,
		0u32..100,
		proptest::collection::btree_set(
			prop_oneof![
				Just("plagiarism-report".to_string()),
				Just("one-page-summary".to_string()),
				Just("priority-support".to_string()),
				Just("top-writer".to_string()),
				Just("not-in-catalog".to_string()),
			],
			0..5,
		),
	)
		.prop_map(|(level, service, urgency, pages, sources, extras)| OrderParameters {
			academic_level: AcademicLevel::all().nth(level).unwrap_or(AcademicLevel::Undergraduate),
			service_type: ServiceType::all().nth(service).unwrap_or(ServiceType::Writing),
			deadline_urgency: DeadlineUrgency::all().nth(urgency).unwrap_or(DeadlineUrgency::Days7),
			subject_area: None,
			number_of_pages: pages,
			number_of_sources: sources,
			selected_extra_ids: extras,
			applied_promo_code: None,
		})
}

fn promo_strategy() -> impl Strategy<Value = PromoDiscount> {
	prop_oneof![
		Just(PromoDiscount::None),
		(0i64..=100).prop_map(|points| PromoDiscount::Percentage(Decimal::new(points, 2))),
		(0i64..100_000).prop_map(|cents| PromoDiscount::Fixed(Decimal::new(cents, 2))),
	]
}

proptest! {
	/// Property: identical inputs always produce identical breakdowns
	#[test]
	fn breakdown_is_deterministic(params in params_strategy(), promo in promo_strategy()) {
		let catalog = PricingCatalog::default();
		prop_assert_eq!(
			compute_breakdown(&catalog, &params, &promo),
			compute_breakdown(&catalog, &params, &promo)
		);
	}

	/// Property: the discount stays within the subtotal and nothing goes negative
	#[test]
	fn discount_is_bounded(params in params_strategy(), promo in promo_strategy()) {
		let breakdown = compute_breakdown(&PricingCatalog::default(), &params, &promo);
		prop_assert!(breakdown.discount >= Decimal::ZERO);
		prop_assert!(breakdown.discount <= breakdown.subtotal);
		prop_assert!(breakdown.final_price >= Decimal::ZERO);
		prop_assert_eq!(breakdown.final_price, breakdown.subtotal - breakdown.discount);
		prop_assert!(breakdown.final_price.scale() <= 2);
	}

	/// Property: adding a page never lowers the pages total, adding a source
	/// never lowers the sources total
	#[test]
	fn totals_are_monotonic(params in params_strategy(), promo in promo_strategy()) {
		let catalog = PricingCatalog::default();
		let before = compute_breakdown(&catalog, &params, &promo);

		let more_pages = OrderParameters { number_of_pages: params.number_of_pages + 1, ..params.clone() };
		prop_assert!(compute_breakdown(&catalog, &more_pages, &promo).pages_total >= before.pages_total);

		let more_sources = OrderParameters { number_of_sources: params.number_of_sources + 1, ..params.clone() };
		prop_assert!(compute_breakdown(&catalog, &more_sources, &promo).sources_total >= before.sources_total);
	}

	/// Property: the subtotal is the sum of its rounded parts
	#[test]
	fn subtotal_adds_up(params in params_strategy()) {
		let breakdown = compute_breakdown(&PricingCatalog::default(), &params, &PromoDiscount::None);
		prop_assert_eq!(
			breakdown.subtotal,
			breakdown.pages_total + breakdown.sources_total + breakdown.extras_total
		);
	}
}
