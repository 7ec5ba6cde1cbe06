//! Money representation for prices and discounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary amount in the catalog currency.
pub type Money = Decimal;

/// Rounds an amount to two decimal places.
///
/// Midpoints round away from zero. Every value the pricing engine rounds is
/// non-negative, so this is the familiar half-up rounding to the cent.
pub fn round2(value: Decimal) -> Decimal {
	value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
