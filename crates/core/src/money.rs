//! Money rounding utility.
//!
//! All monetary outputs of the engine are `rust_decimal::Decimal` values and
//! pass through [`round2`] exactly once, at the point a summary is finalized.
//! Intermediate arithmetic stays exact; rounding earlier would compound error.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary value to 2 decimal places, half-up.
///
/// Midpoints round away from zero (`0.005` -> `0.01`). Idempotent: rounding
/// an already-rounded value returns it unchanged.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp a value at zero. Totals that can be pushed negative by discounts or
/// withholding are clamped, never rejected.
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up_on_the_second_decimal() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
        assert_eq!(round2(dec!(2.675)), dec!(2.68));
        assert_eq!(round2(dec!(0.125)), dec!(0.13));
    }

    #[test]
    fn round2_is_idempotent() {
        let cases = [dec!(0), dec!(1.01), dec!(99.99), dec!(123.455), dec!(-3.335)];
        for v in cases {
            let once = round2(v);
            assert_eq!(round2(once), once, "round2 not idempotent for {v}");
        }
    }

    #[test]
    fn already_scaled_values_pass_through() {
        assert_eq!(round2(dec!(250.00)), dec!(250.00));
        assert_eq!(round2(dec!(0.10)), dec!(0.10));
    }

    #[test]
    fn clamp_floors_at_zero() {
        assert_eq!(clamp_non_negative(dec!(-12.50)), Decimal::ZERO);
        assert_eq!(clamp_non_negative(dec!(12.50)), dec!(12.50));
    }
}
