//! Decimal helpers shared by the calculator and the aggregator.

use rust_decimal::{Decimal, RoundingStrategy};

pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds half away from zero to two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * percentage / 100`, unrounded.
pub fn percent_of(amount: Decimal, percentage: Decimal) -> Decimal {
    amount * percentage / HUNDRED
}

/// `part / whole * 100`, or zero when `whole` is zero.
pub fn ratio_percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        part * HUNDRED / whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn rounds_midpoints_away_from_zero() {
        assert_eq!(round2(d("2.345")), d("2.35"));
        assert_eq!(round2(d("2.355")), d("2.36"));
        assert_eq!(round2(d("-2.345")), d("-2.35"));
        assert_eq!(round2(d("2.344")), d("2.34"));
    }

    #[test]
    fn ratio_of_zero_whole_is_zero() {
        assert_eq!(ratio_percent(d("10"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(ratio_percent(d("1"), d("4")), d("25"));
    }
}
