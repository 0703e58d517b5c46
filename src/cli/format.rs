//! Number and id rendering for shell output.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

/// Digit grouping convention for amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// 12,34,567.00
    Indian,
    /// 1,234,567.00
    Western,
}

impl Grouping {
    pub fn for_locale(locale: &str) -> Self {
        if locale.to_ascii_lowercase().ends_with("-in") {
            Grouping::Indian
        } else {
            Grouping::Western
        }
    }
}

/// Renders an amount with two decimals, grouped digits and the currency code.
pub fn money(amount: Decimal, currency: &str, grouping: Grouping) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let grouped = group_digits(whole, grouping);
    let sign = if negative { "-" } else { "" };
    format!("{currency} {sign}{grouped}.{fraction}")
}

fn group_digits(whole: &str, grouping: Grouping) -> String {
    let digits: Vec<char> = whole.chars().collect();
    if digits.len() <= 3 {
        return whole.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let step = match grouping {
        Grouping::Indian => 2,
        Grouping::Western => 3,
    };
    let mut groups: Vec<String> = head
        .rchunks(step)
        .map(|chunk| chunk.iter().collect())
        .collect();
    groups.reverse();
    groups.push(tail.iter().collect());
    groups.join(",")
}

/// Quantities print without trailing zeros.
pub fn quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn percent(value: Decimal) -> String {
    format!("{}%", value.round_dp(2).normalize())
}

/// First eight hex digits; accepted back by the id-prefix resolvers.
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indian_grouping_uses_lakh_and_crore_positions() {
        assert_eq!(
            money(Decimal::new(1234567891, 2), "INR", Grouping::Indian),
            "INR 1,23,45,678.91"
        );
        assert_eq!(money(Decimal::new(88000, 0), "INR", Grouping::Indian), "INR 88,000.00");
        assert_eq!(money(Decimal::new(950, 0), "INR", Grouping::Indian), "INR 950.00");
    }

    #[test]
    fn western_grouping_and_negative_amounts() {
        assert_eq!(
            money(Decimal::new(-12345675, 3), "USD", Grouping::Western),
            "USD -12,345.68"
        );
        assert_eq!(Grouping::for_locale("en-IN"), Grouping::Indian);
        assert_eq!(Grouping::for_locale("en-US"), Grouping::Western);
    }

    #[test]
    fn quantities_and_percentages_drop_trailing_zeros() {
        assert_eq!(quantity(Decimal::new(101000, 2)), "1010");
        assert_eq!(percent(Decimal::new(2500, 2)), "25%");
        let id = Uuid::nil();
        assert_eq!(short_id(id), "00000000");
    }
}
