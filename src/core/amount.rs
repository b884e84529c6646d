use rust_decimal::{Decimal, RoundingStrategy};

use super::check::Status;
use super::config::ValidationConfig;

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round half-up to cents and keep exactly two decimal places.
pub fn cents(value: Decimal) -> Decimal {
    let mut rounded = round_half_up(value, 2);
    rounded.rescale(2);
    rounded
}

/// Tax due on `base` at `rate_percent`, rounded to cents.
///
/// `None` when the product leaves the decimal range.
pub fn tax_amount(base: Decimal, rate_percent: Decimal) -> Option<Decimal> {
    let product = base.checked_mul(rate_percent)?;
    Some(round_half_up(product / Decimal::ONE_HUNDRED, 2))
}

/// Absolute difference between two amounts, `None` on overflow.
pub fn deviation(expected: Decimal, actual: Decimal) -> Option<Decimal> {
    actual.checked_sub(expected).map(|d| d.abs())
}

/// Sum of amounts, `None` on overflow.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Grade an absolute deviation against the tolerance bands.
///
/// Up to `tolerance` is a pass, up to `warning_tolerance` a warning
/// (rounding noise), anything beyond a failure. A deviation too large to
/// represent is a failure.
pub fn classify_deviation(expected: Decimal, actual: Decimal, config: &ValidationConfig) -> Status {
    let Some(deviation) = deviation(expected, actual) else {
        return Status::Fail;
    };
    if deviation <= config.tolerance {
        Status::Pass
    } else if deviation <= config.warning_tolerance {
        Status::Warning
    } else {
        Status::Fail
    }
}

/// Render an amount with exactly two decimal places.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", round_half_up(value, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tax_amount_rounds_half_up() {
        assert_eq!(tax_amount(dec!(1000.00), dec!(0.10)), Some(dec!(1.00)));
        assert_eq!(tax_amount(dec!(5.00), dec!(0.10)), Some(dec!(0.01)));
        assert_eq!(tax_amount(dec!(1234.56), dec!(0.90)), Some(dec!(11.11)));
        assert_eq!(tax_amount(dec!(50.00), dec!(0.90)), Some(dec!(0.45)));
    }

    #[test]
    fn out_of_range_arithmetic_is_none() {
        assert_eq!(tax_amount(Decimal::MAX, dec!(17.7)), None);
        assert_eq!(deviation(Decimal::MIN, Decimal::MAX), None);
        assert_eq!(checked_sum([Decimal::MAX, dec!(1)]), None);
        assert_eq!(checked_sum([dec!(1.25), dec!(2.50)]), Some(dec!(3.75)));
        assert_eq!(
            classify_deviation(Decimal::MIN, Decimal::MAX, &ValidationConfig::default()),
            Status::Fail
        );
    }

    #[test]
    fn deviation_bands() {
        let cfg = ValidationConfig::default();
        assert_eq!(classify_deviation(dec!(1.00), dec!(1.00), &cfg), Status::Pass);
        assert_eq!(classify_deviation(dec!(1.00), dec!(1.01), &cfg), Status::Pass);
        assert_eq!(classify_deviation(dec!(1.00), dec!(0.97), &cfg), Status::Warning);
        assert_eq!(classify_deviation(dec!(1.00), dec!(1.05), &cfg), Status::Warning);
        assert_eq!(classify_deviation(dec!(1.00), dec!(1.50), &cfg), Status::Fail);
    }

    #[test]
    fn cents_keeps_two_places() {
        assert_eq!(cents(dec!(35)).to_string(), "35.00");
        assert_eq!(cents(dec!(1.005)).to_string(), "1.01");
    }

    #[test]
    fn format_amount_two_places() {
        assert_eq!(format_amount(dec!(35)), "35.00");
        assert_eq!(format_amount(dec!(1.005)), "1.01");
        assert_eq!(format_amount(dec!(-0.5)), "-0.50");
    }
}
