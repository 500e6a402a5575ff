//! Type-safe price representation using decimal arithmetic.
//!
//! Unit prices are held in the currency's two minor digits. Derived amounts
//! (tax in particular) stay unrounded until they are presented through
//! [`Price::display`] or [`format_amount`].

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places shown for every supported currency.
pub const MINOR_UNITS: u32 = 2;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{}",
            self.currency_code.symbol(),
            format_amount(self.amount)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Round an amount half away from zero to two decimal places and render it
/// with exactly two fractional digits ("8" becomes "8.00").
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = round_to_minor_units(amount);
    rounded.rescale(MINOR_UNITS);
    rounded.to_string()
}

/// Round half away from zero to [`MINOR_UNITS`] places. Negative zero
/// becomes plain zero.
#[must_use]
pub fn round_to_minor_units(amount: Decimal) -> Decimal {
    let rounded =
        amount.round_dp_with_strategy(MINOR_UNITS, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Error returned when parsing an unsupported currency code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(UnknownCurrency(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_minor_units() {
        let long: Decimal = "19.999999999999999999".parse().unwrap();
        assert_eq!(round_to_minor_units(long), Decimal::from(20));
        assert_eq!(round_to_minor_units(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert!(!round_to_minor_units(Decimal::new(-1, 3)).is_sign_negative());
    }

    #[test]
    fn test_format_amount_pads_and_rounds() {
        assert_eq!(format_amount(Decimal::from(8)), "8.00");
        assert_eq!(format_amount(Decimal::new(71992, 4)), "7.20");
        assert_eq!(format_amount(Decimal::new(1005, 3)), "1.01");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(Decimal::from(123), CurrencyCode::USD);
        assert_eq!(price.display(), "$123.00");

        let price = Price::new(Decimal::new(8999, 2), CurrencyCode::EUR);
        assert_eq!(price.to_string(), "€89.99");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("GBP".parse::<CurrencyCode>().unwrap(), CurrencyCode::GBP);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
