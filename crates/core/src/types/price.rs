//! Type-safe price representation using decimal arithmetic.
//!
//! The API reports prices as decimal strings with two places ("19.99").
//! Amounts stay in [`Decimal`] from the wire to the cart total; the currency
//! only matters for display.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

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

    /// Format for display, rounded half-up to two places ("$19.99", "19.99 zł").
    #[must_use]
    pub fn display(&self) -> String {
        let amount = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let symbol = self.currency_code.symbol();
        if self.currency_code.symbol_after() {
            format!("{amount:.2} {symbol}")
        } else {
            format!("{symbol}{amount:.2}")
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    PLN,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Currency symbol used when formatting prices.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::PLN => "zł",
        }
    }

    /// Whether the symbol is written after the amount.
    #[must_use]
    pub const fn symbol_after(self) -> bool {
        matches!(self, Self::PLN)
    }

    /// ISO code as a string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::PLN => "PLN",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "PLN" => Ok(Self::PLN),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix_symbol() {
        let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(price.display(), "$19.99");
    }

    #[test]
    fn test_display_pads_and_rounds() {
        let price = Price::new(Decimal::new(5, 0), CurrencyCode::GBP);
        assert_eq!(price.display(), "£5.00");

        let price = Price::new(Decimal::new(10_005, 3), CurrencyCode::EUR);
        assert_eq!(price.display(), "€10.01");
    }

    #[test]
    fn test_display_suffix_symbol() {
        let price = Price::new(Decimal::new(4950, 2), CurrencyCode::PLN);
        assert_eq!(price.to_string(), "49.50 zł");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("pln".parse::<CurrencyCode>().unwrap(), CurrencyCode::PLN);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
