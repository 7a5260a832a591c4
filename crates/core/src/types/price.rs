//! Menu prices with decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price paid for a menu item.
///
/// Amounts are in the currency's standard unit (yen, dollars), never minor
/// units, and serialize as strings to keep decimal precision intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.currency.minor_units();
        write!(
            f,
            "{}{}",
            self.currency.symbol(),
            self.amount.round_dp(places)
        )
    }
}

/// ISO 4217 currency codes seen on ramen menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    JPY,
    USD,
    EUR,
    GBP,
    KRW,
    TWD,
    HKD,
    SGD,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::JPY => "¥",
            Self::USD | Self::CAD | Self::AUD | Self::SGD | Self::HKD => "$",
            Self::TWD => "NT$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::KRW => "₩",
        }
    }

    /// Number of decimal places used when displaying amounts.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::JPY | Self::KRW | Self::TWD => 0,
            _ => 2,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_serializes_amount_as_string() {
        let price = Price::new(Decimal::new(1050, 0), CurrencyCode::JPY);
        let json = serde_json::to_value(price).unwrap();
        assert_eq!(json["amount"], "1050");
        assert_eq!(json["currency"], "JPY");
    }

    #[test]
    fn test_price_display_respects_minor_units() {
        assert_eq!(
            Price::new(Decimal::new(980, 0), CurrencyCode::JPY).to_string(),
            "¥980"
        );
        assert_eq!(
            Price::new(Decimal::new(1850, 2), CurrencyCode::USD).to_string(),
            "$18.50"
        );
    }

    #[test]
    fn test_negative() {
        assert!(Price::new(Decimal::new(-1, 0), CurrencyCode::JPY).is_negative());
        assert!(!Price::new(Decimal::ZERO, CurrencyCode::JPY).is_negative());
    }
}
