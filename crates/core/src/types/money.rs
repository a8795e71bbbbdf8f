//! Decimal money amounts and currency formatting.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (cedis, not pesewas).
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Amount in the store's default currency.
    #[must_use]
    pub fn ghs(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::GHS)
    }
}

impl fmt::Display for Money {
    /// Formats as symbol, thousands separators and two decimals, e.g. `GH₵1,234.50`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let text = format!("{:.2}", rounded.abs());
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
        write!(
            f,
            "{sign}{}{}.{fraction}",
            self.currency.symbol(),
            group_thousands(whole)
        )
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// ISO 4217 currency codes the store can price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    GHS,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::GHS => "GH₵",
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::GHS => "GHS",
        }
    }
}
