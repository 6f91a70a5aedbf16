//! Type-safe monetary amounts using decimal arithmetic.
//!
//! Amounts are carried as [`rust_decimal::Decimal`] and serialized as
//! strings to preserve precision on the wire, matching the backend's
//! envelope format.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary amount with ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Decimal amount, serialized as a string (preserves precision).
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "USD", "EUR").
    pub currency: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Amount from minor units (e.g., cents for USD).
    #[must_use]
    pub fn from_minor_units(units: i64, currency: impl Into<String>) -> Self {
        Self::new(Decimal::new(units, 2), currency)
    }

    /// Multiply by a unit count (line total from unit price).
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency.clone())
    }

    /// Format for display (e.g., "19.99 USD").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.2} {}", self.amount, self.currency)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
