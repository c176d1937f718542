//! Exchange rate results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::CurrencySymbol;

/// Rates for one base currency against a set of target currencies.
///
/// Rates are kept in a sorted map so two results built from the same data
/// serialize identically regardless of fetch completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateResult {
    /// The currency being priced.
    pub base_currency_symbol: CurrencySymbol,
    /// Target symbol to rate (1 base = rate target).
    pub currencies_rates: BTreeMap<CurrencySymbol, Decimal>,
}

impl ExchangeRateResult {
    /// Create an empty result for a base currency.
    pub fn new(base: CurrencySymbol) -> Self {
        Self {
            base_currency_symbol: base,
            currencies_rates: BTreeMap::new(),
        }
    }

    /// Record a rate unless the target already has one or the rate is zero.
    ///
    /// Returns `true` if the rate was stored.
    pub fn insert_first(&mut self, target: CurrencySymbol, rate: Decimal) -> bool {
        if rate.is_zero() || self.currencies_rates.contains_key(&target) {
            return false;
        }
        self.currencies_rates.insert(target, rate);
        true
    }

    /// Get the rate for a target symbol.
    pub fn rate(&self, target: &CurrencySymbol) -> Option<Decimal> {
        self.currencies_rates.get(target).copied()
    }

    pub fn contains(&self, target: &CurrencySymbol) -> bool {
        self.currencies_rates.contains_key(target)
    }

    /// Number of rates.
    pub fn len(&self) -> usize {
        self.currencies_rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies_rates.is_empty()
    }
}

/// A target symbol that was dropped from a result because no responsible
/// provider produced a usable rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFailure {
    /// The dropped target symbol.
    pub target: CurrencySymbol,
    /// Provider whose failure was recorded last.
    pub provider: String,
    /// Human-readable reason.
    pub reason: String,
}

impl SymbolFailure {
    pub fn new(
        target: CurrencySymbol,
        provider: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            target,
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SymbolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}: {}", self.target, self.provider, self.reason)
    }
}
