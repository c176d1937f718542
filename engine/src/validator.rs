//! Currency validation with partial-failure semantics.

use std::sync::Arc;

use coinrates_common::{CurrencySymbol, RateError, RateResult};
use tracing::debug;

use crate::catalog::CurrencyCatalog;

/// Validates a base symbol and the requested target symbols.
#[derive(Debug, Clone)]
pub struct CurrencyValidator {
    catalog: Arc<CurrencyCatalog>,
}

impl CurrencyValidator {
    pub fn new(catalog: Arc<CurrencyCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CurrencyCatalog {
        &self.catalog
    }

    /// Check the base currency and return the targets to fetch.
    ///
    /// Without requested targets the configured defaults are returned.
    /// Invalid requested targets are dropped silently unless none survive,
    /// in which case every invalid symbol is reported in input order.
    pub fn validate(
        &self,
        base: &CurrencySymbol,
        requested: Option<&[String]>,
    ) -> RateResult<Vec<CurrencySymbol>> {
        if !self.catalog.is_supported_base(base) {
            return Err(RateError::UnsupportedBaseCurrency(base.clone()));
        }

        let Some(requested) = requested else {
            return Ok(self.catalog.default_targets().to_vec());
        };

        let mut valid = Vec::new();
        let mut invalid = Vec::new();

        for symbol in requested.iter().map(CurrencySymbol::new) {
            if self.catalog.is_supported_target(&symbol) {
                if !valid.contains(&symbol) {
                    valid.push(symbol);
                }
            } else {
                invalid.push(symbol);
            }
        }

        if valid.is_empty() {
            return Err(RateError::UnsupportedTargetCurrencies(invalid));
        }

        if !invalid.is_empty() {
            debug!(base = %base, dropped = ?invalid, "Dropping unsupported target currencies");
        }

        Ok(valid)
    }
}
