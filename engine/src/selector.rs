//! Provider selection by base currency.

use coinrates_common::{CurrencySymbol, RateError, RateResult};

use crate::config::ProviderRoute;

/// Picks the providers responsible for a base currency.
///
/// A single configured route is the main provider and serves every base.
/// With several routes, every route that lists the base (or lists no base
/// at all) is selected, in configuration order.
#[derive(Debug, Clone)]
pub struct ProviderSelector {
    routes: Vec<ProviderRoute>,
}

impl ProviderSelector {
    pub fn new(routes: Vec<ProviderRoute>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[ProviderRoute] {
        &self.routes
    }

    /// Select routes for a base currency.
    pub fn select(&self, base: &CurrencySymbol) -> RateResult<Vec<&ProviderRoute>> {
        let selected: Vec<&ProviderRoute> = match self.routes.as_slice() {
            [main] => vec![main],
            routes => routes.iter().filter(|r| r.serves_base(base)).collect(),
        };

        if selected.is_empty() {
            return Err(RateError::UnsupportedBaseCurrency(base.clone()));
        }

        Ok(selected)
    }

    /// Select provider names for a base currency.
    pub fn select_providers(&self, base: &CurrencySymbol) -> RateResult<Vec<String>> {
        Ok(self
            .select(base)?
            .into_iter()
            .map(|r| r.provider_name.clone())
            .collect())
    }
}
