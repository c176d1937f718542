//! Currency catalog: which base and target symbols the configured providers
//! can serve.

use std::collections::HashSet;

use coinrates_common::{CurrencySymbol, RateError, RateResult};
use tracing::{info, warn};

use crate::config::RateProviderConfig;
use crate::fetcher::RemoteRateFetcher;

/// Supported currencies, merged across all configured providers.
#[derive(Debug, Clone, Default)]
pub struct CurrencyCatalog {
    bases: HashSet<CurrencySymbol>,
    targets: HashSet<CurrencySymbol>,
    defaults: Vec<CurrencySymbol>,
}

impl CurrencyCatalog {
    /// Build a catalog from static configuration only.
    ///
    /// Default targets are the providers' default lists in configuration
    /// order, without duplicates.
    pub fn from_configs(providers: &[RateProviderConfig]) -> Self {
        let mut catalog = Self::default();

        for provider in providers {
            catalog
                .bases
                .extend(provider.supported_base_currencies.iter().cloned());
            catalog
                .targets
                .extend(provider.supported_target_currencies.iter().cloned());
            for default in &provider.default_target_currencies {
                if !catalog.defaults.contains(default) {
                    catalog.defaults.push(default.clone());
                }
            }
        }

        catalog
    }

    /// Build a catalog from configuration plus each provider's map endpoint.
    ///
    /// A provider whose map call fails is skipped. Fails if no base currency
    /// is known afterwards.
    pub async fn load(
        providers: &[RateProviderConfig],
        fetcher: &dyn RemoteRateFetcher,
    ) -> RateResult<Self> {
        let mut catalog = Self::from_configs(providers);

        for provider in providers.iter().filter(|p| !p.map_endpoint.is_empty()) {
            match fetcher.supported_base_currencies(provider).await {
                Ok(bases) => {
                    info!(
                        provider = %provider.name,
                        count = bases.len(),
                        "Loaded supported base currencies"
                    );
                    catalog.extend_bases(bases);
                }
                Err(e) => {
                    warn!(
                        provider = %provider.name,
                        error = %e,
                        "Failed to load supported base currencies"
                    );
                }
            }
        }

        if catalog.bases.is_empty() {
            return Err(RateError::Configuration(
                "No supported base currencies could be loaded".to_string(),
            ));
        }

        Ok(catalog)
    }

    /// Add base currencies.
    pub fn extend_bases(&mut self, bases: impl IntoIterator<Item = CurrencySymbol>) {
        self.bases.extend(bases.into_iter().filter(|b| !b.is_empty()));
    }

    pub fn is_supported_base(&self, base: &CurrencySymbol) -> bool {
        self.bases.contains(base)
    }

    pub fn is_supported_target(&self, target: &CurrencySymbol) -> bool {
        self.targets.contains(target)
    }

    /// Targets used when a request names none.
    pub fn default_targets(&self) -> &[CurrencySymbol] {
        &self.defaults
    }

    /// Number of known base currencies.
    pub fn base_count(&self) -> usize {
        self.bases.len()
    }
}
