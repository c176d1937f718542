//! Exchange rate resolution: validate, select providers, fetch through the
//! cache, assemble.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use coinrates_common::{
    CurrencySymbol, ExchangeRateResult, FetchError, FetchResult, RateError, RateResult,
    SymbolFailure,
};
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheGateway, CacheKey, RateCache, SharedRateCache};
use crate::catalog::CurrencyCatalog;
use crate::config::{EngineConfig, RateProviderConfig};
use crate::fetcher::RemoteRateFetcher;
use crate::selector::ProviderSelector;
use crate::validator::CurrencyValidator;

/// A resolved rate map plus the symbols that had to be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: ExchangeRateResult,
    /// Valid targets with no usable rate, in request order.
    pub failures: Vec<SymbolFailure>,
}

/// Resolves rates for a base currency against a set of targets.
pub struct ExchangeRateResolver {
    validator: CurrencyValidator,
    selector: ProviderSelector,
    gateway: CacheGateway,
    fetcher: Arc<dyn RemoteRateFetcher>,
    providers: HashMap<String, RateProviderConfig>,
    request_timeout: Option<Duration>,
}

impl ExchangeRateResolver {
    /// Create a resolver from its collaborators.
    pub fn new(
        validator: CurrencyValidator,
        selector: ProviderSelector,
        gateway: CacheGateway,
        fetcher: Arc<dyn RemoteRateFetcher>,
        providers: Vec<RateProviderConfig>,
    ) -> Self {
        Self {
            validator,
            selector,
            gateway,
            fetcher,
            providers: providers.into_iter().map(|p| (p.name.clone(), p)).collect(),
            request_timeout: None,
        }
    }

    /// Abandon a resolution that takes longer than `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build a resolver from configuration, loading the currency catalog
    /// through `fetcher`.
    pub async fn from_config(
        config: &EngineConfig,
        fetcher: Arc<dyn RemoteRateFetcher>,
    ) -> RateResult<Self> {
        config.validate().map_err(RateError::Configuration)?;

        let catalog = CurrencyCatalog::load(&config.providers, fetcher.as_ref()).await?;
        let store = Arc::new(RateCache::with_config(config.cache.clone()));

        let mut resolver = Self::new(
            CurrencyValidator::new(Arc::new(catalog)),
            ProviderSelector::new(config.effective_routes()),
            CacheGateway::new(store),
            fetcher,
            config.providers.clone(),
        );
        resolver.request_timeout = config.request_timeout();

        Ok(resolver)
    }

    /// The shared rate store.
    pub fn cache(&self) -> &SharedRateCache {
        self.gateway.store()
    }

    /// Get rates for `base` against `requested` targets, or the configured
    /// defaults when none are requested.
    pub async fn get_exchange_rates(
        &self,
        base: &str,
        requested: Option<&[String]>,
    ) -> RateResult<ExchangeRateResult> {
        self.resolve(base, requested).await.map(|r| r.result)
    }

    /// Like [`get_exchange_rates`](Self::get_exchange_rates), also reporting
    /// dropped symbols.
    #[instrument(skip(self, requested))]
    pub async fn resolve(&self, base: &str, requested: Option<&[String]>) -> RateResult<Resolution> {
        let base = CurrencySymbol::new(base);

        let targets = self.validator.validate(&base, requested)?;
        let routes = self.selector.select(&base)?;

        let mut pairs = Vec::new();
        for route in routes {
            let provider = self.providers.get(&route.provider_name).ok_or_else(|| {
                RateError::Configuration(format!("Unknown provider: {}", route.provider_name))
            })?;
            for target in &targets {
                if route.covers_target(target) && provider.supports_target(target) {
                    pairs.push((provider, target));
                }
            }
        }

        debug!(base = %base, targets = targets.len(), fetches = pairs.len(), "Fanning out");

        let fetches = join_all(
            pairs
                .iter()
                .map(|(provider, target)| self.fetch_one(provider, &base, target)),
        );

        let outcomes = match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fetches)
                .await
                .map_err(|_| RateError::Timeout(timeout.as_millis() as u64))?,
            None => fetches.await,
        };

        let resolution = assemble(base, &targets, &pairs, outcomes)?;

        info!(
            base = %resolution.result.base_currency_symbol,
            rates = resolution.result.len(),
            failed = resolution.failures.len(),
            "Resolved exchange rates"
        );

        Ok(resolution)
    }

    async fn fetch_one(
        &self,
        provider: &RateProviderConfig,
        base: &CurrencySymbol,
        target: &CurrencySymbol,
    ) -> FetchResult<Decimal> {
        let key = CacheKey::new(provider.name.clone(), base.clone(), target.clone());
        let fetcher = self.fetcher.as_ref();

        self.gateway
            .get_rate(key, provider.caching_enabled, || async move {
                let rate = fetcher.fetch_rate(provider, base, target).await?;
                if rate.is_zero() {
                    return Err(FetchError::ZeroRate {
                        service: provider.name.clone(),
                        base: base.clone(),
                        target: target.clone(),
                    });
                }
                Ok(rate)
            })
            .await
    }
}

/// Merge fetch outcomes in selection order; the first provider to produce a
/// rate for a target wins.
fn assemble(
    base: CurrencySymbol,
    targets: &[CurrencySymbol],
    pairs: &[(&RateProviderConfig, &CurrencySymbol)],
    outcomes: Vec<FetchResult<Decimal>>,
) -> RateResult<Resolution> {
    let mut result = ExchangeRateResult::new(base);
    let mut errors: HashMap<&CurrencySymbol, SymbolFailure> = HashMap::new();

    for ((provider, target), outcome) in pairs.iter().zip(outcomes) {
        match outcome {
            Ok(rate) => {
                result.insert_first((*target).clone(), rate);
            }
            Err(e) => {
                warn!(
                    provider = %provider.name,
                    base = %result.base_currency_symbol,
                    target = %target,
                    error = %e,
                    "Failed to fetch rate"
                );
                errors.insert(
                    *target,
                    SymbolFailure::new((*target).clone(), provider.name.clone(), e.to_string()),
                );
            }
        }
    }

    let failures: Vec<SymbolFailure> = targets
        .iter()
        .filter(|t| !result.contains(t))
        .map(|t| {
            errors.remove(t).unwrap_or_else(|| {
                SymbolFailure::new(t.clone(), "none", "No configured provider serves this target")
            })
        })
        .collect();

    if result.is_empty() {
        return Err(RateError::RatesUnavailable {
            base: result.base_currency_symbol,
            failures,
        });
    }

    Ok(Resolution { result, failures })
}
