//! Remote rate fetcher contract.

use async_trait::async_trait;
use coinrates_common::CurrencySymbol;
use rust_decimal::Decimal;

use crate::config::RateProviderConfig;
use crate::error::FetchResult;

/// Performs the network call for one provider and decodes its payload.
///
/// Implementations own transport concerns (timeouts, auth, status-code
/// interpretation). The engine treats every failure as opaque.
#[async_trait]
pub trait RemoteRateFetcher: Send + Sync {
    /// Fetch the rate of `base` priced in `target`.
    async fn fetch_rate(
        &self,
        provider: &RateProviderConfig,
        base: &CurrencySymbol,
        target: &CurrencySymbol,
    ) -> FetchResult<Decimal>;

    /// List the base currencies the provider can price.
    async fn supported_base_currencies(
        &self,
        provider: &RateProviderConfig,
    ) -> FetchResult<Vec<CurrencySymbol>>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRateFetcher;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use dashmap::DashMap;
    use parking_lot::Mutex;

    use super::*;
    use crate::error::FetchError;

    /// A recorded `fetch_rate` call: provider, base, target.
    pub type FetchCall = (String, CurrencySymbol, CurrencySymbol);

    /// In-memory fetcher for tests.
    ///
    /// Rates are keyed by provider/base/target; unknown pairs fail with
    /// `MissingRate`. Every call is recorded.
    #[derive(Default)]
    pub struct MockRateFetcher {
        rates: DashMap<String, Decimal>,
        failures: DashMap<String, FetchError>,
        bases: DashMap<String, Vec<CurrencySymbol>>,
        calls: Mutex<Vec<FetchCall>>,
        map_calls: AtomicUsize,
        delay: Mutex<Option<Duration>>,
        pair_delays: DashMap<String, Duration>,
    }

    impl MockRateFetcher {
        /// Create a new mock fetcher.
        pub fn new() -> Self {
            Self::default()
        }

        fn key(provider: &str, base: &CurrencySymbol, target: &CurrencySymbol) -> String {
            format!("{}/{}/{}", provider, base, target)
        }

        /// Set a rate for a provider and pair.
        pub fn set_rate(&self, provider: &str, base: &str, target: &str, rate: Decimal) {
            let key = Self::key(provider, &base.into(), &target.into());
            self.failures.remove(&key);
            self.rates.insert(key, rate);
        }

        /// Make a provider and pair fail.
        pub fn set_failure(&self, provider: &str, base: &str, target: &str, error: FetchError) {
            let key = Self::key(provider, &base.into(), &target.into());
            self.failures.insert(key, error);
        }

        /// Set the base currencies returned by a provider's map endpoint.
        pub fn set_base_currencies(&self, provider: &str, bases: &[&str]) {
            let bases = bases.iter().map(|b| CurrencySymbol::new(b)).collect();
            self.bases.insert(provider.to_string(), bases);
        }

        /// Delay every `fetch_rate` call.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        /// Delay `fetch_rate` for one provider and pair, on top of any
        /// global delay.
        pub fn set_pair_delay(&self, provider: &str, base: &str, target: &str, delay: Duration) {
            let key = Self::key(provider, &base.into(), &target.into());
            self.pair_delays.insert(key, delay);
        }

        /// Number of `fetch_rate` calls so far.
        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// Number of `supported_base_currencies` calls so far.
        pub fn map_call_count(&self) -> usize {
            self.map_calls.load(Ordering::SeqCst)
        }

        /// All recorded `fetch_rate` calls in order.
        pub fn calls(&self) -> Vec<FetchCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl RemoteRateFetcher for MockRateFetcher {
        async fn fetch_rate(
            &self,
            provider: &RateProviderConfig,
            base: &CurrencySymbol,
            target: &CurrencySymbol,
        ) -> FetchResult<Decimal> {
            self.calls
                .lock()
                .push((provider.name.clone(), base.clone(), target.clone()));

            let key = Self::key(&provider.name, base, target);

            let delay = *self.delay.lock();
            let pair_delay = self.pair_delays.get(&key).map(|d| *d);
            for delay in [delay, pair_delay].into_iter().flatten() {
                tokio::time::sleep(delay).await;
            }

            if let Some(error) = self.failures.get(&key) {
                return Err(error.clone());
            }

            self.rates
                .get(&key)
                .map(|r| *r)
                .ok_or_else(|| FetchError::MissingRate {
                    service: provider.name.clone(),
                    base: base.clone(),
                    target: target.clone(),
                })
        }

        async fn supported_base_currencies(
            &self,
            provider: &RateProviderConfig,
        ) -> FetchResult<Vec<CurrencySymbol>> {
            self.map_calls.fetch_add(1, Ordering::SeqCst);
            self.bases
                .get(&provider.name)
                .map(|b| b.clone())
                .ok_or_else(|| FetchError::Transport {
                    service: provider.name.clone(),
                    message: "map endpoint unavailable".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockRateFetcher::new();
        let provider = RateProviderConfig::new("cmc", "http://cmc");
        fetcher.set_rate("cmc", "btc", "eur", dec!(52000.5));

        let rate = fetcher
            .fetch_rate(&provider, &CurrencySymbol::btc(), &CurrencySymbol::eur())
            .await
            .unwrap();

        assert_eq!(rate, dec!(52000.5));
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(fetcher.calls()[0].0, "cmc");
    }

    #[tokio::test]
    async fn test_mock_fetcher_failures() {
        let fetcher = MockRateFetcher::new();
        let provider = RateProviderConfig::new("cmc", "http://cmc");
        fetcher.set_rate("cmc", "BTC", "USD", dec!(60000));
        fetcher.set_failure(
            "cmc",
            "BTC",
            "USD",
            FetchError::Transport {
                service: "cmc".to_string(),
                message: "connection reset".to_string(),
            },
        );

        let usd = fetcher
            .fetch_rate(&provider, &CurrencySymbol::btc(), &CurrencySymbol::usd())
            .await;
        let eur = fetcher
            .fetch_rate(&provider, &CurrencySymbol::btc(), &CurrencySymbol::eur())
            .await;

        assert!(matches!(usd, Err(FetchError::Transport { .. })));
        assert!(matches!(eur, Err(FetchError::MissingRate { .. })));
        assert!(fetcher.supported_base_currencies(&provider).await.is_err());
        assert_eq!(fetcher.map_call_count(), 1);
    }
}
