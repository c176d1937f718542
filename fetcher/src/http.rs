//! Production [`RemoteRateFetcher`] dispatching on the provider kind.

use std::time::Duration;

use async_trait::async_trait;
use coinrates_common::{CurrencySymbol, FetchResult};
use coinrates_engine::{ProviderKind, RateProviderConfig, RemoteRateFetcher};
use rust_decimal::Decimal;

use crate::coinmarketcap::CoinMarketCapClient;
use crate::exchangerates::ExchangeratesApiClient;
use crate::rest::RestApiCaller;

/// Fetches rates over HTTP, picking the client by [`ProviderKind`].
#[derive(Debug, Clone, Default)]
pub struct HttpRateFetcher {
    coinmarketcap: CoinMarketCapClient,
    exchangerates: ExchangeratesApiClient,
}

impl HttpRateFetcher {
    pub fn new(caller: RestApiCaller) -> Self {
        Self {
            coinmarketcap: CoinMarketCapClient::new(caller.clone()),
            exchangerates: ExchangeratesApiClient::new(caller),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(RestApiCaller::with_timeout(timeout))
    }

    fn client(&self, provider: &RateProviderConfig) -> &dyn RemoteRateFetcher {
        match provider.kind {
            ProviderKind::CoinMarketCap => &self.coinmarketcap,
            ProviderKind::ExchangeratesApi => &self.exchangerates,
        }
    }
}

#[async_trait]
impl RemoteRateFetcher for HttpRateFetcher {
    async fn fetch_rate(
        &self,
        provider: &RateProviderConfig,
        base: &CurrencySymbol,
        target: &CurrencySymbol,
    ) -> FetchResult<Decimal> {
        self.client(provider).fetch_rate(provider, base, target).await
    }

    async fn supported_base_currencies(
        &self,
        provider: &RateProviderConfig,
    ) -> FetchResult<Vec<CurrencySymbol>> {
        self.client(provider).supported_base_currencies(provider).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_dispatches_on_kind() {
        let mut server = mockito::Server::new_async().await;
        let crypto = server
            .mock("GET", "/crypto/quotes")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": {"BTC": {"quote": {"USD": {"price": 61000}}}}}"#)
            .create_async()
            .await;
        let fiat = server
            .mock("GET", "/fiat/quotes")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success": true, "rates": {"USD": 1.08}}"#)
            .create_async()
            .await;

        let cmc = RateProviderConfig::new("coinmarketcapapi", &format!("{}/crypto", server.url()));
        let fx = RateProviderConfig::new("exchangeratesapi", &format!("{}/fiat", server.url()))
            .with_kind(ProviderKind::ExchangeratesApi);

        let fetcher = HttpRateFetcher::with_timeout(Duration::from_secs(5));

        let btc = fetcher
            .fetch_rate(&cmc, &CurrencySymbol::btc(), &CurrencySymbol::usd())
            .await
            .unwrap();
        let eur = fetcher
            .fetch_rate(&fx, &CurrencySymbol::eur(), &CurrencySymbol::usd())
            .await
            .unwrap();

        assert_eq!(btc, dec!(61000));
        assert_eq!(eur, dec!(1.08));
        crypto.assert_async().await;
        fiat.assert_async().await;
    }

    #[tokio::test]
    async fn test_map_dispatch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fiat/map")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success": true, "symbols": {"GBP": "British Pound"}}"#)
            .create_async()
            .await;

        let fx = RateProviderConfig::new("exchangeratesapi", &format!("{}/fiat", server.url()))
            .with_kind(ProviderKind::ExchangeratesApi);

        let bases = HttpRateFetcher::default()
            .supported_base_currencies(&fx)
            .await
            .unwrap();

        assert_eq!(bases, vec![CurrencySymbol::new("GBP")]);
    }
}
