//! CoinMarketCap-style crypto quotes.
//!
//! Quotes: `GET {quotes}?symbol=<BASE>&convert=<TARGET>` answering
//! `data.<BASE>.quote.<TARGET>.price`.
//! Map: `GET {map}` answering `data[].symbol`.

use std::collections::HashMap;

use async_trait::async_trait;
use coinrates_common::{CurrencySymbol, FetchError, FetchResult};
use coinrates_engine::{RateProviderConfig, RemoteRateFetcher};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::rest::RestApiCaller;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    data: HashMap<String, QuotedAsset>,
}

#[derive(Debug, Deserialize)]
struct QuotedAsset {
    #[serde(default)]
    quote: HashMap<String, Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    #[serde(default)]
    data: Vec<MapEntry>,
}

#[derive(Debug, Deserialize)]
struct MapEntry {
    symbol: String,
}

/// Client for CoinMarketCap-style providers.
#[derive(Debug, Clone, Default)]
pub struct CoinMarketCapClient {
    caller: RestApiCaller,
}

impl CoinMarketCapClient {
    pub fn new(caller: RestApiCaller) -> Self {
        Self { caller }
    }

    fn request(&self, provider: &RateProviderConfig, url: &str) -> reqwest::RequestBuilder {
        let request = self.caller.get(url);
        match &provider.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteRateFetcher for CoinMarketCapClient {
    async fn fetch_rate(
        &self,
        provider: &RateProviderConfig,
        base: &CurrencySymbol,
        target: &CurrencySymbol,
    ) -> FetchResult<Decimal> {
        let request = self
            .request(provider, &provider.quotes_url())
            .query(&[("symbol", base.as_str()), ("convert", target.as_str())]);

        let response: QuotesResponse = self.caller.call_api(request, &provider.name).await?;

        let missing = || FetchError::MissingRate {
            service: provider.name.clone(),
            base: base.clone(),
            target: target.clone(),
        };

        // Upstream keys are symbols but not always in our casing.
        let asset = response
            .data
            .iter()
            .find(|(symbol, _)| CurrencySymbol::new(symbol.as_str()) == *base)
            .map(|(_, asset)| asset)
            .ok_or_else(missing)?;

        asset
            .quote
            .iter()
            .find(|(symbol, _)| CurrencySymbol::new(symbol.as_str()) == *target)
            .and_then(|(_, quote)| quote.price)
            .ok_or_else(missing)
    }

    async fn supported_base_currencies(
        &self,
        provider: &RateProviderConfig,
    ) -> FetchResult<Vec<CurrencySymbol>> {
        let request = self.request(provider, &provider.map_url());
        let response: MapResponse = self.caller.call_api(request, &provider.name).await?;

        Ok(response
            .data
            .into_iter()
            .map(|entry| CurrencySymbol::new(entry.symbol))
            .filter(|symbol| !symbol.is_empty())
            .collect())
    }
}
