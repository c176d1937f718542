//! Exchangerates-API-style fiat rates.
//!
//! Quotes: `GET {quotes}?base=<BASE>&symbols=<TARGET>` answering
//! `rates.<TARGET>`. Map: `GET {map}` answering the keys of `symbols`.
//! The API key travels as the `access_key` query parameter. This API
//! reports some failures with a 200 status and `"success": false`.

use std::collections::HashMap;

use async_trait::async_trait;
use coinrates_common::{CurrencySymbol, FetchError, FetchResult};
use coinrates_engine::{RateProviderConfig, RemoteRateFetcher};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::rest::RestApiCaller;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SymbolsResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    symbols: HashMap<String, String>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: Option<String>,
    info: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Client for Exchangerates-API-style providers.
#[derive(Debug, Clone, Default)]
pub struct ExchangeratesApiClient {
    caller: RestApiCaller,
}

impl ExchangeratesApiClient {
    pub fn new(caller: RestApiCaller) -> Self {
        Self { caller }
    }

    fn request(&self, provider: &RateProviderConfig, url: &str) -> reqwest::RequestBuilder {
        let request = self.caller.get(url);
        match &provider.api_key {
            Some(key) => request.query(&[("access_key", key.as_str())]),
            None => request,
        }
    }
}

/// A `"success": false` body is an upstream rejection of the request.
fn rejected(provider: &RateProviderConfig, error: Option<ApiError>) -> FetchError {
    let body = error
        .and_then(|e| e.info.or(e.kind))
        .unwrap_or_else(|| "request was not successful".to_string());

    FetchError::Status {
        service: provider.name.clone(),
        status: 400,
        body,
    }
}

#[async_trait]
impl RemoteRateFetcher for ExchangeratesApiClient {
    async fn fetch_rate(
        &self,
        provider: &RateProviderConfig,
        base: &CurrencySymbol,
        target: &CurrencySymbol,
    ) -> FetchResult<Decimal> {
        let request = self
            .request(provider, &provider.quotes_url())
            .query(&[("base", base.as_str()), ("symbols", target.as_str())]);

        let response: RatesResponse = self.caller.call_api(request, &provider.name).await?;

        if !response.success {
            return Err(rejected(provider, response.error));
        }

        response
            .rates
            .iter()
            .find(|(symbol, _)| CurrencySymbol::new(symbol.as_str()) == *target)
            .map(|(_, rate)| *rate)
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
        let request = self.request(provider, &provider.map_url());
        let response: SymbolsResponse = self.caller.call_api(request, &provider.name).await?;

        if !response.success {
            return Err(rejected(provider, response.error));
        }

        let mut symbols: Vec<CurrencySymbol> =
            response.symbols.into_keys().map(CurrencySymbol::new).collect();
        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinrates_engine::ProviderKind;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn provider(url: &str) -> RateProviderConfig {
        let mut provider = RateProviderConfig::new("exchangeratesapi", url)
            .with_kind(ProviderKind::ExchangeratesApi)
            .with_api_key("secret");
        provider.quotes_endpoint = "/v1/latest".to_string();
        provider.map_endpoint = "/v1/symbols".to_string();
        provider
    }

    #[tokio::test]
    async fn test_fetch_rate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/latest")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("access_key".into(), "secret".into()),
                Matcher::UrlEncoded("base".into(), "EUR".into()),
                Matcher::UrlEncoded("symbols".into(), "USD".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"success": true, "base": "EUR", "rates": {"USD": 1.0842}}"#)
            .create_async()
            .await;

        let client = ExchangeratesApiClient::default();
        let rate = client
            .fetch_rate(&provider(&server.url()), &CurrencySymbol::eur(), &CurrencySymbol::usd())
            .await
            .unwrap();

        assert_eq!(rate, dec!(1.0842));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unsuccessful_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/latest")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"success": false, "error": {"code": 201, "type": "invalid_base_currency",
                    "info": "An invalid base currency has been entered."}}"#,
            )
            .create_async()
            .await;

        let client = ExchangeratesApiClient::default();
        let result = client
            .fetch_rate(&provider(&server.url()), &CurrencySymbol::new("XXX"), &CurrencySymbol::usd())
            .await;

        match result {
            Err(FetchError::Status { status, body, .. }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "An invalid base currency has been entered.");
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/latest")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let client = ExchangeratesApiClient::default();
        let error = client
            .fetch_rate(&provider(&server.url()), &CurrencySymbol::eur(), &CurrencySymbol::usd())
            .await
            .unwrap_err();

        assert!(error.is_retryable());
        assert_eq!(error.status_code(), 500);
    }

    #[tokio::test]
    async fn test_supported_base_currencies() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/symbols")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success": true, "symbols": {"USD": "United States Dollar", "EUR": "Euro"}}"#)
            .create_async()
            .await;

        let client = ExchangeratesApiClient::default();
        let bases = client
            .supported_base_currencies(&provider(&server.url()))
            .await
            .unwrap();

        assert_eq!(bases, vec![CurrencySymbol::eur(), CurrencySymbol::usd()]);
    }
}
