//! CoinRates HTTP Fetchers
//!
//! Concrete [`RemoteRateFetcher`](coinrates_engine::RemoteRateFetcher)
//! implementations that call upstream rate providers over HTTP.
//!
//! - [`RestApiCaller`]: shared HTTP plumbing and status-code handling
//! - [`CoinMarketCapClient`]: crypto quotes keyed by base symbol
//! - [`ExchangeratesApiClient`]: fiat rates keyed by target symbol
//! - [`HttpRateFetcher`]: dispatches on each provider's configured kind

pub mod coinmarketcap;
pub mod exchangerates;
pub mod http;
pub mod rest;

pub use coinmarketcap::CoinMarketCapClient;
pub use exchangerates::ExchangeratesApiClient;
pub use http::HttpRateFetcher;
pub use rest::RestApiCaller;
