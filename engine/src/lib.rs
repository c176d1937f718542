//! CoinRates Exchange Rate Engine
//!
//! Resolves current exchange rates for a base currency (fiat or crypto)
//! against a set of target currencies.
//!
//! # Features
//!
//! - Currency validation with partial-failure semantics
//! - One or more upstream providers, routed by base currency
//! - Per-provider rate caching with configurable TTL
//! - Concurrent fan-out of upstream fetches
//!
//! # Example
//!
//! ```rust,ignore
//! use coinrates_engine::{EngineConfig, ExchangeRateResolver};
//!
//! let config = EngineConfig::from_file("settings.json")?;
//! let resolver = ExchangeRateResolver::from_config(&config, fetcher).await?;
//!
//! let rates = resolver.get_exchange_rates("BTC", None).await?;
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod resolver;
pub mod selector;
pub mod validator;

pub use cache::{CacheGateway, CacheKey, RateCache, SharedRateCache};
pub use catalog::CurrencyCatalog;
pub use config::{CacheConfig, EngineConfig, ProviderKind, ProviderRoute, RateProviderConfig};
pub use error::ConfigError;
pub use fetcher::RemoteRateFetcher;
pub use resolver::{ExchangeRateResolver, Resolution};
pub use selector::ProviderSelector;
pub use validator::CurrencyValidator;

#[cfg(any(test, feature = "test-utils"))]
pub use fetcher::MockRateFetcher;
