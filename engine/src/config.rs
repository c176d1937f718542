//! Engine configuration.
//!
//! Configuration is loaded once at startup and treated as immutable for the
//! lifetime of the process.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;

use coinrates_common::CurrencySymbol;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Wire format spoken by an upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderKind {
    /// Crypto quotes keyed by symbol (`data.<BASE>.quote.<TARGET>.price`).
    #[default]
    CoinMarketCap,
    /// Fiat rates keyed by target (`rates.<TARGET>`).
    ExchangeratesApi,
}

/// One configured upstream rate provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateProviderConfig {
    /// Unique provider name, also the first component of cache keys.
    pub name: String,
    /// Wire format of the provider.
    #[serde(default)]
    pub kind: ProviderKind,
    pub service_base_url: String,
    /// Path listing the base currencies the provider knows.
    #[serde(default)]
    pub map_endpoint: String,
    /// Path serving rate quotes.
    pub quotes_endpoint: String,
    /// Target symbols the provider can price against.
    #[serde(default, alias = "supportedTargetedCurrencies")]
    pub supported_target_currencies: BTreeSet<CurrencySymbol>,
    /// Targets used when a request names none.
    #[serde(default, alias = "defaultTargetedCurrencies")]
    pub default_target_currencies: Vec<CurrencySymbol>,
    /// Base symbols known without asking the map endpoint.
    #[serde(default)]
    pub supported_base_currencies: BTreeSet<CurrencySymbol>,
    /// Whether fetched rates go through the cache.
    #[serde(default, alias = "enableCaching")]
    pub caching_enabled: bool,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl RateProviderConfig {
    /// Create a provider with no currencies configured.
    pub fn new(name: impl Into<String>, service_base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::default(),
            service_base_url: service_base_url.into(),
            map_endpoint: "/map".to_string(),
            quotes_endpoint: "/quotes".to_string(),
            supported_target_currencies: BTreeSet::new(),
            default_target_currencies: Vec::new(),
            supported_base_currencies: BTreeSet::new(),
            caching_enabled: false,
            api_key: None,
        }
    }

    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set supported and default target currencies.
    pub fn with_targets(mut self, supported: &[&str], defaults: &[&str]) -> Self {
        self.supported_target_currencies = supported.iter().map(|s| CurrencySymbol::new(s)).collect();
        self.default_target_currencies = defaults.iter().map(|s| CurrencySymbol::new(s)).collect();
        self
    }

    /// Set the statically known base currencies.
    pub fn with_base_currencies(mut self, bases: &[&str]) -> Self {
        self.supported_base_currencies = bases.iter().map(|s| CurrencySymbol::new(s)).collect();
        self
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Check if the provider can price against a target.
    pub fn supports_target(&self, target: &CurrencySymbol) -> bool {
        self.supported_target_currencies.contains(target)
    }

    /// Full URL of the quotes endpoint.
    pub fn quotes_url(&self) -> String {
        join_url(&self.service_base_url, &self.quotes_endpoint)
    }

    /// Full URL of the map endpoint.
    pub fn map_url(&self) -> String {
        join_url(&self.service_base_url, &self.map_endpoint)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Declares which currencies a named provider is authoritative for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRoute {
    pub provider_name: String,
    /// Targets this provider answers for. Empty means all.
    #[serde(default, alias = "targetedCurrencies")]
    pub target_currencies: BTreeSet<CurrencySymbol>,
    /// Base currencies this provider serves. Empty means all.
    #[serde(default)]
    pub base_currencies: BTreeSet<CurrencySymbol>,
}

impl ProviderRoute {
    /// A symbol-agnostic route, used for the main provider.
    pub fn main(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            target_currencies: BTreeSet::new(),
            base_currencies: BTreeSet::new(),
        }
    }

    pub fn with_bases(mut self, bases: &[&str]) -> Self {
        self.base_currencies = bases.iter().map(|s| CurrencySymbol::new(s)).collect();
        self
    }

    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.target_currencies = targets.iter().map(|s| CurrencySymbol::new(s)).collect();
        self
    }

    /// Check if this route serves the base currency.
    pub fn serves_base(&self, base: &CurrencySymbol) -> bool {
        self.base_currencies.is_empty() || self.base_currencies.contains(base)
    }

    /// Check if this route answers for the target currency.
    pub fn covers_target(&self, target: &CurrencySymbol) -> bool {
        self.target_currencies.is_empty() || self.target_currencies.contains(target)
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// How long a cached rate stays valid.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum number of cached rates.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// Longest accepted cache TTL, one year.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn default_ttl_secs() -> u64 {
    60
}

fn default_max_entries() -> usize {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    /// Entry lifetime, clamped to [`MAX_TTL_SECS`].
    pub fn ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.ttl_secs.min(MAX_TTL_SECS)).unwrap_or(0);
        chrono::Duration::try_seconds(secs).unwrap_or_else(chrono::Duration::zero)
    }
}

/// Main engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upstream providers, in priority order.
    pub providers: Vec<RateProviderConfig>,
    /// Routes; may be omitted when exactly one provider is configured.
    #[serde(default)]
    pub routes: Vec<ProviderRoute>,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Deadline for one whole resolution.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl EngineConfig {
    /// Create a configuration from providers, with no routes.
    pub fn new(providers: Vec<RateProviderConfig>) -> Self {
        Self {
            providers,
            routes: Vec::new(),
            cache: CacheConfig::default(),
            request_timeout_ms: None,
        }
    }

    pub fn with_routes(mut self, routes: Vec<ProviderRoute>) -> Self {
        self.routes = routes;
        self
    }

    /// Parse configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Load a settings file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Apply overrides from environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup.
    ///
    /// Recognized keys are `COINRATES_REQUEST_TIMEOUT_MS`,
    /// `COINRATES_CACHE_TTL_SECS` and `COINRATES_<PROVIDER>_API_KEY`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = lookup("COINRATES_REQUEST_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                self.request_timeout_ms = Some(timeout);
            }
        }

        if let Some(ttl) = lookup("COINRATES_CACHE_TTL_SECS") {
            if let Ok(ttl) = ttl.parse() {
                self.cache.ttl_secs = ttl;
            }
        }

        for provider in &mut self.providers {
            if let Some(key) = lookup(&api_key_var(&provider.name)) {
                provider.api_key = Some(key);
            }
        }
    }

    /// Routes in effect. A lone provider without routes is the main route.
    pub fn effective_routes(&self) -> Vec<ProviderRoute> {
        if self.routes.is_empty() && self.providers.len() == 1 {
            return vec![ProviderRoute::main(self.providers[0].name.clone())];
        }
        self.routes.clone()
    }

    /// Look up a provider by name.
    pub fn provider(&self, name: &str) -> Option<&RateProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.providers.is_empty() {
            return Err("At least one provider must be configured".to_string());
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err("Provider name cannot be empty".to_string());
            }
            if !names.insert(provider.name.as_str()) {
                return Err(format!("Duplicate provider name: {}", provider.name));
            }
            if provider.service_base_url.is_empty() || provider.quotes_endpoint.is_empty() {
                return Err(format!("Provider {} is missing its service URL", provider.name));
            }
            if let Some(default) = provider
                .default_target_currencies
                .iter()
                .find(|c| !provider.supports_target(c))
            {
                return Err(format!(
                    "Provider {} default target {} is not a supported target",
                    provider.name, default
                ));
            }
        }

        if self.providers.len() > 1 && self.routes.is_empty() {
            return Err("Routes are required when more than one provider is configured".to_string());
        }

        for route in &self.routes {
            if !names.contains(route.provider_name.as_str()) {
                return Err(format!("Route names unknown provider: {}", route.provider_name));
            }
        }

        if self.cache.ttl_secs > MAX_TTL_SECS {
            return Err(format!(
                "Cache TTL of {}s exceeds the maximum of {}s",
                self.cache.ttl_secs, MAX_TTL_SECS
            ));
        }

        if self.request_timeout_ms == Some(0) {
            return Err("Request timeout cannot be 0".to_string());
        }

        Ok(())
    }
}

fn api_key_var(provider_name: &str) -> String {
    let name: String = provider_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("COINRATES_{}_API_KEY", name)
}
