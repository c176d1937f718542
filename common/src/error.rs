//! Error types for CoinRates.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{bracketed_list, CurrencySymbol, SymbolFailure};

/// Request-level errors returned by the exchange rate engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    /// Base currency is not served by any configured provider.
    #[error("{0} is invalid or Unsupported Cryptocurrency")]
    UnsupportedBaseCurrency(CurrencySymbol),

    /// Every requested target currency was invalid, listed in input order.
    #[error("{} are Unsupported fiat currencies", bracketed_list(.0))]
    UnsupportedTargetCurrencies(Vec<CurrencySymbol>),

    /// Every valid target failed to fetch or came back as zero, so the
    /// request is rejected as invalid.
    #[error("No exchange rates available for {base}: {} symbol(s) failed", .failures.len())]
    RatesUnavailable {
        base: CurrencySymbol,
        failures: Vec<SymbolFailure>,
    },

    /// The overall request deadline elapsed before all fetches settled.
    #[error("Exchange rate request timed out after {0}ms")]
    Timeout(u64),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RateError {
    /// Whether the request was rejected as invalid.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RateError::UnsupportedBaseCurrency(_)
                | RateError::UnsupportedTargetCurrencies(_)
                | RateError::RatesUnavailable { .. }
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RateError::RatesUnavailable { .. } | RateError::Timeout(_))
    }

    /// Get the stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            RateError::UnsupportedBaseCurrency(_) => "UNSUPPORTED_BASE_CURRENCY",
            RateError::UnsupportedTargetCurrencies(_) => "UNSUPPORTED_TARGET_CURRENCIES",
            RateError::RatesUnavailable { .. } => "RATES_UNAVAILABLE",
            RateError::Timeout(_) => "TIMEOUT",
            RateError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// HTTP-style status code for transports that need one.
    pub fn status_code(&self) -> u16 {
        match self {
            RateError::UnsupportedBaseCurrency(_)
            | RateError::UnsupportedTargetCurrencies(_)
            | RateError::RatesUnavailable { .. } => 400,
            RateError::Timeout(_) => 504,
            RateError::Configuration(_) => 500,
        }
    }
}

/// Result type alias for engine operations.
pub type RateResult<T> = std::result::Result<T, RateError>;

/// Failures reported by a remote rate fetcher.
///
/// The engine treats these as opaque; only the fetcher and the error
/// envelope look inside.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("Request to [{service}] failed: {message}")]
    Transport { service: String, message: String },

    /// Upstream answered with a non-success status.
    #[error("Request to [{service}] failed with following response: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    /// Upstream payload could not be decoded.
    #[error("Malformed response from [{service}]: {message}")]
    Parse { service: String, message: String },

    /// Payload decoded but carried no rate for the pair.
    #[error("[{service}] returned no rate for {base}/{target}")]
    MissingRate {
        service: String,
        base: CurrencySymbol,
        target: CurrencySymbol,
    },

    /// Payload carried a rate of exactly zero.
    #[error("[{service}] returned a zero rate for {base}/{target}")]
    ZeroRate {
        service: String,
        base: CurrencySymbol,
        target: CurrencySymbol,
    },
}

impl FetchError {
    /// Get the service that produced this failure.
    pub fn service(&self) -> &str {
        match self {
            FetchError::Transport { service, .. }
            | FetchError::Status { service, .. }
            | FetchError::Parse { service, .. }
            | FetchError::MissingRate { service, .. }
            | FetchError::ZeroRate { service, .. } => service,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Upstream 400s stay 400; anything else is an internal failure.
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::Status { status: 400, .. } => 400,
            _ => 500,
        }
    }
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Error envelope handed to callers.
///
/// Server-side failures get a fresh `error_id` so they can be correlated
/// with logs; rejected requests carry none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<Uuid>,
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// HTTP-style status code.
    pub status_code: u16,
}

impl ErrorDetails {
    /// Create a new envelope with a fresh error ID.
    pub fn new(code: impl Into<String>, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            error_id: Some(Uuid::new_v4()),
            code: code.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Drop the error ID for failures that are not worth logging.
    pub fn without_error_id(mut self) -> Self {
        self.error_id = None;
        self
    }

    /// Envelope for a raw fetch failure.
    pub fn from_fetch(error: &FetchError) -> Self {
        match error.status_code() {
            400 => Self::new("BAD_REQUEST", "Bad Request", 400),
            status => Self::new("INTERNAL_SERVER_ERROR", "Internal Server Error", status),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"code\":\"{}\"}}", self.code))
    }
}

impl From<&RateError> for ErrorDetails {
    fn from(error: &RateError) -> Self {
        let details = Self::new(error.error_code(), error.to_string(), error.status_code());
        if error.is_validation() {
            details.without_error_id()
        } else {
            details
        }
    }
}
