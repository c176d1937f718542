//! Currency symbols.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency symbol such as `BTC` or `EUR`, fiat or crypto.
///
/// Symbols are compared case-insensitively by normalizing to uppercase on
/// construction, so a `CurrencySymbol` can be used directly as a map or
/// cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencySymbol(String);

impl CurrencySymbol {
    /// Create a new symbol, trimming whitespace and uppercasing.
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    /// Get the normalized symbol.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the symbol is empty after normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn btc() -> Self {
        Self::new("BTC")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencySymbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencySymbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CurrencySymbol> for String {
    fn from(symbol: CurrencySymbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for CurrencySymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Render symbols as `[A,B,C]`, preserving order.
pub fn bracketed_list(symbols: &[CurrencySymbol]) -> String {
    let joined = symbols
        .iter()
        .map(CurrencySymbol::as_str)
        .collect::<Vec<_>>()
        .join(",");
    format!("[{}]", joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(CurrencySymbol::new(" btc ").as_str(), "BTC");
        assert_eq!(CurrencySymbol::new("eUr"), CurrencySymbol::eur());
        assert!(CurrencySymbol::new("   ").is_empty());
    }

    #[test]
    fn test_symbol_serde_normalizes() {
        let symbol: CurrencySymbol = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(symbol, CurrencySymbol::usd());
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"USD\"");
    }

    #[test]
    fn test_bracketed_list() {
        let symbols = vec![CurrencySymbol::new("ooks"), CurrencySymbol::new("syp")];
        assert_eq!(bracketed_list(&symbols), "[OOKS,SYP]");
        assert_eq!(bracketed_list(&[]), "[]");
    }
}
