//! CoinRates Common Types
//!
//! Shared types used across the CoinRates workspace: normalized currency
//! symbols, the rate map returned to callers, and the error taxonomy.

pub mod symbol;
pub mod rates;
pub mod error;

pub use symbol::*;
pub use rates::*;
pub use error::*;
