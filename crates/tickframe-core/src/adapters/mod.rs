//! Provider adapters.
//!
//! | Adapter | Endpoint |
//! |---------|----------|
//! | [`AlphaVantageProvider`] | `TIME_SERIES_DAILY_ADJUSTED`, full history |

pub mod alphavantage;

pub use alphavantage::AlphaVantageProvider;
