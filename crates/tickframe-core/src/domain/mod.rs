//! # Domain Models
//!
//! Validated identifiers and timestamps shared by every tickframe component.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated instrument identifier, doubles as the cache key |
//! | [`UtcDateTime`] | UTC timestamp used for every series index |
//!
//! ```rust
//! use tickframe_core::{Ticker, UtcDateTime};
//!
//! let ticker = Ticker::parse(" spy ").expect("valid ticker");
//! assert_eq!(ticker.as_str(), "SPY");
//!
//! let day = UtcDateTime::parse_date("2024-01-02").expect("valid date");
//! assert_eq!(day.to_string(), "2024-01-02T00:00:00Z");
//! ```

mod ticker;
mod timestamp;

pub use ticker::Ticker;
pub use timestamp::UtcDateTime;
