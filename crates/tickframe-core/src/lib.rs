//! # Tickframe Core
//!
//! Assemble time-aligned tables of market data and derived indicators.
//!
//! ## Overview
//!
//! - **Columns** fetch one field of a ticker's daily history through a
//!   [`DataProvider`] and persist the full history in a [`CacheStore`]
//! - **Symbols** group the columns of one ticker
//! - **Features** and **ratios** derive new series from any registered series
//! - **Datasets** register all of the above and materialize one [`Table`],
//!   optionally as of a point in time without look-ahead
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Alpha Vantage) |
//! | [`cache`] | Per-ticker cache stores (`DuckDB`, in-memory) |
//! | [`column`] | Provider-backed columns and field normalization |
//! | [`config`] | Dataset configuration |
//! | [`data_source`] | Provider trait and raw payload types |
//! | [`dataset`] | Registration and table assembly |
//! | [`domain`] | Ticker and UTC timestamp types |
//! | [`error`] | Error types |
//! | [`feature`] | Returns, volatility, moving averages, Bollinger bands |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`ratio`] | Quotient of two series |
//! | [`series`] | UTC-indexed numeric series |
//! | [`symbol`] | Ticker with registered columns |
//! | [`table`] | Multi-column aligned tables |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tickframe_core::{
//!     AlphaVantageProvider, Column, Dataset, Feature, FrameConfig, SeriesRef, Symbol, Ticker,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Arc::new(AlphaVantageProvider::default());
//!     let spy = Symbol::new(Ticker::parse("SPY")?)
//!         .column("adj_close", Column::new("adjusted_close", provider))?;
//!
//!     let mut dataset = Dataset::new(&FrameConfig::default())?
//!         .symbol("spy", spy)?
//!         .feature(
//!             "sma20",
//!             Feature::simple_moving_average(SeriesRef::column("spy", "adj_close")).with_window(20),
//!         )?;
//!     dataset.setup()?;
//!
//!     let table = dataset.to_table(None)?;
//!     println!("{} rows from {:?}", table.len(), table.start());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Dataset      │── ratios / features (derived passes)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Symbol / Column │────▶│ CacheStore       │
//! └────────┬────────┘     │ (DuckDB/memory)  │
//!          │              └──────────────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ DataProvider    │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest/static) │
//! └─────────────────┘     └──────────────────┘
//! ```

pub mod adapters;
pub mod cache;
pub mod column;
pub mod config;
pub mod data_source;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod feature;
pub mod http_client;
pub mod ratio;
mod reference;
pub mod series;
pub mod symbol;
pub mod table;

// Provider adapters
pub use adapters::AlphaVantageProvider;

// Cache
pub use cache::{CacheStore, MemoryCache, WarehouseCache};

// Assembly
pub use column::{canonical_field, normalize, Column};
pub use config::FrameConfig;
pub use dataset::Dataset;
pub use feature::{Feature, Transform};
pub use ratio::{Ratio, RatioBuilder};
pub use reference::SeriesRef;
pub use symbol::Symbol;

// Data
pub use data_source::{
    DataProvider, ProviderId, RawRow, RawTable, SourceError, SourceErrorKind,
};
pub use domain::{Ticker, UtcDateTime};
pub use series::TimeSeries;
pub use table::{ColumnKey, Table, TableColumn, DERIVED_NAMESPACE};

// Errors
pub use error::{FrameError, FrameErrorKind, ValidationError};

// Storage
pub use tickframe_warehouse::{CachedRow, StoreConfig, TableStore, WarehouseError};

// HTTP
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, StaticHttpClient,
};
