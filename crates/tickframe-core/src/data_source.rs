//! Provider contract and raw fetch payloads.
//!
//! A [`DataProvider`] returns the full available history of one ticker as a
//! [`RawTable`] with provider-native field names. Normalizing those names,
//! sorting and localizing timestamps happens in [`Column`](crate::Column),
//! not in the provider.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//!
//! use tickframe_core::{DataProvider, ProviderId, RawRow, RawTable, SourceError, Ticker};
//! use time::macros::datetime;
//!
//! struct Constant;
//!
//! impl DataProvider for Constant {
//!     fn id(&self) -> ProviderId {
//!         ProviderId::new("constant")
//!     }
//!
//!     fn fetch(&self, _ticker: &Ticker) -> Result<RawTable, SourceError> {
//!         let fields = BTreeMap::from([(String::from("4. close"), 1.0)]);
//!         Ok(RawTable::new(vec![RawRow::new(datetime!(2024-01-02 0:00), fields)]))
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use time::PrimitiveDateTime;

use crate::Ticker;

/// Identifier of a data provider, used in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProviderId(&'static str);

impl ProviderId {
    pub const ALPHAVANTAGE: Self = Self::new("alphavantage");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Provider error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    MalformedPayload,
    Internal,
}

/// Structured provider failure.
///
/// `retryable` is advisory: callers decide whether and when to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedPayload,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::MalformedPayload => "source.malformed_payload",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// One fetched row: a naive timestamp plus provider-named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub timestamp: PrimitiveDateTime,
    pub fields: BTreeMap<String, f64>,
}

impl RawRow {
    pub fn new(timestamp: PrimitiveDateTime, fields: BTreeMap<String, f64>) -> Self {
        Self { timestamp, fields }
    }
}

/// Rows as returned by a provider, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Source of raw history for a ticker.
///
/// Implementations return the full available history and never retry;
/// failures surface to the caller unchanged.
pub trait DataProvider: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> ProviderId;

    /// Fetches every available row for `ticker`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failures, rate limiting, unknown
    /// tickers or payloads that cannot be parsed.
    fn fetch(&self, ticker: &Ticker) -> Result<RawTable, SourceError>;
}
