use thiserror::Error;

use crate::data_source::SourceError;
use tickframe_warehouse::WarehouseError;

/// Validation errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("series '{name}' has {index} timestamps but {values} values")]
    SeriesLengthMismatch {
        name: String,
        index: usize,
        values: usize,
    },
    #[error("series '{name}' index is not strictly increasing at position {position}")]
    SeriesNotSorted { name: String, position: usize },
    #[error("table column '{column}' appears more than once")]
    DuplicateColumn { column: String },
    #[error("table column '{column}' has {values} values for {index} timestamps")]
    TableLengthMismatch {
        column: String,
        index: usize,
        values: usize,
    },
}

/// Error classification for [`FrameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameErrorKind {
    NotFound,
    Fetch,
    Configuration,
    NotReady,
    Storage,
    Validation,
}

/// Top-level error type for dataset assembly.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Cache miss; recovered locally by fetching from the provider.
    #[error("no cached data for '{key}'")]
    NotFound { key: String },

    /// Provider failure; never retried here.
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    /// Missing or invalid parameter, reported at setup or construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A series was read before its owner finished setup.
    #[error("not ready: {0}")]
    NotReady(String),

    #[error(transparent)]
    Storage(WarehouseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl FrameError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady(message.into())
    }

    pub const fn kind(&self) -> FrameErrorKind {
        match self {
            Self::NotFound { .. } => FrameErrorKind::NotFound,
            Self::Fetch(_) => FrameErrorKind::Fetch,
            Self::Configuration(_) => FrameErrorKind::Configuration,
            Self::NotReady(_) => FrameErrorKind::NotReady,
            Self::Storage(_) => FrameErrorKind::Storage,
            Self::Validation(_) => FrameErrorKind::Validation,
        }
    }
}

impl From<WarehouseError> for FrameError {
    fn from(error: WarehouseError) -> Self {
        match error {
            WarehouseError::NotFound { key } => Self::NotFound { key },
            other => Self::Storage(other),
        }
    }
}
