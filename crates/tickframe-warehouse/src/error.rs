use thiserror::Error;

/// Errors that can occur while reading or writing cached tables.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (cache directory or file operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// No cached table exists for the key.
    #[error("no cached table for '{key}'")]
    NotFound { key: String },

    /// Key or payload rejected before touching the store.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl WarehouseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
