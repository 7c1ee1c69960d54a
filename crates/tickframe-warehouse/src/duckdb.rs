//! `DuckDB` connection handling for per-key cache files.

use std::path::Path;

use ::duckdb::{params, Connection};

use crate::WarehouseError;

/// Schema of a cached table, stored in long format: one row per
/// `(timestamp, field)` pair. Executing it drops any previous table.
pub(crate) const CACHE_SCHEMA: &str = "DROP TABLE IF EXISTS cached_rows; \
     CREATE TABLE cached_rows (\
     ts_epoch BIGINT NOT NULL, \
     field VARCHAR NOT NULL, \
     value DOUBLE)";

/// Open a connection to a cache file, creating the file if needed.
///
/// # Errors
/// Returns an error if the database file cannot be opened or configured.
pub(crate) fn open_connection(path: &Path) -> Result<Connection, ::duckdb::Error> {
    let connection = Connection::open(path)?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

/// Whether the cache schema exists in this file.
pub(crate) fn has_cache_table(connection: &Connection) -> Result<bool, ::duckdb::Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'cached_rows'",
        params![],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Finalize a transaction, committing on success or rolling back on failure.
pub(crate) fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}
