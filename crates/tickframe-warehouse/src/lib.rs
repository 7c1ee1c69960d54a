//! # Tickframe Warehouse
//!
//! DuckDB-backed cache for per-symbol tables.
//!
//! ## Overview
//!
//! Every cache key (one per traded symbol) owns a single `DuckDB` file under
//! the configured cache directory. A file holds one table in long format:
//!
//! | Column | Type | Description |
//! |--------|------|-------------|
//! | `ts_epoch` | `BIGINT` | Row timestamp, seconds since the Unix epoch (UTC) |
//! | `field` | `VARCHAR` | Field name, e.g. `adjusted_close` |
//! | `value` | `DOUBLE` | Field value, `NULL` when undefined |
//!
//! Saving a key replaces its whole table inside one transaction; loading a
//! key that was never saved reports [`WarehouseError::NotFound`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tickframe_warehouse::{CachedRow, StoreConfig, TableStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = TableStore::open(StoreConfig::new("/tmp/tickframe-cache"))?;
//!
//!     store.save("SPY", &[CachedRow::new(1_704_153_600, "close", Some(472.65))])?;
//!     let rows = store.load("SPY")?;
//!     println!("loaded {} rows", rows.len());
//!
//!     Ok(())
//! }
//! ```

mod duckdb;
pub mod error;

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, ToSql};

pub use error::WarehouseError;

use crate::duckdb::{finalize_transaction, has_cache_table, open_connection, CACHE_SCHEMA};

/// Environment variable consulted by [`StoreConfig::default`].
pub const DATA_CACHE_ENV: &str = "DATA_CACHE";

const CACHE_FILE_EXTENSION: &str = "duckdb";
const MAX_KEY_LEN: usize = 64;

/// Configuration for the table store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one cache file per key.
    pub cache_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(resolve_cache_dir())
    }
}

/// One cached `(timestamp, field, value)` cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRow {
    /// Seconds since the Unix epoch, UTC.
    pub ts_epoch: i64,
    /// Field name.
    pub field: String,
    /// Field value; `None` for undefined values.
    pub value: Option<f64>,
}

impl CachedRow {
    pub fn new(ts_epoch: i64, field: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            ts_epoch,
            field: field.into(),
            value,
        }
    }
}

/// Key-value store of cached tables, one `DuckDB` file per key.
#[derive(Debug, Clone)]
pub struct TableStore {
    config: StoreConfig,
}

impl TableStore {
    /// Open a store, creating the cache directory if it is absent.
    pub fn open(config: StoreConfig) -> Result<Self, WarehouseError> {
        fs::create_dir_all(&config.cache_dir)?;
        tracing::debug!(cache_dir = %config.cache_dir.display(), "opened table store");
        Ok(Self { config })
    }

    /// Directory holding the cache files.
    pub fn cache_dir(&self) -> &Path {
        self.config.cache_dir.as_path()
    }

    /// Path of the cache file for `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, WarehouseError> {
        validate_key(key)?;
        Ok(self
            .config
            .cache_dir
            .join(format!("{key}.{CACHE_FILE_EXTENSION}")))
    }

    /// Whether a cache file exists for `key`.
    pub fn contains(&self, key: &str) -> Result<bool, WarehouseError> {
        Ok(self.path_for(key)?.is_file())
    }

    /// Load every cached row for `key`, ordered by timestamp then field.
    ///
    /// # Errors
    /// Returns [`WarehouseError::NotFound`] when nothing was saved for `key`.
    pub fn load(&self, key: &str) -> Result<Vec<CachedRow>, WarehouseError> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Err(WarehouseError::NotFound {
                key: key.to_owned(),
            });
        }

        tracing::debug!(key, path = %path.display(), "loading cached table");
        let connection = open_connection(path.as_path())?;
        if !has_cache_table(&connection)? {
            return Err(WarehouseError::NotFound {
                key: key.to_owned(),
            });
        }

        let mut statement = connection
            .prepare("SELECT ts_epoch, field, value FROM cached_rows ORDER BY ts_epoch, field")?;
        let rows = statement
            .query_map(params![], |row| {
                Ok(CachedRow {
                    ts_epoch: row.get(0)?,
                    field: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(WarehouseError::NotFound {
                key: key.to_owned(),
            });
        }
        Ok(rows)
    }

    /// Replace the cached table for `key` with `rows`.
    ///
    /// Duplicate `(ts_epoch, field)` pairs keep the last value.
    pub fn save(&self, key: &str, rows: &[CachedRow]) -> Result<(), WarehouseError> {
        let path = self.path_for(key)?;
        tracing::debug!(key, rows = rows.len(), path = %path.display(), "saving cached table");

        let mut cells = BTreeMap::new();
        for row in rows {
            cells.insert((row.ts_epoch, row.field.as_str()), row.value);
        }

        let connection = open_connection(path.as_path())?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            connection.execute_batch(CACHE_SCHEMA)?;
            let mut statement = connection
                .prepare("INSERT INTO cached_rows (ts_epoch, field, value) VALUES (?, ?, ?)")?;
            for ((ts_epoch, field), value) in &cells {
                let params: [&dyn ToSql; 3] = [ts_epoch, field, value];
                statement.execute(params.as_slice())?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Delete the cache file for `key`; returns whether a file existed.
    pub fn remove(&self, key: &str) -> Result<bool, WarehouseError> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// Keys with a cache file, sorted.
    pub fn keys(&self) -> Result<Vec<String>, WarehouseError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.config.cache_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CACHE_FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Reject keys that could escape the cache directory.
fn validate_key(key: &str) -> Result<(), WarehouseError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(WarehouseError::InvalidData(format!(
            "cache key must be 1..={MAX_KEY_LEN} characters: '{key}'"
        )));
    }
    if key.starts_with('.') {
        return Err(WarehouseError::InvalidData(format!(
            "cache key must not start with '.': '{key}'"
        )));
    }
    if let Some(ch) = key
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_')))
    {
        return Err(WarehouseError::InvalidData(format!(
            "cache key contains invalid character '{ch}': '{key}'"
        )));
    }
    Ok(())
}

/// Resolve the cache directory from the environment.
fn resolve_cache_dir() -> PathBuf {
    if let Some(path) = env::var_os(DATA_CACHE_ENV) {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickframe").join("cache");
    }

    PathBuf::from(".tickframe").join("cache")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store(dir: &Path) -> TableStore {
        TableStore::open(StoreConfig::new(dir.join("cache"))).expect("store open")
    }

    #[test]
    fn open_creates_missing_cache_directory() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());
        assert!(store.cache_dir().is_dir());
    }

    #[test]
    fn load_of_unsaved_key_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());

        let err = store.load("SPY").expect_err("must miss");
        assert!(err.is_not_found());
        assert!(!store.contains("SPY").expect("valid key"));
    }

    #[test]
    fn save_then_load_returns_rows_in_timestamp_order() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());

        let rows = vec![
            CachedRow::new(200, "close", Some(11.0)),
            CachedRow::new(100, "close", Some(10.0)),
            CachedRow::new(100, "volume", None),
        ];
        store.save("SPY", &rows).expect("save");

        let loaded = store.load("SPY").expect("load");
        assert_eq!(
            loaded,
            vec![
                CachedRow::new(100, "close", Some(10.0)),
                CachedRow::new(100, "volume", None),
                CachedRow::new(200, "close", Some(11.0)),
            ]
        );
    }

    #[test]
    fn save_replaces_previous_table() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());

        store
            .save("SPY", &[CachedRow::new(100, "close", Some(1.0))])
            .expect("first save");
        store
            .save("SPY", &[CachedRow::new(300, "open", Some(2.0))])
            .expect("second save");

        let loaded = store.load("SPY").expect("load");
        assert_eq!(loaded, vec![CachedRow::new(300, "open", Some(2.0))]);
    }

    #[test]
    fn duplicate_cells_keep_last_value() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());

        store
            .save(
                "QQQ",
                &[
                    CachedRow::new(100, "close", Some(1.0)),
                    CachedRow::new(100, "close", Some(2.0)),
                ],
            )
            .expect("save");

        assert_eq!(
            store.load("QQQ").expect("load"),
            vec![CachedRow::new(100, "close", Some(2.0))]
        );
    }

    #[test]
    fn keys_lists_saved_tables_and_remove_deletes_them() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());
        store
            .save("TLT", &[CachedRow::new(1, "close", Some(1.0))])
            .expect("save");
        store
            .save("SPY", &[CachedRow::new(1, "close", Some(1.0))])
            .expect("save");

        assert_eq!(store.keys().expect("keys"), vec!["SPY", "TLT"]);
        assert!(store.remove("SPY").expect("remove"));
        assert!(!store.remove("SPY").expect("second remove"));
        assert_eq!(store.keys().expect("keys"), vec!["TLT"]);
    }

    #[test]
    fn rejects_keys_that_escape_the_cache_directory() {
        let temp = tempdir().expect("tempdir");
        let store = open_store(temp.path());

        for key in ["", "../SPY", "a/b", ".hidden"] {
            let err = store.path_for(key).expect_err("must reject");
            assert!(matches!(err, WarehouseError::InvalidData(_)), "key {key:?}");
        }
    }
}
