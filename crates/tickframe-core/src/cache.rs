//! Per-ticker table cache.
//!
//! [`CacheStore`] is the seam between a [`Column`](crate::Column) and the
//! storage engine. [`WarehouseCache`] persists to `DuckDB` files through
//! [`TableStore`]; [`MemoryCache`] keeps tables in process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use tickframe_warehouse::{CachedRow, TableStore};

use crate::table::{ColumnKey, TableColumn};
use crate::{FrameConfig, FrameError, Table, Ticker, UtcDateTime};

/// Key-value store of cached tables, one entry per ticker.
///
/// `load` after `save` returns the saved table with a sorted, deduplicated
/// UTC index and columns in field-name order.
pub trait CacheStore: Send + Sync {
    /// # Errors
    /// Returns [`FrameError::NotFound`] when nothing is cached for `ticker`.
    fn load(&self, ticker: &Ticker) -> Result<Table, FrameError>;

    /// Replace the cached table for `ticker`.
    fn save(&self, ticker: &Ticker, table: &Table) -> Result<(), FrameError>;
}

/// [`CacheStore`] backed by one `DuckDB` file per ticker.
#[derive(Debug, Clone)]
pub struct WarehouseCache {
    store: TableStore,
}

impl WarehouseCache {
    /// Open the cache directory named by `config`, creating it if absent.
    pub fn open(config: &FrameConfig) -> Result<Self, FrameError> {
        Ok(Self {
            store: TableStore::open(config.store.clone())?,
        })
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }
}

impl CacheStore for WarehouseCache {
    fn load(&self, ticker: &Ticker) -> Result<Table, FrameError> {
        let rows = self.store.load(&ticker.cache_key())?;
        table_from_rows(ticker, &rows)
    }

    fn save(&self, ticker: &Ticker, table: &Table) -> Result<(), FrameError> {
        self.store.save(&ticker.cache_key(), &table_to_rows(table))?;
        Ok(())
    }
}

/// In-process [`CacheStore`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&ticker.cache_key())
    }

    pub fn len(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn load(&self, ticker: &Ticker) -> Result<Table, FrameError> {
        let key = ticker.cache_key();
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(&key)
            .cloned()
            .ok_or(FrameError::NotFound { key })
    }

    fn save(&self, ticker: &Ticker, table: &Table) -> Result<(), FrameError> {
        // Stored through the row form so that loads match the warehouse layout.
        let normalized = table_from_rows(ticker, &table_to_rows(table))?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.insert(ticker.cache_key(), normalized);
        Ok(())
    }
}

/// Flatten a table into `(timestamp, field, value)` cells.
pub(crate) fn table_to_rows(table: &Table) -> Vec<CachedRow> {
    let mut rows = Vec::with_capacity(table.len() * table.width());
    for (position, ts) in table.index().iter().enumerate() {
        for column in table.columns() {
            let value = column.values[position];
            rows.push(CachedRow::new(
                ts.unix_timestamp(),
                column.key.field.clone(),
                (!value.is_nan()).then_some(value),
            ));
        }
    }
    rows
}

/// Rebuild a table under namespace `ticker` from cached cells.
pub(crate) fn table_from_rows(ticker: &Ticker, rows: &[CachedRow]) -> Result<Table, FrameError> {
    let mut timestamps = Vec::with_capacity(rows.len());
    let mut cells: BTreeMap<&str, HashMap<i64, f64>> = BTreeMap::new();
    for row in rows {
        timestamps.push(row.ts_epoch);
        cells
            .entry(row.field.as_str())
            .or_default()
            .insert(row.ts_epoch, row.value.unwrap_or(f64::NAN));
    }
    timestamps.sort_unstable();
    timestamps.dedup();

    let index = timestamps
        .iter()
        .map(|ts| UtcDateTime::from_unix_timestamp(*ts))
        .collect::<Result<Vec<_>, _>>()?;
    let columns = cells
        .into_iter()
        .map(|(field, values)| {
            let values = timestamps
                .iter()
                .map(|ts| values.get(ts).copied().unwrap_or(f64::NAN))
                .collect();
            TableColumn::new(ColumnKey::new(ticker.as_str(), field), values)
        })
        .collect();

    Ok(Table::new(index, columns)?)
}
