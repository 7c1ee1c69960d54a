//! Provider-backed columns.
//!
//! A [`Column`] selects one field (`adjusted_close`, `volume`, ...) from the
//! normalized history of a ticker. The full table is cached per ticker, so
//! every column of a symbol reads the same cache entry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::data_source::{DataProvider, ProviderId, RawTable, SourceError};
use crate::table::{ColumnKey, TableColumn};
use crate::{FrameError, Table, Ticker, TimeSeries, UtcDateTime};

/// Provider field spellings and their canonical names.
const FIELD_NAMES: [(&str, &str); 8] = [
    ("1. open", "open"),
    ("2. high", "high"),
    ("3. low", "low"),
    ("4. close", "close"),
    ("5. adjusted close", "adjusted_close"),
    ("6. volume", "volume"),
    ("7. dividend amount", "dividend_amount"),
    ("8. split coefficient", "split_coefficient"),
];

/// Canonical name for a provider field; unknown names pass through.
pub fn canonical_field(name: &str) -> &str {
    FIELD_NAMES
        .iter()
        .find(|(native, _)| *native == name)
        .map_or(name, |(_, canonical)| *canonical)
}

/// One field of one ticker's history, fetched through a provider and
/// persisted in a [`CacheStore`].
pub struct Column {
    time_series_name: String,
    provider: Arc<dyn DataProvider>,
    ticker: Option<Ticker>,
    table: Option<Table>,
    series: Option<TimeSeries>,
}

impl Column {
    pub fn new(time_series_name: impl Into<String>, provider: Arc<dyn DataProvider>) -> Self {
        Self {
            time_series_name: time_series_name.into(),
            provider,
            ticker: None,
            table: None,
            series: None,
        }
    }

    /// Name of the selected field, also the name of the materialized series.
    pub fn label(&self) -> &str {
        &self.time_series_name
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider.id()
    }

    pub fn ticker(&self) -> Option<&Ticker> {
        self.ticker.as_ref()
    }

    /// The normalized table last loaded or fetched.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.series.is_some()
    }

    /// Bind `ticker` and materialize the series, reading the cache first.
    ///
    /// A cache miss is recovered by fetching and persisting the history.
    ///
    /// # Errors
    /// Provider failures surface as [`FrameError::Fetch`]; other cache
    /// failures are returned unchanged.
    pub fn setup(&mut self, ticker: &Ticker, cache: &dyn CacheStore) -> Result<(), FrameError> {
        match self.load(ticker, cache) {
            Ok(()) => {}
            Err(FrameError::NotFound { key }) => {
                info!(
                    %ticker,
                    %key,
                    field = %self.time_series_name,
                    "cache miss, fetching history"
                );
                self.table = Some(self.fetch(ticker)?);
                self.save(cache)?;
            }
            Err(other) => return Err(other),
        }
        self.materialize()
    }

    /// Re-fetch the full history and overwrite the cache entry.
    pub fn refresh(&mut self, ticker: &Ticker, cache: &dyn CacheStore) -> Result<(), FrameError> {
        self.ticker = Some(ticker.clone());
        info!(%ticker, field = %self.time_series_name, "refreshing history");
        self.table = Some(self.fetch(ticker)?);
        self.save(cache)?;
        self.materialize()
    }

    /// The materialized series.
    ///
    /// # Errors
    /// Returns [`FrameError::NotReady`] before [`Column::setup`].
    pub fn get_series(&self) -> Result<&TimeSeries, FrameError> {
        self.series.as_ref().ok_or_else(|| {
            FrameError::not_ready(format!(
                "column '{}' has not been set up",
                self.time_series_name
            ))
        })
    }

    /// Read the cached table for `ticker`.
    ///
    /// # Errors
    /// Returns [`FrameError::NotFound`] when nothing is cached.
    pub fn load(&mut self, ticker: &Ticker, cache: &dyn CacheStore) -> Result<(), FrameError> {
        self.ticker = Some(ticker.clone());
        let table = cache.load(ticker)?;
        debug!(%ticker, rows = table.len(), "loaded cached history");
        self.table = Some(table);
        Ok(())
    }

    /// Persist the current table under the bound ticker.
    pub fn save(&self, cache: &dyn CacheStore) -> Result<(), FrameError> {
        match (&self.ticker, &self.table) {
            (Some(ticker), Some(table)) => cache.save(ticker, table),
            _ => Err(FrameError::not_ready(format!(
                "column '{}' has no data to save",
                self.time_series_name
            ))),
        }
    }

    /// Fetch and normalize the full history of `ticker`. Never retried.
    ///
    /// # Errors
    /// An empty history is a [`FrameError::Fetch`] with a malformed-payload
    /// source error; nothing is cached for it.
    pub fn fetch(&self, ticker: &Ticker) -> Result<Table, FrameError> {
        let raw = self.provider.fetch(ticker)?;
        info!(%ticker, provider = %self.provider_id(), rows = raw.len(), "fetched history");
        if raw.is_empty() {
            return Err(SourceError::malformed_payload(format!(
                "{} returned no rows for {ticker}",
                self.provider_id()
            ))
            .into());
        }
        normalize(&raw, ticker)
    }

    fn materialize(&mut self) -> Result<(), FrameError> {
        let (Some(ticker), Some(table)) = (&self.ticker, &self.table) else {
            return Err(FrameError::not_ready(format!(
                "column '{}' has no data",
                self.time_series_name
            )));
        };
        let key = ColumnKey::new(ticker.as_str(), self.time_series_name.as_str());
        let series = table.column(&key).ok_or_else(|| {
            FrameError::configuration(format!(
                "field '{}' is not available for {ticker}",
                self.time_series_name
            ))
        })?;
        self.series = Some(series);
        Ok(())
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("time_series_name", &self.time_series_name)
            .field("provider", &self.provider.id())
            .field("ticker", &self.ticker)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Rename fields to the canonical vocabulary, localize timestamps to UTC and
/// sort rows ascending. A repeated timestamp keeps the last row seen.
pub fn normalize(raw: &RawTable, ticker: &Ticker) -> Result<Table, FrameError> {
    let mut rows: BTreeMap<UtcDateTime, BTreeMap<&str, f64>> = BTreeMap::new();
    let mut fields = BTreeSet::new();

    for row in &raw.rows {
        let timestamp = UtcDateTime::localize(row.timestamp);
        let mut values = BTreeMap::new();
        for (name, value) in &row.fields {
            if !value.is_finite() {
                warn!(%ticker, %timestamp, field = %name, "skipping non-finite value");
                continue;
            }
            let field = canonical_field(name);
            fields.insert(field);
            values.insert(field, *value);
        }
        if rows.insert(timestamp, values).is_some() {
            warn!(%ticker, %timestamp, "duplicate timestamp, keeping last row");
        }
    }

    let index: Vec<UtcDateTime> = rows.keys().copied().collect();
    let columns = fields
        .into_iter()
        .map(|field| {
            let values = rows
                .values()
                .map(|row| row.get(field).copied().unwrap_or(f64::NAN))
                .collect();
            TableColumn::new(ColumnKey::new(ticker.as_str(), field), values)
        })
        .collect();

    Ok(Table::new(index, columns)?)
}
