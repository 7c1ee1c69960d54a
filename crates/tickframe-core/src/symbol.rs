use crate::cache::CacheStore;
use crate::{Column, FrameError, Table, Ticker, TimeSeries};

/// A ticker and its registered columns, kept in registration order.
#[derive(Debug)]
pub struct Symbol {
    ticker: Ticker,
    columns: Vec<(String, Column)>,
}

impl Symbol {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            columns: Vec::new(),
        }
    }

    /// Register `column` under `name`.
    ///
    /// # Errors
    /// Returns [`FrameError::Configuration`] when `name` is blank or already
    /// registered.
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Result<Self, FrameError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FrameError::configuration(format!(
                "column name for {} cannot be empty",
                self.ticker
            )));
        }
        if self.get(&name).is_some() {
            return Err(FrameError::configuration(format!(
                "column '{name}' is already registered for {}",
                self.ticker
            )));
        }
        self.columns.push((name, column));
        Ok(self)
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, column)| column)
    }

    /// Series of the column registered as `name`.
    pub fn series(&self, name: &str) -> Result<&TimeSeries, FrameError> {
        self.get(name)
            .ok_or_else(|| {
                FrameError::configuration(format!("{} has no column '{name}'", self.ticker))
            })?
            .get_series()
    }

    /// Set up every column, reading the cache before the provider.
    pub fn setup(&mut self, cache: &dyn CacheStore) -> Result<(), FrameError> {
        for (_, column) in &mut self.columns {
            column.setup(&self.ticker, cache)?;
        }
        Ok(())
    }

    /// Re-fetch every column, ignoring cached data.
    pub fn refresh(&mut self, cache: &dyn CacheStore) -> Result<(), FrameError> {
        for (_, column) in &mut self.columns {
            column.refresh(&self.ticker, cache)?;
        }
        Ok(())
    }

    /// Outer join of the column series, keyed `(ticker, column name)`.
    pub fn to_table(&self) -> Result<Table, FrameError> {
        let series = self
            .columns
            .iter()
            .map(|(name, column)| column.get_series().map(|s| s.clone().with_name(name.as_str())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table::from_series(self.ticker.as_str(), &series)?)
    }
}
