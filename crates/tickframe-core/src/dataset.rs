//! Dataset assembly.
//!
//! A [`Dataset`] owns explicitly registered symbols, ratios and features and
//! materializes them into one [`Table`]. Symbols are set up first; derived
//! members are then resolved in passes, so a feature may take a ratio (or
//! another feature) as input regardless of registration order.

use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CacheStore, WarehouseCache};
use crate::table::DERIVED_NAMESPACE;
use crate::{
    Feature, FrameConfig, FrameError, Ratio, SeriesRef, Symbol, Table, TimeSeries, UtcDateTime,
};

/// Symbols plus the ratios and features derived from them.
pub struct Dataset {
    cache: Arc<dyn CacheStore>,
    symbols: Vec<(String, Symbol)>,
    ratios: Vec<(String, Ratio)>,
    features: Vec<(String, Feature)>,
}

impl Dataset {
    /// Open the on-disk cache described by `config`, creating its directory.
    pub fn new(config: &FrameConfig) -> Result<Self, FrameError> {
        Ok(Self::with_cache(Arc::new(WarehouseCache::open(config)?)))
    }

    pub fn with_cache(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            symbols: Vec::new(),
            ratios: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Register a symbol under `name`.
    ///
    /// # Errors
    /// Returns [`FrameError::Configuration`] when `name` is already used by
    /// any member, or when another symbol already covers the same ticker.
    /// Symbol tables are namespaced by ticker, so one ticker per dataset.
    pub fn symbol(mut self, name: impl Into<String>, symbol: Symbol) -> Result<Self, FrameError> {
        let name = self.claim(name.into())?;
        if let Some((other, _)) = self
            .symbols
            .iter()
            .find(|(_, registered)| registered.ticker() == symbol.ticker())
        {
            return Err(FrameError::configuration(format!(
                "ticker {} is already registered as '{other}'",
                symbol.ticker()
            )));
        }
        self.symbols.push((name, symbol));
        Ok(self)
    }

    /// Register a feature under `name`; its window is checked here.
    pub fn feature(
        mut self,
        name: impl Into<String>,
        feature: Feature,
    ) -> Result<Self, FrameError> {
        let name = self.claim(name.into())?;
        feature.validate()?;
        self.features.push((name, feature));
        Ok(self)
    }

    /// Register a ratio under `name`.
    pub fn ratio(mut self, name: impl Into<String>, ratio: Ratio) -> Result<Self, FrameError> {
        let name = self.claim(name.into())?;
        self.ratios.push((name, ratio));
        Ok(self)
    }

    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        find(&self.symbols, name)
    }

    pub fn get_feature(&self, name: &str) -> Option<&Feature> {
        find(&self.features, name)
    }

    pub fn get_ratio(&self, name: &str) -> Option<&Ratio> {
        find(&self.ratios, name)
    }

    /// Set up every symbol from cache or provider, then compute derived
    /// members.
    pub fn setup(&mut self) -> Result<(), FrameError> {
        for (name, symbol) in &mut self.symbols {
            debug!(symbol = %name, ticker = %symbol.ticker(), "setting up symbol");
            symbol.setup(self.cache.as_ref())?;
        }
        self.derive()?;
        info!(
            symbols = self.symbols.len(),
            ratios = self.ratios.len(),
            features = self.features.len(),
            "dataset ready"
        );
        Ok(())
    }

    /// Re-fetch every symbol and recompute derived members.
    pub fn refresh(&mut self) -> Result<(), FrameError> {
        for (name, symbol) in &mut self.symbols {
            debug!(symbol = %name, ticker = %symbol.ticker(), "refreshing symbol");
            symbol.refresh(self.cache.as_ref())?;
        }
        self.derive()
    }

    /// Resolve any reference to its materialized series.
    ///
    /// # Errors
    /// [`FrameError::Configuration`] for unknown names and
    /// [`FrameError::NotReady`] before [`Dataset::setup`].
    pub fn series(&self, reference: &SeriesRef) -> Result<&TimeSeries, FrameError> {
        match reference {
            SeriesRef::Column { symbol, column } => self
                .get_symbol(symbol)
                .ok_or_else(|| unknown(reference))?
                .series(column),
            SeriesRef::Feature(name) => self
                .get_feature(name)
                .ok_or_else(|| unknown(reference))?
                .get_series(),
            SeriesRef::Ratio(name) => self
                .get_ratio(name)
                .ok_or_else(|| unknown(reference))?
                .get_series(),
        }
    }

    /// Assemble every symbol table plus one derived table (ratios, then
    /// features) on the union of their timestamps.
    ///
    /// With `as_of`, every column is shifted one row later and rows after
    /// `as_of` are dropped, so each row only holds data known at its open.
    pub fn to_table(&self, as_of: Option<UtcDateTime>) -> Result<Table, FrameError> {
        let mut tables = self
            .symbols
            .iter()
            .map(|(_, symbol)| symbol.to_table())
            .collect::<Result<Vec<_>, _>>()?;

        let mut derived = Vec::with_capacity(self.ratios.len() + self.features.len());
        for (name, ratio) in &self.ratios {
            derived.push(ratio.get_series()?.clone().with_name(name.as_str()));
        }
        for (name, feature) in &self.features {
            derived.push(feature.get_series()?.clone().with_name(name.as_str()));
        }
        if !derived.is_empty() {
            tables.push(Table::from_series(DERIVED_NAMESPACE, &derived)?);
        }

        let table = Table::concat(tables)?;
        Ok(match as_of {
            Some(as_of) => table.shift(1).until(as_of),
            None => table,
        })
    }

    pub fn start_date(&self) -> Result<Option<UtcDateTime>, FrameError> {
        Ok(self.to_table(None)?.start())
    }

    pub fn end_date(&self) -> Result<Option<UtcDateTime>, FrameError> {
        Ok(self.to_table(None)?.end())
    }

    fn claim(&self, name: String) -> Result<String, FrameError> {
        if name.trim().is_empty() {
            return Err(FrameError::configuration("member name cannot be empty"));
        }
        let taken = self.get_symbol(&name).is_some()
            || self.get_feature(&name).is_some()
            || self.get_ratio(&name).is_some();
        if taken {
            return Err(FrameError::configuration(format!(
                "'{name}' is already registered"
            )));
        }
        Ok(name)
    }

    fn derive(&mut self) -> Result<(), FrameError> {
        for (_, ratio) in &mut self.ratios {
            ratio.reset();
        }
        for (_, feature) in &mut self.features {
            feature.reset();
        }
        self.check_references()?;

        let total = self.ratios.len() + self.features.len();
        let mut done: HashSet<SeriesRef> = HashSet::with_capacity(total);
        while done.len() < total {
            let mut progressed = false;

            for position in 0..self.ratios.len() {
                let reference = SeriesRef::ratio(self.ratios[position].0.as_str());
                if done.contains(&reference) {
                    continue;
                }
                let ratio = &self.ratios[position].1;
                let inputs = match (
                    self.current(ratio.numerator(), &done)?,
                    self.current(ratio.denominator(), &done)?,
                ) {
                    (Some(numerator), Some(denominator)) => {
                        Some((numerator.clone(), denominator.clone()))
                    }
                    _ => None,
                };
                if let Some((numerator, denominator)) = inputs {
                    self.ratios[position].1.setup(&numerator, &denominator);
                    done.insert(reference);
                    progressed = true;
                }
            }

            for position in 0..self.features.len() {
                let reference = SeriesRef::feature(self.features[position].0.as_str());
                if done.contains(&reference) {
                    continue;
                }
                let input = self
                    .current(self.features[position].1.input(), &done)?
                    .cloned();
                if let Some(input) = input {
                    self.features[position].1.setup(&input)?;
                    done.insert(reference);
                    progressed = true;
                }
            }

            if !progressed {
                let pending: Vec<String> = self
                    .ratios
                    .iter()
                    .map(|(name, _)| SeriesRef::ratio(name.as_str()))
                    .chain(
                        self.features
                            .iter()
                            .map(|(name, _)| SeriesRef::feature(name.as_str())),
                    )
                    .filter(|reference| !done.contains(reference))
                    .map(|reference| reference.to_string())
                    .collect();
                return Err(FrameError::configuration(format!(
                    "derived series form a cycle: {}",
                    pending.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// The series behind `reference` if it is available in the current
    /// derivation round.
    fn current(
        &self,
        reference: &SeriesRef,
        done: &HashSet<SeriesRef>,
    ) -> Result<Option<&TimeSeries>, FrameError> {
        if reference.is_derived() && !done.contains(reference) {
            return Ok(None);
        }
        self.series(reference).map(Some)
    }

    fn check_references(&self) -> Result<(), FrameError> {
        let inputs = self
            .ratios
            .iter()
            .flat_map(|(_, ratio)| [ratio.numerator(), ratio.denominator()])
            .chain(self.features.iter().map(|(_, feature)| feature.input()));
        for reference in inputs {
            let known = match reference {
                SeriesRef::Column { symbol, column } => self
                    .get_symbol(symbol)
                    .is_some_and(|symbol| symbol.get(column).is_some()),
                SeriesRef::Feature(name) => self.get_feature(name).is_some(),
                SeriesRef::Ratio(name) => self.get_ratio(name).is_some(),
            };
            if !known {
                return Err(unknown(reference));
            }
        }
        Ok(())
    }
}

impl Debug for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("symbols", &self.symbols.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("ratios", &self.ratios.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("features", &self.features.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn find<'a, T>(members: &'a [(String, T)], name: &str) -> Option<&'a T> {
    members
        .iter()
        .find(|(registered, _)| registered == name)
        .map(|(_, member)| member)
}

fn unknown(reference: &SeriesRef) -> FrameError {
    FrameError::configuration(format!("unknown series reference '{reference}'"))
}
