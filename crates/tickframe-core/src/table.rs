//! Time-aligned tables of named series.
//!
//! A [`Table`] is the materialized form of a dataset: one shared, sorted UTC
//! index and an ordered list of columns. Columns carry a two-level
//! [`ColumnKey`] so that per-symbol fields (`SPY` / `adjusted_close`) and
//! derived series (`derived` / `sma20`) can live side by side.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::series::{align, shift_values, union_index};
use crate::{TimeSeries, UtcDateTime, ValidationError};

/// Namespace under which features and ratios are assembled.
pub const DERIVED_NAMESPACE: &str = "derived";

/// Two-level column label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ColumnKey {
    pub namespace: String,
    pub field: String,
}

impl ColumnKey {
    pub fn new(namespace: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            field: field.into(),
        }
    }
}

impl Display for ColumnKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.field)
    }
}

/// One column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub key: ColumnKey,
    pub values: Vec<f64>,
}

impl TableColumn {
    pub fn new(key: ColumnKey, values: Vec<f64>) -> Self {
        Self { key, values }
    }
}

/// Columns sharing one strictly increasing UTC index.
///
/// `PartialEq` compares cells as `f64`, so a table holding an undefined (NaN)
/// cell never equals itself. Use [`Table::equivalent`] to compare histories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    index: Vec<UtcDateTime>,
    columns: Vec<TableColumn>,
}

impl Table {
    /// Build a table from a pre-sorted index and aligned columns.
    ///
    /// # Errors
    /// Returns [`ValidationError`] on an unsorted index, a column of the wrong
    /// length, or a repeated column key.
    pub fn new(
        index: Vec<UtcDateTime>,
        columns: Vec<TableColumn>,
    ) -> Result<Self, ValidationError> {
        if let Some(position) = index.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(ValidationError::SeriesNotSorted {
                name: String::from("<table index>"),
                position: position + 1,
            });
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.values.len() != index.len() {
                return Err(ValidationError::TableLengthMismatch {
                    column: column.key.to_string(),
                    index: index.len(),
                    values: column.values.len(),
                });
            }
            if !seen.insert(&column.key) {
                return Err(ValidationError::DuplicateColumn {
                    column: column.key.to_string(),
                });
            }
        }

        Ok(Self { index, columns })
    }

    /// Outer-join `series` into one table, each keyed by
    /// `(namespace, series name)`.
    pub fn from_series<'a>(
        namespace: &str,
        series: impl IntoIterator<Item = &'a TimeSeries>,
    ) -> Result<Self, ValidationError> {
        let series: Vec<&TimeSeries> = series.into_iter().collect();
        let index = union_index(series.iter().map(|s| s.index()));
        let columns = series
            .iter()
            .map(|s| {
                TableColumn::new(
                    ColumnKey::new(namespace, s.name()),
                    align(s.index(), s.values(), &index),
                )
            })
            .collect();
        Self::new(index, columns)
    }

    /// Horizontal outer join of several tables on the union of their indexes.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Result<Self, ValidationError> {
        let tables: Vec<Table> = tables.into_iter().collect();
        let index = union_index(tables.iter().map(|t| t.index.as_slice()));
        let mut columns = Vec::new();
        for table in tables {
            for column in table.columns {
                let values = align(&table.index, &column.values, &index);
                columns.push(TableColumn::new(column.key, values));
            }
        }
        Self::new(index, columns)
    }

    pub fn index(&self) -> &[UtcDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> + '_ {
        self.columns.iter().map(|column| &column.key)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Same index, keys and values, with undefined cells equal to each other.
    pub fn equivalent(&self, other: &Table) -> bool {
        self.index == other.index
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(left, right)| {
                left.key == right.key
                    && left.values.len() == right.values.len()
                    && left
                        .values
                        .iter()
                        .zip(&right.values)
                        .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
            })
    }

    pub fn start(&self) -> Option<UtcDateTime> {
        self.index.first().copied()
    }

    pub fn end(&self) -> Option<UtcDateTime> {
        self.index.last().copied()
    }

    /// The column under `key` as a series named by its field.
    pub fn column(&self, key: &ColumnKey) -> Option<TimeSeries> {
        let column = self.columns.iter().find(|column| &column.key == key)?;
        TimeSeries::new(key.field.clone(), self.index.clone(), column.values.clone()).ok()
    }

    pub fn value(&self, ts: UtcDateTime, key: &ColumnKey) -> Option<f64> {
        let row = self.index.binary_search(&ts).ok()?;
        let column = self.columns.iter().find(|column| &column.key == key)?;
        Some(column.values[row])
    }

    /// Every column's value at `ts`, in column order.
    pub fn row(&self, ts: UtcDateTime) -> Option<Vec<f64>> {
        let row = self.index.binary_search(&ts).ok()?;
        Some(self.columns.iter().map(|column| column.values[row]).collect())
    }

    /// Move every column `periods` rows later; leading rows become undefined.
    pub fn shift(&self, periods: usize) -> Self {
        Self {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| {
                    TableColumn::new(column.key.clone(), shift_values(&column.values, periods))
                })
                .collect(),
        }
    }

    /// Keep only rows at or before `as_of`.
    pub fn until(&self, as_of: UtcDateTime) -> Self {
        let end = self.index.partition_point(|ts| *ts <= as_of);
        Self {
            index: self.index[..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|column| TableColumn::new(column.key.clone(), column.values[..end].to_vec()))
                .collect(),
        }
    }
}
