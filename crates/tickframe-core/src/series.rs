//! Ordered, UTC-indexed numeric series.
//!
//! Undefined values are represented as `f64::NAN` throughout, the way a
//! missing observation propagates through rolling windows and joins.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{UtcDateTime, ValidationError};

/// Timestamp-indexed sequence of values with a name.
///
/// The index is strictly increasing and aligned 1:1 with `values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    name: String,
    index: Vec<UtcDateTime>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series from a pre-sorted index.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when lengths differ or the index is not
    /// strictly increasing.
    pub fn new(
        name: impl Into<String>,
        index: Vec<UtcDateTime>,
        values: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if index.len() != values.len() {
            return Err(ValidationError::SeriesLengthMismatch {
                name,
                index: index.len(),
                values: values.len(),
            });
        }
        if let Some(position) = first_unsorted(&index) {
            return Err(ValidationError::SeriesNotSorted { name, position });
        }
        Ok(Self {
            name,
            index,
            values,
        })
    }

    /// Build a series from unordered points; a repeated timestamp keeps the
    /// last value.
    pub fn from_points(
        name: impl Into<String>,
        points: impl IntoIterator<Item = (UtcDateTime, f64)>,
    ) -> Self {
        let sorted: BTreeMap<UtcDateTime, f64> = points.into_iter().collect();
        let (index, values) = sorted.into_iter().unzip();
        Self {
            name: name.into(),
            index,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.rename(name);
        self
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[UtcDateTime] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value_at(&self, ts: UtcDateTime) -> Option<f64> {
        self.index
            .binary_search(&ts)
            .ok()
            .map(|position| self.values[position])
    }

    pub fn first_timestamp(&self) -> Option<UtcDateTime> {
        self.index.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<UtcDateTime> {
        self.index.last().copied()
    }

    /// Apply `f` to every value, keeping the index and name.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.with_values(self.values.iter().copied().map(f).collect())
    }

    /// Replace undefined values with `value`.
    pub fn fill_nan(&self, value: f64) -> Self {
        self.map(|v| if v.is_nan() { value } else { v })
    }

    /// Relative change from the previous value; the first entry is undefined.
    ///
    /// Undefined values are padded forward with the last defined value before
    /// the change is taken, so a gap yields a zero change and the step after
    /// it is measured against the value before the gap.
    pub fn pct_change(&self) -> Self {
        let mut out = Vec::with_capacity(self.values.len());
        let mut previous: Option<f64> = None;
        for value in &self.values {
            let current = if value.is_nan() {
                previous.unwrap_or(f64::NAN)
            } else {
                *value
            };
            out.push(match previous {
                Some(last) => current / last - 1.0,
                None => f64::NAN,
            });
            if !current.is_nan() {
                previous = Some(current);
            }
        }
        self.with_values(out)
    }

    /// Mean over a trailing window of `window` values.
    ///
    /// The first `window - 1` entries, and any window holding an undefined
    /// value, are undefined.
    pub fn rolling_mean(&self, window: usize) -> Self {
        self.rolling(window, |slice| slice.iter().sum::<f64>() / slice.len() as f64)
    }

    /// Sample standard deviation (n - 1) over a trailing window.
    pub fn rolling_std(&self, window: usize) -> Self {
        self.rolling(window, sample_std)
    }

    /// Sample standard deviation of the defined values; undefined with fewer
    /// than two of them.
    pub fn std(&self) -> f64 {
        let defined: Vec<f64> = self.values.iter().copied().filter(|v| !v.is_nan()).collect();
        sample_std(&defined)
    }

    /// Element-wise `self / denominator` over the union of both indexes.
    ///
    /// Timestamps missing from either side and zero denominators yield
    /// undefined values.
    pub fn divide(&self, denominator: &TimeSeries) -> Self {
        let index = union_index([self.index(), denominator.index()]);
        let numerators = align(&self.index, &self.values, &index);
        let denominators = align(&denominator.index, &denominator.values, &index);
        let values = numerators
            .into_iter()
            .zip(denominators)
            .map(|(n, d)| if d == 0.0 { f64::NAN } else { n / d })
            .collect();
        Self {
            name: self.name.clone(),
            index,
            values,
        }
    }

    /// Move every value `periods` rows later; the leading rows become
    /// undefined.
    pub fn shift(&self, periods: usize) -> Self {
        self.with_values(shift_values(&self.values, periods))
    }

    /// Keep only rows at or before `as_of`.
    pub fn until(&self, as_of: UtcDateTime) -> Self {
        let end = self.index.partition_point(|ts| *ts <= as_of);
        Self {
            name: self.name.clone(),
            index: self.index[..end].to_vec(),
            values: self.values[..end].to_vec(),
        }
    }

    fn with_values(&self, values: Vec<f64>) -> Self {
        Self {
            name: self.name.clone(),
            index: self.index.clone(),
            values,
        }
    }

    fn rolling(&self, window: usize, reduce: impl Fn(&[f64]) -> f64) -> Self {
        let mut out = vec![f64::NAN; self.values.len()];
        if window == 0 || self.values.len() < window {
            return self.with_values(out);
        }
        for end in window..=self.values.len() {
            let slice = &self.values[end - window..end];
            if slice.iter().any(|v| v.is_nan()) {
                continue;
            }
            out[end - 1] = reduce(slice);
        }
        self.with_values(out)
    }
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

fn first_unsorted(index: &[UtcDateTime]) -> Option<usize> {
    index
        .windows(2)
        .position(|pair| pair[0] >= pair[1])
        .map(|position| position + 1)
}

pub(crate) fn shift_values(values: &[f64], periods: usize) -> Vec<f64> {
    let len = values.len();
    let lead = periods.min(len);
    let mut out = vec![f64::NAN; lead];
    out.extend_from_slice(&values[..len - lead]);
    out
}

/// Sorted union of several sorted indexes.
pub(crate) fn union_index<'a>(
    indexes: impl IntoIterator<Item = &'a [UtcDateTime]>,
) -> Vec<UtcDateTime> {
    let mut merged: Vec<UtcDateTime> = indexes.into_iter().flatten().copied().collect();
    merged.sort_unstable();
    merged.dedup();
    merged
}

/// Re-index `values` (aligned with `source`) onto `target`; timestamps absent
/// from `source` become undefined. Both indexes must be sorted.
pub(crate) fn align(source: &[UtcDateTime], values: &[f64], target: &[UtcDateTime]) -> Vec<f64> {
    let mut out = Vec::with_capacity(target.len());
    let mut cursor = 0;
    for ts in target {
        while cursor < source.len() && source[cursor] < *ts {
            cursor += 1;
        }
        if cursor < source.len() && source[cursor] == *ts {
            out.push(values[cursor]);
        } else {
            out.push(f64::NAN);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(count: usize) -> Vec<UtcDateTime> {
        (0..count)
            .map(|day| {
                UtcDateTime::from_unix_timestamp(1_704_153_600 + 86_400 * day as i64)
                    .expect("in range")
            })
            .collect()
    }

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::new("close", days(values.len()), values.to_vec()).expect("valid series")
    }

    fn assert_values(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (position, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "position {position}: expected NaN, got {a}");
            } else {
                assert!((a - e).abs() < 1e-12, "position {position}: {a} != {e}");
            }
        }
    }

    #[test]
    fn rejects_unsorted_index() {
        let mut index = days(3);
        index.swap(1, 2);
        let err = TimeSeries::new("close", index, vec![1.0, 2.0, 3.0]).expect_err("must fail");
        assert!(matches!(err, ValidationError::SeriesNotSorted { position: 2, .. }));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let mut index = days(2);
        index[1] = index[0];
        let err = TimeSeries::new("close", index, vec![1.0, 2.0]).expect_err("must fail");
        assert!(matches!(err, ValidationError::SeriesNotSorted { .. }));
    }

    #[test]
    fn from_points_sorts_and_keeps_last_duplicate() {
        let index = days(2);
        let series = TimeSeries::from_points(
            "close",
            vec![(index[1], 5.0), (index[0], 1.0), (index[1], 7.0)],
        );
        assert_eq!(series.index(), index.as_slice());
        assert_values(series.values(), &[1.0, 7.0]);
    }

    #[test]
    fn rolling_mean_leaves_warmup_undefined() {
        let sma = series(&[1.0, 2.0, 3.0, 4.0, 5.0]).rolling_mean(3);
        assert_values(sma.values(), &[f64::NAN, f64::NAN, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rolling_window_with_gap_is_undefined() {
        let sma = series(&[1.0, f64::NAN, 3.0, 4.0, 5.0]).rolling_mean(2);
        assert_values(sma.values(), &[f64::NAN, f64::NAN, f64::NAN, 3.5, 4.5]);
    }

    #[test]
    fn rolling_std_uses_sample_deviation() {
        let std = series(&[2.0, 4.0, 6.0]).rolling_std(3);
        assert_values(std.values(), &[f64::NAN, f64::NAN, 2.0]);
    }

    #[test]
    fn pct_change_starts_undefined() {
        let change = series(&[100.0, 110.0, 99.0]).pct_change();
        assert_values(change.values(), &[f64::NAN, 0.1, -0.1]);
    }

    #[test]
    fn pct_change_pads_over_gaps() {
        let change = series(&[f64::NAN, 100.0, f64::NAN, 110.0, 121.0]).pct_change();
        assert_values(change.values(), &[f64::NAN, f64::NAN, 0.0, 0.1, 0.1]);
    }

    #[test]
    fn divide_aligns_on_union_index() {
        let index = days(3);
        let numerator = TimeSeries::new("a", index.clone(), vec![2.0, 4.0, 6.0]).expect("valid");
        let denominator =
            TimeSeries::new("b", vec![index[0], index[2]], vec![1.0, 0.0]).expect("valid");

        let ratio = numerator.divide(&denominator);
        assert_eq!(ratio.index(), index.as_slice());
        assert_values(ratio.values(), &[2.0, f64::NAN, f64::NAN]);
    }

    #[test]
    fn shift_and_until_trim_lookahead() {
        let index = days(4);
        let shifted = series(&[1.0, 2.0, 3.0, 4.0]).shift(1).until(index[2]);
        assert_values(shifted.values(), &[f64::NAN, 1.0, 2.0]);
    }

    #[test]
    fn shift_past_length_is_all_undefined() {
        let shifted = series(&[1.0, 2.0]).shift(5);
        assert_values(shifted.values(), &[f64::NAN, f64::NAN]);
    }
}
