use crate::table::DERIVED_NAMESPACE;
use crate::{FrameError, SeriesRef, Table, TimeSeries};

/// Quotient of two series, aligned on the union of their timestamps.
#[derive(Debug, Clone)]
pub struct Ratio {
    label: String,
    numerator: SeriesRef,
    denominator: SeriesRef,
    series: Option<TimeSeries>,
}

impl Ratio {
    pub fn builder(label: impl Into<String>) -> RatioBuilder {
        RatioBuilder {
            label: label.into(),
            numerator: None,
            denominator: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn numerator(&self) -> &SeriesRef {
        &self.numerator
    }

    pub fn denominator(&self) -> &SeriesRef {
        &self.denominator
    }

    pub fn is_ready(&self) -> bool {
        self.series.is_some()
    }

    /// Divide `numerator` by `denominator`. Timestamps missing on either side
    /// and zero denominators give undefined values.
    pub fn setup(&mut self, numerator: &TimeSeries, denominator: &TimeSeries) {
        self.series = Some(numerator.divide(denominator).with_name(self.label.as_str()));
    }

    /// # Errors
    /// Returns [`FrameError::NotReady`] before [`Ratio::setup`].
    pub fn get_series(&self) -> Result<&TimeSeries, FrameError> {
        self.series.as_ref().ok_or_else(|| {
            FrameError::not_ready(format!("ratio '{}' has not been set up", self.label))
        })
    }

    pub(crate) fn reset(&mut self) {
        self.series = None;
    }

    /// One-column table under the derived namespace.
    pub fn to_table(&self) -> Result<Table, FrameError> {
        Ok(Table::from_series(DERIVED_NAMESPACE, [self.get_series()?])?)
    }
}

/// Builder for [`Ratio`].
#[derive(Debug, Clone)]
pub struct RatioBuilder {
    label: String,
    numerator: Option<SeriesRef>,
    denominator: Option<SeriesRef>,
}

impl RatioBuilder {
    pub fn numerator(mut self, reference: SeriesRef) -> Self {
        self.numerator = Some(reference);
        self
    }

    pub fn denominator(mut self, reference: SeriesRef) -> Self {
        self.denominator = Some(reference);
        self
    }

    /// # Errors
    /// Returns [`FrameError::Configuration`] when the label is blank or either
    /// operand is missing.
    pub fn build(self) -> Result<Ratio, FrameError> {
        if self.label.trim().is_empty() {
            return Err(FrameError::configuration("ratio label cannot be empty"));
        }
        let numerator = self.numerator.ok_or_else(|| {
            FrameError::configuration(format!("ratio '{}' has no numerator", self.label))
        })?;
        let denominator = self.denominator.ok_or_else(|| {
            FrameError::configuration(format!("ratio '{}' has no denominator", self.label))
        })?;
        Ok(Ratio {
            label: self.label,
            numerator,
            denominator,
            series: None,
        })
    }
}
