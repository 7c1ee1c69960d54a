//! Single-input transforms over a series.
//!
//! Returns are reported in percent points divided by one hundred and
//! volatility is annualized over [`TRADING_DAYS`]. Bollinger bands offset
//! the rolling mean by the standard deviation of the rolling mean itself.

use crate::{FrameError, SeriesRef, TimeSeries};

/// Trading days per year used to annualize volatility.
pub const TRADING_DAYS: f64 = 252.0;
pub const DEFAULT_BOLLINGER_WINDOW: usize = 20;
pub const DEFAULT_BOLLINGER_WIDTH: f64 = 2.0;

/// The computation a [`Feature`] applies to its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    SimpleReturns,
    LogReturns,
    RealisedVolatility,
    SimpleMovingAverage,
    UpperBollingerBand,
    LowerBollingerBand,
}

impl Transform {
    pub const fn requires_window(self) -> bool {
        !matches!(self, Self::SimpleReturns | Self::LogReturns)
    }

    const fn default_label(self) -> &'static str {
        match self {
            Self::SimpleReturns => "simple_returns",
            Self::LogReturns => "log_returns",
            Self::RealisedVolatility => "realised_vol",
            Self::SimpleMovingAverage => "sma",
            Self::UpperBollingerBand => "upper_boll_band",
            Self::LowerBollingerBand => "lower_boll_band",
        }
    }
}

/// A derived series computed from one input series.
#[derive(Debug, Clone)]
pub struct Feature {
    transform: Transform,
    input: SeriesRef,
    window: Option<usize>,
    width: f64,
    label: Option<String>,
    series: Option<TimeSeries>,
}

impl Feature {
    pub fn new(transform: Transform, input: SeriesRef) -> Self {
        Self {
            transform,
            input,
            window: None,
            width: DEFAULT_BOLLINGER_WIDTH,
            label: None,
            series: None,
        }
    }

    pub fn simple_returns(input: SeriesRef) -> Self {
        Self::new(Transform::SimpleReturns, input)
    }

    pub fn log_returns(input: SeriesRef) -> Self {
        Self::new(Transform::LogReturns, input)
    }

    /// Requires [`Feature::with_window`].
    pub fn realised_volatility(input: SeriesRef) -> Self {
        Self::new(Transform::RealisedVolatility, input)
    }

    /// Requires [`Feature::with_window`].
    pub fn simple_moving_average(input: SeriesRef) -> Self {
        Self::new(Transform::SimpleMovingAverage, input)
    }

    pub fn upper_bollinger_band(input: SeriesRef) -> Self {
        Self::new(Transform::UpperBollingerBand, input).with_window(DEFAULT_BOLLINGER_WINDOW)
    }

    pub fn lower_bollinger_band(input: SeriesRef) -> Self {
        Self::new(Transform::LowerBollingerBand, input).with_window(DEFAULT_BOLLINGER_WINDOW)
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    /// Band width in standard deviations.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub const fn transform(&self) -> Transform {
        self.transform
    }

    pub fn input(&self) -> &SeriesRef {
        &self.input
    }

    pub const fn window(&self) -> Option<usize> {
        self.window
    }

    /// The explicit label, or the transform's default (`sma{window}` for
    /// moving averages).
    pub fn label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match (self.transform, self.window) {
            (Transform::SimpleMovingAverage, Some(window)) => format!("sma{window}"),
            (transform, _) => String::from(transform.default_label()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.series.is_some()
    }

    /// Check that a windowed transform has a positive window.
    ///
    /// # Errors
    /// Returns [`FrameError::Configuration`] otherwise.
    pub fn validate(&self) -> Result<(), FrameError> {
        self.required_window().map(|_| ())
    }

    /// Compute the feature from `input`, replacing any previous result.
    pub fn setup(&mut self, input: &TimeSeries) -> Result<(), FrameError> {
        let series = self.compute(input)?.with_name(self.label());
        self.series = Some(series);
        Ok(())
    }

    /// # Errors
    /// Returns [`FrameError::NotReady`] before [`Feature::setup`].
    pub fn get_series(&self) -> Result<&TimeSeries, FrameError> {
        self.series.as_ref().ok_or_else(|| {
            FrameError::not_ready(format!("feature '{}' has not been set up", self.label()))
        })
    }

    pub(crate) fn reset(&mut self) {
        self.series = None;
    }

    fn required_window(&self) -> Result<usize, FrameError> {
        if !self.transform.requires_window() {
            return Ok(0);
        }
        match self.window {
            Some(window) if window > 0 => Ok(window),
            Some(_) => Err(FrameError::configuration(format!(
                "feature '{}' window must be positive",
                self.label()
            ))),
            None => Err(FrameError::configuration(format!(
                "feature '{}' requires a window",
                self.label()
            ))),
        }
    }

    fn compute(&self, input: &TimeSeries) -> Result<TimeSeries, FrameError> {
        let window = self.required_window()?;
        let series = match self.transform {
            Transform::SimpleReturns => input.pct_change().fill_nan(0.0).map(|v| v / 100.0),
            Transform::LogReturns => input
                .pct_change()
                .fill_nan(0.0)
                .map(|v| (1.0 + v).ln() / 100.0),
            Transform::RealisedVolatility => input
                .map(|v| v * 100.0)
                .rolling_std(window)
                .map(|v| v * TRADING_DAYS.sqrt()),
            Transform::SimpleMovingAverage => input.rolling_mean(window),
            Transform::UpperBollingerBand => {
                let mean = input.rolling_mean(window);
                let offset = mean.std() * self.width;
                mean.map(|v| v + offset)
            }
            Transform::LowerBollingerBand => {
                let mean = input.rolling_mean(window);
                let offset = mean.std() * self.width;
                mean.map(|v| v - offset)
            }
        };
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameErrorKind, UtcDateTime};

    fn series(values: &[f64]) -> TimeSeries {
        let index = (0..values.len() as i64)
            .map(|day| {
                UtcDateTime::from_unix_timestamp(1_704_153_600 + 86_400 * day).expect("in range")
            })
            .collect();
        TimeSeries::new("adjusted_close", index, values.to_vec()).expect("valid")
    }

    fn close() -> SeriesRef {
        SeriesRef::column("spy", "adjusted_close")
    }

    #[test]
    fn moving_average_label_carries_window() {
        assert_eq!(Feature::simple_moving_average(close()).with_window(20).label(), "sma20");
        assert_eq!(
            Feature::simple_returns(close()).with_label("spy_returns").label(),
            "spy_returns"
        );
    }

    #[test]
    fn moving_average_leaves_warmup_undefined() {
        let mut sma = Feature::simple_moving_average(close()).with_window(3);
        sma.setup(&series(&[1.0, 2.0, 3.0, 4.0, 5.0])).expect("setup");
        let values = sma.get_series().expect("ready").values().to_vec();

        assert!(values[0].is_nan() && values[1].is_nan());
        assert_eq!(&values[2..], &[2.0, 3.0, 4.0]);
        assert_eq!(sma.get_series().expect("ready").name(), "sma3");
    }

    #[test]
    fn simple_returns_are_scaled_with_zero_first_entry() {
        let mut returns = Feature::simple_returns(close());
        returns.setup(&series(&[100.0, 110.0])).expect("setup");
        let values = returns.get_series().expect("ready").values();

        assert_eq!(values[0], 0.0);
        assert!((values[1] - 0.001).abs() < 1e-12);
    }

    #[test]
    fn log_returns_match_log_of_growth() {
        let mut returns = Feature::log_returns(close());
        returns.setup(&series(&[100.0, 110.0])).expect("setup");
        let values = returns.get_series().expect("ready").values();

        assert_eq!(values[0], 0.0);
        assert!((values[1] - 1.1_f64.ln() / 100.0).abs() < 1e-12);
    }

    #[test]
    fn windowed_transforms_require_a_window() {
        let mut vol = Feature::realised_volatility(close());
        let err = vol.setup(&series(&[1.0, 2.0])).expect_err("window missing");
        assert_eq!(err.kind(), FrameErrorKind::Configuration);

        let zero = Feature::simple_moving_average(close()).with_window(0);
        assert_eq!(zero.validate().expect_err("zero window").kind(), FrameErrorKind::Configuration);
        assert!(Feature::simple_returns(close()).validate().is_ok());
    }

    #[test]
    fn bollinger_bands_default_to_twenty_days_two_widths() {
        let upper = Feature::upper_bollinger_band(close());
        assert_eq!(upper.window(), Some(DEFAULT_BOLLINGER_WINDOW));
        assert_eq!(upper.label(), "upper_boll_band");
        assert_eq!(Feature::lower_bollinger_band(close()).label(), "lower_boll_band");
    }

    #[test]
    fn series_before_setup_is_not_ready() {
        let err = Feature::log_returns(close()).get_series().expect_err("not set up");
        assert_eq!(err.kind(), FrameErrorKind::NotReady);
    }
}
