//! Indicator trait definitions.

use crate::error::IndicatorError;
use crate::types::Candle;

/// Trait for technical indicators over a price series.
///
/// Indicators are pure: input is an ordered sequence of prices (oldest to
/// newest), output is a finite sequence aligned to the tail of the input.
/// Short input yields an empty output, never an error.
pub trait Indicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values for the given prices.
    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Minimum number of data points required for one output value.
    fn period(&self) -> usize;

    /// Indicator name.
    fn name(&self) -> &str;

    /// Validate that there is enough data for at least one output value.
    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        if data.len() < self.period() {
            return Err(IndicatorError::InsufficientData {
                required: self.period(),
                available: data.len(),
            });
        }
        Ok(())
    }
}

/// Indicator producing several related values per point (e.g. Bollinger
/// Bands, MACD).
pub trait MultiOutputIndicator: Send + Sync {
    /// The output type containing the related values.
    type Outputs;

    /// Calculate indicator values for the given prices.
    fn calculate(&self, data: &[f64]) -> Vec<Self::Outputs>;

    /// Minimum number of data points required for one output value.
    fn period(&self) -> usize;

    /// Indicator name.
    fn name(&self) -> &str;
}

/// Indicator computed from full OHLCV candles rather than a single price
/// column (e.g. the Stochastic oscillator).
pub trait CandleIndicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values for the given candles (oldest to newest).
    fn calculate(&self, candles: &[Candle]) -> Vec<Self::Output>;

    /// Minimum number of candles required for one output value.
    fn period(&self) -> usize;

    /// Indicator name.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WindowSum {
        period: usize,
    }

    impl Indicator for WindowSum {
        type Output = f64;

        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            if data.len() < self.period {
                return vec![];
            }
            data.windows(self.period).map(|w| w.iter().sum()).collect()
        }

        fn period(&self) -> usize {
            self.period
        }

        fn name(&self) -> &str {
            "window_sum"
        }
    }

    #[test]
    fn test_validation() {
        let indicator = WindowSum { period: 5 };

        assert!(indicator.validate_data(&[1.0, 2.0, 3.0]).is_err());
        assert!(indicator
            .validate_data(&[1.0, 2.0, 3.0, 4.0, 5.0])
            .is_ok());
    }

    #[test]
    fn test_tail_alignment() {
        let indicator = WindowSum { period: 3 };
        let result = indicator.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(result.len(), 3);
        assert!((result[2] - 12.0).abs() < 1e-10);
    }
}
