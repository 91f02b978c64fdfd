//! Volatility indicators.

use serde::{Deserialize, Serialize};
use signal_core::traits::{Indicator, MultiOutputIndicator};

/// Rolling population standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    /// Create a new standard deviation indicator.
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self { period }
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;
        data.windows(self.period)
            .map(|window| {
                let mean = window.iter().sum::<f64>() / period_f64;
                let variance =
                    window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period_f64;
                variance.sqrt()
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BollingerOutput {
    /// Upper band (middle + multiplier * sigma)
    pub upper: f64,
    /// Middle band (SMA)
    pub middle: f64,
    /// Lower band (middle - multiplier * sigma)
    pub lower: f64,
    /// (upper - lower) / middle
    pub bandwidth: f64,
    /// %B: (price - lower) / (upper - lower)
    pub percent_b: f64,
}

/// Bollinger Bands.
///
/// Middle band is the rolling SMA; upper and lower bands sit a configurable
/// number of standard deviations away.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    multiplier: f64,
}

impl BollingerBands {
    /// Create Bollinger Bands with the standard (20, 2.0) parameters.
    pub fn new() -> Self {
        Self::with_params(20, 2.0)
    }

    /// Create Bollinger Bands with custom parameters.
    pub fn with_params(period: usize, multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(multiplier > 0.0, "Multiplier must be positive");
        Self { period, multiplier }
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for BollingerBands {
    type Outputs = BollingerOutput;

    fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;
        data.windows(self.period)
            .map(|window| {
                let mean = window.iter().sum::<f64>() / period_f64;
                let variance =
                    window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period_f64;
                let sigma = variance.sqrt();

                let upper = mean + self.multiplier * sigma;
                let lower = mean - self.multiplier * sigma;
                let price = window[window.len() - 1];

                BollingerOutput {
                    upper,
                    middle: mean,
                    lower,
                    bandwidth: if mean != 0.0 { (upper - lower) / mean } else { 0.0 },
                    percent_b: if upper != lower {
                        (price - lower) / (upper - lower)
                    } else {
                        0.5
                    },
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }
}
