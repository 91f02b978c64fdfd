//! Momentum indicators.

use serde::{Deserialize, Serialize};
use signal_core::traits::{CandleIndicator, Indicator, MultiOutputIndicator};
use signal_core::types::Candle;

/// Relative Strength Index (RSI).
///
/// Average gain over average loss with Wilder smoothing,
/// `RSI = 100 - 100 / (1 + RS)`. Bounded to [0, 100] by construction.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Create a new RSI indicator. The common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// Wilder smoothing: seeded with the simple average of the first window,
    /// then `avg = (prev_avg * (period - 1) + value) / period`.
    fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
        if values.len() < period {
            return vec![];
        }

        let period_f64 = period as f64;
        let mut result = Vec::with_capacity(values.len() - period + 1);

        let mut avg = values[..period].iter().sum::<f64>() / period_f64;
        result.push(avg);

        for &value in &values[period..] {
            avg = (avg * (period_f64 - 1.0) + value) / period_f64;
            result.push(avg);
        }

        result
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let mut gains = Vec::with_capacity(data.len() - 1);
        let mut losses = Vec::with_capacity(data.len() - 1);

        for pair in data.windows(2) {
            let change = pair[1] - pair[0];
            gains.push(change.max(0.0));
            losses.push((-change).max(0.0));
        }

        let avg_gains = Self::wilder_smooth(&gains, self.period);
        let avg_losses = Self::wilder_smooth(&losses, self.period);

        avg_gains
            .iter()
            .zip(avg_losses.iter())
            .map(|(&gain, &loss)| {
                if loss == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + gain / loss)
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        // One extra point for the first price change.
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD output values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdOutput {
    /// MACD line (fast EMA - slow EMA)
    pub macd: f64,
    /// Signal line (EMA of the MACD line)
    pub signal: f64,
    /// Histogram (MACD - signal)
    pub histogram: f64,
}

/// MACD (Moving Average Convergence Divergence).
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    /// Create a MACD with the standard (12, 26, 9) parameters.
    pub fn new() -> Self {
        Self::with_periods(12, 26, 9)
    }

    /// Create a MACD with custom periods.
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && slow > 0 && signal > 0);
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
        }
    }

    fn ema(data: &[f64], period: usize) -> Vec<f64> {
        if data.len() < period {
            return vec![];
        }

        let k = 2.0 / (period as f64 + 1.0);
        let mut result = Vec::with_capacity(data.len() - period + 1);

        let mut ema = data[..period].iter().sum::<f64>() / period as f64;
        result.push(ema);

        for &price in &data[period..] {
            ema = price * k + ema * (1.0 - k);
            result.push(ema);
        }

        result
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for Macd {
    type Outputs = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        if data.len() < self.slow_period + self.signal_period {
            return vec![];
        }

        let fast_ema = Self::ema(data, self.fast_period);
        let slow_ema = Self::ema(data, self.slow_period);

        // The fast EMA starts earlier; drop its head to align with the slow.
        let offset = self.slow_period - self.fast_period;
        let macd_line: Vec<f64> = fast_ema[offset..]
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        if macd_line.len() < self.signal_period {
            return vec![];
        }

        let signal_line = Self::ema(&macd_line, self.signal_period);

        macd_line[self.signal_period - 1..]
            .iter()
            .zip(signal_line.iter())
            .map(|(&macd, &signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.slow_period + self.signal_period
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

/// Stochastic oscillator output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StochasticOutput {
    /// %K (fast line)
    pub k: f64,
    /// %D (SMA of %K)
    pub d: f64,
}

/// Stochastic oscillator.
///
/// `%K = (close - lowest_low) / (highest_high - lowest_low) * 100` over the
/// lookback period; `%D` is the SMA of %K over the signal period. Both lie
/// in [0, 100]; a degenerate zero range yields the midpoint 50.
#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    /// Create a stochastic oscillator with the standard (14, 3) parameters.
    pub fn new() -> Self {
        Self::with_periods(14, 3)
    }

    /// Create with custom periods.
    pub fn with_periods(k_period: usize, d_period: usize) -> Self {
        assert!(k_period > 0 && d_period > 0);
        Self { k_period, d_period }
    }
}

impl Default for Stochastic {
    fn default() -> Self {
        Self::new()
    }
}

impl CandleIndicator for Stochastic {
    type Output = StochasticOutput;

    fn calculate(&self, candles: &[Candle]) -> Vec<StochasticOutput> {
        if candles.len() < self.k_period + self.d_period - 1 {
            return vec![];
        }

        let mut k_values = Vec::with_capacity(candles.len() - self.k_period + 1);

        for window in candles.windows(self.k_period) {
            let highest = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let close = window[window.len() - 1].close;

            let range = highest - lowest;
            let k = if range == 0.0 {
                50.0
            } else {
                ((close - lowest) / range * 100.0).clamp(0.0, 100.0)
            };
            k_values.push(k);
        }

        let d_period_f64 = self.d_period as f64;
        k_values
            .windows(self.d_period)
            .map(|window| StochasticOutput {
                k: window[window.len() - 1],
                d: window.iter().sum::<f64>() / d_period_f64,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn name(&self) -> &str {
        "Stochastic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c + 1.0, c - 1.0, c, 1000.0))
            .collect()
    }

    #[test]
    fn test_rsi_bounds() {
        let rsi = Rsi::new(14);
        let data: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 8.0)
            .collect();

        let result = rsi.calculate(&data);
        assert!(!result.is_empty());
        for value in &result {
            assert!(*value >= 0.0 && *value <= 100.0);
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let rsi = Rsi::new(14);
        assert!(rsi.calculate(&[1.0; 14]).is_empty());
    }

    #[test]
    fn test_rsi_monotonic_rise_is_overbought() {
        let rsi = Rsi::new(14);
        let data: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();

        let result = rsi.calculate(&data);
        assert!(*result.last().unwrap() > 70.0);
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let rsi = Rsi::new(5);
        let data: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();

        let result = rsi.calculate(&data);
        assert!(result[0].abs() < 1e-10);
    }

    #[test]
    fn test_macd_uptrend_positive() {
        let macd = Macd::new();
        let data: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();

        let result = macd.calculate(&data);
        assert!(!result.is_empty());
        assert!(result.last().unwrap().macd > 0.0);
    }

    #[test]
    fn test_macd_histogram_identity() {
        let macd = Macd::with_periods(5, 10, 3);
        let data: Vec<f64> = (0..40)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0)
            .collect();

        for output in macd.calculate(&data) {
            assert!((output.histogram - (output.macd - output.signal)).abs() < 1e-10);
        }
    }

    #[test]
    fn test_macd_insufficient_data() {
        let macd = Macd::new();
        assert!(macd.calculate(&[100.0; 30]).is_empty());
    }

    #[test]
    fn test_stochastic_bounds() {
        let stoch = Stochastic::new();
        let candles = candles_from_closes(
            &(0..40)
                .map(|i| 100.0 + (i as f64 * 0.5).sin() * 6.0)
                .collect::<Vec<_>>(),
        );

        let result = stoch.calculate(&candles);
        assert!(!result.is_empty());
        for output in &result {
            assert!(output.k >= 0.0 && output.k <= 100.0);
            assert!(output.d >= 0.0 && output.d <= 100.0);
        }
    }

    #[test]
    fn test_stochastic_close_at_high() {
        let stoch = Stochastic::with_periods(5, 3);
        // Closes ride the highs of a rising range.
        let candles: Vec<Candle> = (0..10)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle::new(i as i64 * 60_000, base, base + 5.0, base - 5.0, base + 5.0, 1000.0)
            })
            .collect();

        let result = stoch.calculate(&candles);
        assert!((result.last().unwrap().k - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_stochastic_insufficient_data() {
        let stoch = Stochastic::new();
        assert!(stoch.calculate(&candles_from_closes(&[100.0; 10])).is_empty());
    }
}
