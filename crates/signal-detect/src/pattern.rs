//! Chart pattern recognition.

use serde::{Deserialize, Serialize};
use signal_core::types::Candle;

/// Recognized chart pattern kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternKind {
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
}

/// Directional bias implied by a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

/// One recognized pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPattern {
    pub kind: PatternKind,
    pub signal: Bias,
    pub description: String,
}

/// Recognition parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Minimum candles required for a scan
    pub min_samples: usize,
    /// Half-width of the symmetric extremum window
    pub extremum_window: usize,
    /// Maximum price difference between paired extrema, in percent
    pub tolerance_pct: f64,
    /// Minimum bar distance between paired extrema
    pub min_bar_gap: usize,
    /// Bars used for the triangle regression
    pub regression_bars: usize,
    /// |slope| below which a regression line counts as flat
    pub flat_slope: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_samples: 20,
            extremum_window: 3,
            tolerance_pct: 3.0,
            min_bar_gap: 10,
            regression_bars: 30,
            flat_slope: 0.001,
        }
    }
}

/// Stateless chart pattern detector.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    /// Create a detector with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with custom parameters.
    pub fn with_config(config: PatternConfig) -> Self {
        Self { config }
    }

    /// Scan a candle window (oldest to newest) for patterns.
    ///
    /// Below `min_samples` candles the scan returns no patterns.
    pub fn scan(&self, candles: &[Candle]) -> Vec<ChartPattern> {
        if candles.len() < self.config.min_samples {
            return vec![];
        }

        let mut patterns = Vec::new();

        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();

        if let Some(pattern) = self.double_extremum(&highs, true) {
            patterns.push(pattern);
        }
        if let Some(pattern) = self.double_extremum(&lows, false) {
            patterns.push(pattern);
        }
        if let Some(pattern) = self.triangle(&highs, &lows) {
            patterns.push(pattern);
        }

        patterns
    }

    /// Indices of local maxima (or minima) over a symmetric window.
    ///
    /// A point qualifies when no neighbor in its window is strictly beyond
    /// it, so plateau points count; a contiguous equal-height run collapses
    /// to its first index.
    fn local_extrema(values: &[f64], window: usize, maxima: bool) -> Vec<usize> {
        let mut extrema = Vec::new();
        let mut prev_dominated = true;

        for i in 0..values.len() {
            let start = i.saturating_sub(window);
            let end = (i + window + 1).min(values.len());

            let dominated = values[start..end]
                .iter()
                .enumerate()
                .any(|(offset, &other)| {
                    let j = start + offset;
                    j != i && (maxima && other > values[i] || !maxima && other < values[i])
                });

            // Only the first bar of an equal-height run is kept.
            let plateau_tail = i > 0 && !prev_dominated && values[i - 1] == values[i];
            if !dominated && !plateau_tail {
                extrema.push(i);
            }
            prev_dominated = dominated;
        }

        extrema
    }

    /// Look for two same-kind extrema within the tolerance and at least
    /// `min_bar_gap` bars apart.
    fn double_extremum(&self, values: &[f64], maxima: bool) -> Option<ChartPattern> {
        let extrema = Self::local_extrema(values, self.config.extremum_window, maxima);

        for (pos, &first) in extrema.iter().enumerate() {
            for &second in &extrema[pos + 1..] {
                if second - first < self.config.min_bar_gap {
                    continue;
                }

                let a = values[first];
                let b = values[second];
                let reference = a.abs().max(b.abs());
                if reference == 0.0 {
                    continue;
                }

                let diff_pct = (a - b).abs() / reference * 100.0;
                if diff_pct <= self.config.tolerance_pct {
                    return Some(if maxima {
                        ChartPattern {
                            kind: PatternKind::DoubleTop,
                            signal: Bias::Bearish,
                            description: format!(
                                "Double top near {:.2} ({} bars apart, {:.1}% difference)",
                                a.max(b),
                                second - first,
                                diff_pct
                            ),
                        }
                    } else {
                        ChartPattern {
                            kind: PatternKind::DoubleBottom,
                            signal: Bias::Bullish,
                            description: format!(
                                "Double bottom near {:.2} ({} bars apart, {:.1}% difference)",
                                a.min(b),
                                second - first,
                                diff_pct
                            ),
                        }
                    });
                }
            }
        }

        None
    }

    /// Least-squares slope of evenly spaced values.
    fn regression_slope(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        if n < 2.0 {
            return 0.0;
        }

        let x_mean = (n - 1.0) / 2.0;
        let y_mean = values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let dx = i as f64 - x_mean;
            numerator += dx * (y - y_mean);
            denominator += dx * dx;
        }

        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }

    /// Classify a triangle from the slopes of highs and lows over the most
    /// recent regression window.
    fn triangle(&self, highs: &[f64], lows: &[f64]) -> Option<ChartPattern> {
        let bars = self.config.regression_bars.min(highs.len());
        if bars < self.config.min_samples {
            return None;
        }

        let high_slope = Self::regression_slope(&highs[highs.len() - bars..]);
        let low_slope = Self::regression_slope(&lows[lows.len() - bars..]);

        let flat = self.config.flat_slope;
        let high_flat = high_slope.abs() < flat;
        let low_flat = low_slope.abs() < flat;

        let (kind, signal) = if high_flat && low_slope >= flat {
            (PatternKind::AscendingTriangle, Bias::Bullish)
        } else if high_slope <= -flat && low_flat {
            (PatternKind::DescendingTriangle, Bias::Bearish)
        } else if high_slope <= -flat && low_slope >= flat {
            (PatternKind::SymmetricalTriangle, Bias::Neutral)
        } else {
            return None;
        };

        Some(ChartPattern {
            kind,
            signal,
            description: format!(
                "{:?} over {} bars (high slope {:.4}, low slope {:.4})",
                kind, bars, high_slope, low_slope
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(highs: &[f64], lows: &[f64]) -> Vec<Candle> {
        highs
            .iter()
            .zip(lows.iter())
            .enumerate()
            .map(|(i, (&h, &l))| {
                let mid = (h + l) / 2.0;
                Candle::new(i as i64 * 60_000, mid, h, l, mid, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_insufficient_data_returns_empty() {
        let detector = PatternDetector::new();
        let highs = vec![100.0; 10];
        let lows = vec![90.0; 10];
        assert!(detector.scan(&candles(&highs, &lows)).is_empty());
    }

    #[test]
    fn test_local_extrema_accepts_plateaus() {
        // The leading plateau bar is a maximum; its twin at index 2 is
        // dominated by the 7.0 inside its window.
        let values = vec![1.0, 5.0, 5.0, 1.0, 7.0, 1.0];
        let maxima = PatternDetector::local_extrema(&values, 2, true);
        assert_eq!(maxima, vec![1, 4]);
    }

    #[test]
    fn test_local_extrema_collapses_plateau_runs() {
        let values = vec![1.0, 6.0, 6.0, 6.0, 1.0, 1.0];
        let maxima = PatternDetector::local_extrema(&values, 2, true);
        assert_eq!(maxima, vec![1]);
    }

    #[test]
    fn test_double_top_detected() {
        let detector = PatternDetector::new();

        // Two peaks of equal height, 20 bars apart, in a 60-candle window.
        let mut highs = vec![100.0; 60];
        let mut lows = vec![95.0; 60];
        for i in 0..60 {
            highs[i] += (i % 4) as f64 * 0.2;
            lows[i] -= (i % 4) as f64 * 0.2;
        }
        highs[20] = 110.0;
        highs[40] = 110.5; // within 3%

        let patterns = detector.scan(&candles(&highs, &lows));
        let double_top = patterns
            .iter()
            .find(|p| p.kind == PatternKind::DoubleTop)
            .expect("double top expected");
        assert_eq!(double_top.signal, Bias::Bearish);
    }

    #[test]
    fn test_double_bottom_detected() {
        let detector = PatternDetector::new();

        let mut highs = vec![105.0; 60];
        let mut lows = vec![100.0; 60];
        for i in 0..60 {
            highs[i] += (i % 4) as f64 * 0.2;
            lows[i] += (i % 4) as f64 * 0.2;
        }
        lows[15] = 90.0;
        lows[45] = 90.4;

        let patterns = detector.scan(&candles(&highs, &lows));
        let double_bottom = patterns
            .iter()
            .find(|p| p.kind == PatternKind::DoubleBottom)
            .expect("double bottom expected");
        assert_eq!(double_bottom.signal, Bias::Bullish);
    }

    #[test]
    fn test_peaks_too_close_are_ignored() {
        let detector = PatternDetector::new();

        let mut highs: Vec<f64> = (0..60).map(|i| 80.0 + i as f64 * 0.1).collect();
        let lows: Vec<f64> = highs.iter().map(|h| h - 5.0).collect();
        highs[30] = 110.0;
        highs[35] = 110.0; // only 5 bars apart

        let patterns = detector.scan(&candles(&highs, &lows));
        assert!(!patterns.iter().any(|p| p.kind == PatternKind::DoubleTop));
    }

    #[test]
    fn test_plateau_double_top() {
        let detector = PatternDetector::new();

        // Two flat-topped peaks of equal height, 20 bars apart; every plateau
        // bar has an equal neighbor, so none of them is a strict maximum.
        let mut highs: Vec<f64> = (0..60).map(|i| 80.0 + i as f64 * 0.1).collect();
        let lows: Vec<f64> = highs.iter().map(|h| h - 5.0).collect();
        highs[20] = 110.0;
        highs[21] = 110.0;
        highs[40] = 110.0;
        highs[41] = 110.0;

        let patterns = detector.scan(&candles(&highs, &lows));
        let double_top = patterns
            .iter()
            .find(|p| p.kind == PatternKind::DoubleTop)
            .expect("double top expected");
        assert_eq!(double_top.signal, Bias::Bearish);
    }

    #[test]
    fn test_ascending_triangle() {
        let detector = PatternDetector::new();

        // Flat resistance, rising support.
        let highs = vec![100.0; 40];
        let lows: Vec<f64> = (0..40).map(|i| 80.0 + i as f64 * 0.3).collect();

        let patterns = detector.scan(&candles(&highs, &lows));
        let triangle = patterns
            .iter()
            .find(|p| p.kind == PatternKind::AscendingTriangle)
            .expect("ascending triangle expected");
        assert_eq!(triangle.signal, Bias::Bullish);
    }

    #[test]
    fn test_descending_triangle() {
        let detector = PatternDetector::new();

        let highs: Vec<f64> = (0..40).map(|i| 120.0 - i as f64 * 0.3).collect();
        let lows = vec![100.0; 40];

        let patterns = detector.scan(&candles(&highs, &lows));
        let triangle = patterns
            .iter()
            .find(|p| p.kind == PatternKind::DescendingTriangle)
            .expect("descending triangle expected");
        assert_eq!(triangle.signal, Bias::Bearish);
    }

    #[test]
    fn test_symmetrical_triangle() {
        let detector = PatternDetector::new();

        let highs: Vec<f64> = (0..40).map(|i| 120.0 - i as f64 * 0.25).collect();
        let lows: Vec<f64> = (0..40).map(|i| 90.0 + i as f64 * 0.25).collect();

        let patterns = detector.scan(&candles(&highs, &lows));
        assert!(patterns
            .iter()
            .any(|p| p.kind == PatternKind::SymmetricalTriangle));
    }

    #[test]
    fn test_regression_slope() {
        let rising: Vec<f64> = (0..10).map(|i| i as f64 * 2.0).collect();
        assert!((PatternDetector::regression_slope(&rising) - 2.0).abs() < 1e-10);

        let flat = vec![5.0; 10];
        assert!(PatternDetector::regression_slope(&flat).abs() < 1e-10);
    }
}
