//! Statistical anomaly detection over rolling candle windows.

use serde::{Deserialize, Serialize};
use signal_core::types::Candle;
use statrs::statistics::Statistics;

/// Severity of a detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// What kind of anomaly was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    Volume,
    Price,
    VolatilitySpike,
}

/// One detected anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// The z-score (volume/price) or volatility ratio that tripped the check
    pub value: f64,
    pub description: String,
}

/// Result of one anomaly scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Number of candles examined
    pub samples: usize,
    /// Detected anomalies, empty when the window looks normal
    pub anomalies: Vec<Anomaly>,
    /// Overall severity across co-occurring anomalies
    pub severity: Option<Severity>,
}

impl AnomalyReport {
    fn insufficient(samples: usize) -> Self {
        Self {
            samples,
            anomalies: vec![],
            severity: None,
        }
    }
}

/// Detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Minimum candles required for a scan
    pub min_samples: usize,
    /// |z| above which volume is anomalous
    pub volume_z: f64,
    /// |z| above which a volume anomaly is HIGH severity
    pub volume_z_high: f64,
    /// |z| above which price is anomalous
    pub price_z: f64,
    /// |z| above which a price anomaly is HIGH severity
    pub price_z_high: f64,
    /// Recent/prior volatility ratio above which a spike is flagged
    pub volatility_ratio: f64,
    /// Ratio above which a volatility spike is HIGH severity
    pub volatility_ratio_high: f64,
    /// Bars in the recent volatility window
    pub recent_window: usize,
    /// Bars in the prior volatility window
    pub prior_window: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            volume_z: 3.0,
            volume_z_high: 5.0,
            price_z: 2.5,
            price_z_high: 4.0,
            volatility_ratio: 2.0,
            volatility_ratio_high: 3.0,
            recent_window: 5,
            prior_window: 25,
        }
    }
}

/// Stateless anomaly detector.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    /// Create a detector with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with custom thresholds.
    pub fn with_config(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Scan a candle window (oldest to newest) for anomalies.
    ///
    /// Below `min_samples` candles the report is empty rather than an error.
    pub fn scan(&self, candles: &[Candle]) -> AnomalyReport {
        if candles.len() < self.config.min_samples {
            return AnomalyReport::insufficient(candles.len());
        }

        let mut anomalies = Vec::new();

        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        if let Some(anomaly) = self.zscore_check(
            &volumes,
            AnomalyKind::Volume,
            self.config.volume_z,
            self.config.volume_z_high,
        ) {
            anomalies.push(anomaly);
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        if let Some(anomaly) = self.zscore_check(
            &closes,
            AnomalyKind::Price,
            self.config.price_z,
            self.config.price_z_high,
        ) {
            anomalies.push(anomaly);
        }

        if let Some(anomaly) = self.volatility_check(&closes) {
            anomalies.push(anomaly);
        }

        let severity = match anomalies.len() {
            0 => None,
            1 => Some(Severity::Low),
            2 => Some(Severity::Medium),
            _ => Some(Severity::High),
        };

        AnomalyReport {
            samples: candles.len(),
            anomalies,
            severity,
        }
    }

    /// Flag the latest value when it sits more than `threshold` standard
    /// deviations from the window mean.
    fn zscore_check(
        &self,
        values: &[f64],
        kind: AnomalyKind,
        threshold: f64,
        high_threshold: f64,
    ) -> Option<Anomaly> {
        let latest = *values.last()?;
        let mean = values.mean();
        let std_dev = values.std_dev();

        if std_dev == 0.0 || !std_dev.is_finite() {
            return None;
        }

        let z = (latest - mean) / std_dev;
        if z.abs() <= threshold {
            return None;
        }

        let severity = if z.abs() > high_threshold {
            Severity::High
        } else {
            Severity::Medium
        };
        let label = match kind {
            AnomalyKind::Volume => "Volume",
            AnomalyKind::Price => "Price",
            AnomalyKind::VolatilitySpike => "Volatility",
        };

        Some(Anomaly {
            kind,
            severity,
            value: z,
            description: format!("{} z-score {:.2} exceeds {:.1}", label, z, threshold),
        })
    }

    /// Compare return volatility of the most recent bars to the prior window.
    fn volatility_check(&self, closes: &[f64]) -> Option<Anomaly> {
        let needed = self.config.recent_window + self.config.prior_window + 1;
        if closes.len() < needed {
            return None;
        }

        let returns: Vec<f64> = closes
            .windows(2)
            .filter(|pair| pair[0] != 0.0)
            .map(|pair| (pair[1] - pair[0]) / pair[0])
            .collect();
        if returns.len() < self.config.recent_window + self.config.prior_window {
            return None;
        }

        let split = returns.len() - self.config.recent_window;
        let prior = &returns[split - self.config.prior_window..split];
        let recent = &returns[split..];

        let prior_vol = prior.std_dev();
        let recent_vol = recent.std_dev();
        if prior_vol == 0.0 || !prior_vol.is_finite() {
            return None;
        }

        let ratio = recent_vol / prior_vol;
        if ratio <= self.config.volatility_ratio {
            return None;
        }

        let severity = if ratio > self.config.volatility_ratio_high {
            Severity::High
        } else {
            Severity::Medium
        };

        Some(Anomaly {
            kind: AnomalyKind::VolatilitySpike,
            severity,
            value: ratio,
            description: format!(
                "Recent volatility is {:.1}x the prior {} bars",
                ratio, self.config.prior_window
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_candles(n: usize, close: f64, volume: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                // Small deterministic jitter keeps the std dev nonzero.
                let c = close + (i % 5) as f64 * 0.1;
                let v = volume + (i % 7) as f64;
                Candle::new(i as i64 * 60_000, c, c + 0.5, c - 0.5, c, v)
            })
            .collect()
    }

    #[test]
    fn test_insufficient_data_is_not_an_error() {
        let detector = AnomalyDetector::new();
        let report = detector.scan(&flat_candles(10, 100.0, 1000.0));

        assert_eq!(report.samples, 10);
        assert!(report.anomalies.is_empty());
        assert!(report.severity.is_none());
    }

    #[test]
    fn test_quiet_window_has_no_anomalies() {
        let detector = AnomalyDetector::new();
        let report = detector.scan(&flat_candles(60, 100.0, 1000.0));

        assert!(report.anomalies.is_empty());
        assert!(report.severity.is_none());
    }

    #[test]
    fn test_volume_spike_detected() {
        let detector = AnomalyDetector::new();
        let mut candles = flat_candles(60, 100.0, 1000.0);
        let last = candles.last_mut().unwrap();
        last.volume = 50_000.0;

        let report = detector.scan(&candles);
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::Volume));
        assert_eq!(report.severity, Some(Severity::Low));
    }

    #[test]
    fn test_extreme_volume_is_high_severity() {
        let detector = AnomalyDetector::new();
        let mut candles = flat_candles(60, 100.0, 1000.0);
        candles.last_mut().unwrap().volume = 1_000_000.0;

        let report = detector.scan(&candles);
        let anomaly = report
            .anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::Volume)
            .unwrap();
        assert_eq!(anomaly.severity, Severity::High);
    }

    #[test]
    fn test_price_jump_detected() {
        let detector = AnomalyDetector::new();
        let mut candles = flat_candles(60, 100.0, 1000.0);
        let last = candles.last_mut().unwrap();
        last.close = 140.0;

        let report = detector.scan(&candles);
        assert!(report.anomalies.iter().any(|a| a.kind == AnomalyKind::Price));
    }

    #[test]
    fn test_volatility_spike_detected() {
        let detector = AnomalyDetector::new();
        // Calm series followed by violent swings in the last bars.
        let mut closes: Vec<f64> = (0..55).map(|i| 100.0 + (i % 3) as f64 * 0.05).collect();
        closes.extend_from_slice(&[104.0, 96.0, 105.0, 95.0, 106.0]);

        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c + 1.0, c - 1.0, c, 1000.0))
            .collect();

        let report = detector.scan(&candles);
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::VolatilitySpike));
    }
}
