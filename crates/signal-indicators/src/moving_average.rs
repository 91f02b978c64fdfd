//! Moving average indicators.

use signal_core::traits::Indicator;

/// Simple Moving Average (SMA).
///
/// Rolling arithmetic mean of the last N values.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;
        data.windows(self.period)
            .map(|window| window.iter().sum::<f64>() / period_f64)
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA).
///
/// Smoothing factor k = 2 / (period + 1). The first output is seeded with
/// the SMA of the initial window; subsequent values follow
/// `price * k + prev_ema * (1 - k)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    smoothing: f64,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            smoothing: 2.0 / (period as f64 + 1.0),
        }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let mut result = Vec::with_capacity(data.len() - self.period + 1);

        let mut ema = data[..self.period].iter().sum::<f64>() / self.period as f64;
        result.push(ema);

        for &price in &data[self.period..] {
            ema = price * self.smoothing + ema * (1.0 - self.smoothing);
            result.push(ema);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_known_values() {
        let sma = Sma::new(3);
        let result = sma.calculate(&[10.0, 20.0, 30.0, 40.0, 50.0]);

        assert_eq!(result, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let sma = Sma::new(5);
        assert!(sma.calculate(&[1.0, 2.0, 3.0]).is_empty());
        assert!(sma.calculate(&[]).is_empty());
    }

    #[test]
    fn test_sma_exact_length() {
        let sma = Sma::new(4);
        let result = sma.calculate(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(result.len(), 1);
        assert!((result[0] - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let ema = Ema::new(3);
        // k = 2/(3+1) = 0.5
        let result = ema.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 1e-10); // SMA of [1,2,3]
        assert!((result[1] - 3.0).abs() < 1e-10); // 4*0.5 + 2*0.5
        assert!((result[2] - 4.0).abs() < 1e-10); // 5*0.5 + 3*0.5
    }

    #[test]
    fn test_ema_insufficient_data() {
        let ema = Ema::new(10);
        assert!(ema.calculate(&[1.0, 2.0, 3.0]).is_empty());
    }
}
