//! Trend-following strategy.
//!
//! Derives a trend direction per symbol from one of several detection
//! methods and signals in the trend direction once the trend has persisted
//! for a configurable number of evaluations. Repeated signals in the same
//! direction are suppressed until the direction flips.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use signal_core::{
    error::StrategyError,
    traits::{
        Evaluation, Indicator, MarketData, MultiOutputIndicator, SignalSink, Strategy,
        StrategyConfig, StrategyStatus, TradeStore,
    },
    types::{Side, SignalStrength, StrategyMetrics, Timeframe, TradingSignal},
};
use signal_indicators::{Ema, Macd};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// How the trend direction is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendMethod {
    /// Fast EMA vs slow EMA gap.
    #[default]
    MaCross,
    /// MACD histogram sign and slope.
    Macd,
    /// Reserved. Always reports a sideways market.
    Adx,
}

/// Detected market direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

/// Configuration for the Trend-Following strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub method: TrendMethod,
    /// Fast MA period (MA cross) / fast EMA period (MACD)
    pub fast_period: usize,
    /// Slow MA period (MA cross) / slow EMA period (MACD)
    pub slow_period: usize,
    /// MACD signal line period
    pub signal_period: usize,
    /// Consecutive same-direction evaluations required before signaling
    pub confirmation_candles: u32,
    /// Minimum trend strength (0..=100) required to signal
    pub min_strength: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            timeframe: Timeframe::Hour1,
            method: TrendMethod::MaCross,
            fast_period: 9,
            slow_period: 21,
            signal_period: 9,
            confirmation_candles: 3,
            min_strength: 30.0,
        }
    }
}

impl TrendConfig {
    /// Candle history needed for one detection pass.
    fn candle_count(&self) -> usize {
        self.slow_period + self.signal_period + 10
    }
}

impl StrategyConfig for TrendConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.symbols.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "At least one symbol required".into(),
            ));
        }
        if self.fast_period == 0 || self.slow_period == 0 || self.signal_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Indicator periods must be positive".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_strength) {
            return Err(StrategyError::InvalidConfig(
                "Minimum strength must be in 0..=100".into(),
            ));
        }
        Ok(())
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// Per-symbol trend tracking state.
#[derive(Debug, Default)]
struct TrendState {
    direction: Option<TrendDirection>,
    /// Consecutive evaluations observing the current direction
    duration: u32,
    /// Last direction a signal was emitted for
    last_signaled: Option<TrendDirection>,
}

const SIGNAL_VALIDITY_HOURS: i64 = 1;

/// Gap between the fast and slow MA, as a fraction of the slow MA, below
/// which the market counts as sideways.
const SIDEWAYS_GAP: f64 = 1e-4;

/// Trend-following strategy.
pub struct TrendStrategy {
    id: String,
    market: Arc<dyn MarketData>,
    sink: Option<Arc<dyn SignalSink>>,
    trades: Option<Arc<dyn TradeStore>>,
    config: RwLock<TrendConfig>,
    status: RwLock<StrategyStatus>,
    states: RwLock<HashMap<String, Arc<Mutex<TrendState>>>>,
    evaluations: AtomicU64,
    signals: AtomicU64,
}

impl TrendStrategy {
    pub fn new(
        id: String,
        config: TrendConfig,
        market: Arc<dyn MarketData>,
        sink: Option<Arc<dyn SignalSink>>,
        trades: Option<Arc<dyn TradeStore>>,
    ) -> Self {
        Self {
            id,
            market,
            sink,
            trades,
            config: RwLock::new(config),
            status: RwLock::new(StrategyStatus::Idle),
            states: RwLock::new(HashMap::new()),
            evaluations: AtomicU64::new(0),
            signals: AtomicU64::new(0),
        }
    }

    /// Direction and strength (0..=100) for a close series, oldest first.
    fn detect(config: &TrendConfig, closes: &[f64]) -> (TrendDirection, f64) {
        match config.method {
            TrendMethod::MaCross => Self::detect_ma_cross(config, closes),
            TrendMethod::Macd => Self::detect_macd(config, closes),
            // ADX detection is not implemented; reports no trend.
            TrendMethod::Adx => (TrendDirection::Sideways, 0.0),
        }
    }

    fn detect_ma_cross(config: &TrendConfig, closes: &[f64]) -> (TrendDirection, f64) {
        let fast = Ema::new(config.fast_period).calculate(closes);
        let slow = Ema::new(config.slow_period).calculate(closes);
        let (Some(&fast), Some(&slow)) = (fast.last(), slow.last()) else {
            return (TrendDirection::Sideways, 0.0);
        };
        if slow == 0.0 {
            return (TrendDirection::Sideways, 0.0);
        }

        let gap = (fast - slow) / slow;
        let direction = if gap > SIDEWAYS_GAP {
            TrendDirection::Up
        } else if gap < -SIDEWAYS_GAP {
            TrendDirection::Down
        } else {
            TrendDirection::Sideways
        };
        // A 5% MA gap saturates the strength scale.
        let strength = (gap.abs() * 100.0 * 20.0).min(100.0);
        (direction, strength)
    }

    fn detect_macd(config: &TrendConfig, closes: &[f64]) -> (TrendDirection, f64) {
        let macd = Macd::with_periods(config.fast_period, config.slow_period, config.signal_period);
        let outputs = macd.calculate(closes);
        if outputs.len() < 2 {
            return (TrendDirection::Sideways, 0.0);
        }

        let prev = outputs[outputs.len() - 2].histogram;
        let last = outputs[outputs.len() - 1].histogram;
        let price = match closes.last() {
            Some(&price) if price != 0.0 => price,
            _ => return (TrendDirection::Sideways, 0.0),
        };

        let direction = if last > 0.0 && last >= prev {
            TrendDirection::Up
        } else if last < 0.0 && last <= prev {
            TrendDirection::Down
        } else {
            TrendDirection::Sideways
        };
        // Histogram in basis points of price; 50 bps saturates.
        let strength = ((last.abs() / price) * 10_000.0 * 2.0).min(100.0);
        (direction, strength)
    }

    fn strength_label(strength: f64) -> SignalStrength {
        if strength >= 70.0 {
            SignalStrength::Strong
        } else if strength >= 50.0 {
            SignalStrength::Moderate
        } else {
            SignalStrength::Weak
        }
    }

    async fn publish(&self, signal: &TradingSignal) {
        if let Some(sink) = &self.sink {
            sink.publish(signal).await;
        }
    }
}

#[async_trait]
impl Strategy for TrendStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "trend_following"
    }

    async fn symbols(&self) -> Vec<String> {
        self.config.read().await.symbols.clone()
    }

    async fn status(&self) -> StrategyStatus {
        *self.status.read().await
    }

    async fn initialize(&self) -> Result<(), StrategyError> {
        let mut status = self.status.write().await;
        if *status == StrategyStatus::Disposed {
            return Err(StrategyError::Disposed);
        }

        let config = self.config.read().await;
        config.validate()?;

        let mut states = self.states.write().await;
        states.clear();
        for symbol in &config.symbols {
            states.insert(symbol.clone(), Arc::new(Mutex::new(TrendState::default())));
        }

        *status = StrategyStatus::Active;
        Ok(())
    }

    async fn evaluate(&self, symbol: &str) -> Evaluation {
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        match *self.status.read().await {
            StrategyStatus::Active => {}
            StrategyStatus::Paused => return Evaluation::none("strategy is paused"),
            StrategyStatus::Disposed => return Evaluation::none("strategy is disposed"),
            _ => return Evaluation::none("strategy is not active"),
        }

        let state_handle = match self.states.read().await.get(symbol) {
            Some(handle) => Arc::clone(handle),
            None => return Evaluation::none(format!("symbol {} not configured", symbol)),
        };
        let config = self.config.read().await.clone();

        let candles = match self
            .market
            .candles(symbol, config.timeframe, config.candle_count())
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!(strategy = %self.id, %symbol, error = %e, "candle fetch failed");
                return Evaluation::none(format!("candle fetch failed: {}", e));
            }
        };
        if candles.len() < config.slow_period + config.signal_period {
            return Evaluation::none(format!(
                "insufficient candle history ({} bars)",
                candles.len()
            ));
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let (direction, strength) = Self::detect(&config, &closes);

        let mut state = state_handle.lock().await;
        if *self.status.read().await == StrategyStatus::Disposed {
            return Evaluation::none("strategy is disposed");
        }

        if state.direction == Some(direction) {
            state.duration += 1;
        } else {
            state.direction = Some(direction);
            state.duration = 1;
        }

        if direction == TrendDirection::Sideways {
            return Evaluation::none("market is sideways");
        }
        if strength < config.min_strength {
            return Evaluation::none(format!(
                "trend strength {:.1} below threshold {:.1}",
                strength, config.min_strength
            ));
        }
        if state.duration < config.confirmation_candles {
            return Evaluation::none(format!(
                "awaiting confirmation ({}/{} evaluations)",
                state.duration, config.confirmation_candles
            ));
        }
        if state.last_signaled == Some(direction) {
            return Evaluation::none("trend direction already signaled");
        }
        state.last_signaled = Some(direction);
        drop(state);

        let price = closes[closes.len() - 1];
        let side = match direction {
            TrendDirection::Up => Side::Buy,
            TrendDirection::Down => Side::Sell,
            TrendDirection::Sideways => unreachable!(),
        };

        // Stop behind the recent swing, target at twice the stop distance.
        let recent = &candles[candles.len().saturating_sub(10)..];
        let stop = match side {
            Side::Buy => recent.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
            Side::Sell => recent
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max),
        };
        let target = price + (price - stop) * 2.0;

        let signal = TradingSignal::new(
            symbol,
            side,
            self.kind(),
            Self::strength_label(strength),
            price,
            strength,
            format!(
                "{:?} trend via {:?}, strength {:.1}",
                direction, config.method, strength
            ),
            self.id.clone(),
            Duration::hours(SIGNAL_VALIDITY_HOURS),
        )
        .with_stop_loss(stop)
        .with_take_profit(target)
        .with_target(target);

        self.signals.fetch_add(1, Ordering::Relaxed);
        info!(strategy = %self.id, %symbol, direction = ?direction, strength, "trend signal");
        self.publish(&signal).await;

        Evaluation::signal(signal)
    }

    async fn update_config(&self, config: serde_json::Value) -> Result<(), StrategyError> {
        let new_config: TrendConfig = serde_json::from_value(config)
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        new_config.validate()?;

        let mut states = self.states.write().await;
        states.clear();
        for symbol in &new_config.symbols {
            states.insert(symbol.clone(), Arc::new(Mutex::new(TrendState::default())));
        }
        *self.config.write().await = new_config;
        Ok(())
    }

    async fn pause(&self) {
        let mut status = self.status.write().await;
        if *status == StrategyStatus::Active {
            *status = StrategyStatus::Paused;
        }
    }

    async fn resume(&self) {
        let mut status = self.status.write().await;
        if *status == StrategyStatus::Paused {
            *status = StrategyStatus::Active;
        }
    }

    async fn dispose(&self) {
        *self.status.write().await = StrategyStatus::Disposed;
        self.states.write().await.clear();
    }

    async fn metrics(&self) -> StrategyMetrics {
        let trades = match &self.trades {
            Some(store) => store.closed_trades(&self.id).await.unwrap_or_else(|e| {
                warn!(strategy = %self.id, error = %e, "trade history unavailable");
                vec![]
            }),
            None => vec![],
        };
        StrategyMetrics::from_trades(
            &trades,
            self.evaluations.load(Ordering::Relaxed),
            self.signals.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::error::DataError;
    use signal_core::types::Candle;

    /// Market stub serving a fixed candle window.
    struct CandleTape {
        candles: Vec<Candle>,
    }

    impl CandleTape {
        fn from_closes(closes: &[f64]) -> Arc<Self> {
            let candles = closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c + 0.5, c - 0.5, c, 1000.0))
                .collect();
            Arc::new(Self { candles })
        }
    }

    #[async_trait]
    impl MarketData for CandleTape {
        async fn quote(&self, _symbol: &str) -> Result<f64, DataError> {
            self.candles
                .last()
                .map(|c| c.close)
                .ok_or(DataError::NoDataAvailable)
        }

        async fn candles(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            count: usize,
        ) -> Result<Vec<Candle>, DataError> {
            let start = self.candles.len().saturating_sub(count);
            Ok(self.candles[start..].to_vec())
        }
    }

    fn test_config() -> TrendConfig {
        TrendConfig {
            symbols: vec!["BTCUSDT".to_string()],
            ..Default::default()
        }
    }

    fn rising_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_config_validation() {
        let mut config = test_config();
        assert!(config.validate().is_ok());

        config.fast_period = 30; // >= slow
        assert!(config.validate().is_err());

        config.fast_period = 9;
        config.min_strength = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ma_cross_detects_uptrend() {
        let config = test_config();
        let (direction, strength) = TrendStrategy::detect(&config, &rising_closes(60));
        assert_eq!(direction, TrendDirection::Up);
        assert!(strength >= 30.0);
    }

    #[test]
    fn test_ma_cross_detects_downtrend() {
        let config = test_config();
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let (direction, _) = TrendStrategy::detect(&config, &closes);
        assert_eq!(direction, TrendDirection::Down);
    }

    #[test]
    fn test_flat_market_is_sideways() {
        let config = test_config();
        let closes = vec![100.0; 60];
        let (direction, strength) = TrendStrategy::detect(&config, &closes);
        assert_eq!(direction, TrendDirection::Sideways);
        assert!(strength < 1.0);
    }

    #[test]
    fn test_adx_method_never_trends() {
        let config = TrendConfig {
            method: TrendMethod::Adx,
            ..test_config()
        };
        let (direction, strength) = TrendStrategy::detect(&config, &rising_closes(60));
        assert_eq!(direction, TrendDirection::Sideways);
        assert!((strength - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_macd_accelerating_rise_is_up() {
        let config = TrendConfig {
            method: TrendMethod::Macd,
            ..test_config()
        };
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64).powi(2) * 0.05).collect();
        let (direction, _) = TrendStrategy::detect(&config, &closes);
        assert_eq!(direction, TrendDirection::Up);
    }

    #[tokio::test]
    async fn test_signal_requires_confirmation_then_fires_once() {
        let strategy = TrendStrategy::new(
            "trend-test".to_string(),
            test_config(),
            CandleTape::from_closes(&rising_closes(60)),
            None,
            None,
        );
        strategy.initialize().await.unwrap();

        // Default confirmation is 3 consecutive same-direction evaluations.
        assert!(!strategy.evaluate("BTCUSDT").await.is_signal());
        assert!(!strategy.evaluate("BTCUSDT").await.is_signal());

        let signal = strategy.evaluate("BTCUSDT").await.into_signal().unwrap();
        assert_eq!(signal.side, Side::Buy);
        assert!(signal.stop_loss.is_some());

        // Same direction again is suppressed.
        assert!(!strategy.evaluate("BTCUSDT").await.is_signal());
    }

    #[tokio::test]
    async fn test_insufficient_history_is_no_signal() {
        let strategy = TrendStrategy::new(
            "trend-test".to_string(),
            test_config(),
            CandleTape::from_closes(&rising_closes(10)),
            None,
            None,
        );
        strategy.initialize().await.unwrap();

        match strategy.evaluate("BTCUSDT").await {
            Evaluation::NoSignal { reason } => assert!(reason.contains("insufficient")),
            _ => panic!("expected no signal"),
        }
    }

    #[tokio::test]
    async fn test_uninitialized_strategy_is_no_signal() {
        let strategy = TrendStrategy::new(
            "trend-test".to_string(),
            test_config(),
            CandleTape::from_closes(&rising_closes(60)),
            None,
            None,
        );

        assert_eq!(strategy.status().await, StrategyStatus::Idle);
        assert!(!strategy.evaluate("BTCUSDT").await.is_signal());
    }
}
