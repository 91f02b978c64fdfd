//! Breakout strategy.
//!
//! Computes support and resistance levels per symbol and signals when the
//! latest close clears a level by a configurable margin. Optional filters
//! demand above-average volume and the absence of a recent failed breakout,
//! and a cooldown window blocks immediate re-triggering.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use signal_core::{
    error::StrategyError,
    traits::{
        Evaluation, MarketData, MultiOutputIndicator, SignalSink, Strategy, StrategyConfig,
        StrategyStatus, TradeStore,
    },
    types::{Candle, Side, SignalStrength, StrategyMetrics, Timeframe, TradingSignal},
};
use signal_indicators::BollingerBands;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// How support and resistance are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelMethod {
    /// Highest high / lowest low of the lookback window.
    #[default]
    Donchian,
    /// Upper / lower Bollinger band.
    Bollinger,
    /// Highest / lowest close of the lookback window.
    CloseRange,
}

/// Configuration for the Breakout strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub method: LevelMethod,
    /// Lookback window for level computation
    pub period: usize,
    /// Percent beyond the level the close must reach
    pub breakout_margin_pct: f64,
    /// Require the breakout bar's volume to exceed the average
    pub volume_confirmation: bool,
    /// Volume must be at least average x this multiplier
    pub volume_multiplier: f64,
    /// Suppress the signal when a recent close already breached the level
    pub false_breakout_filter: bool,
    /// Closes to inspect for a prior failed breach
    pub revert_lookback: usize,
    /// Seconds after a breakout during which the symbol stays quiet
    pub cooldown_secs: i64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            timeframe: Timeframe::Hour1,
            method: LevelMethod::Donchian,
            period: 20,
            breakout_margin_pct: 0.5,
            volume_confirmation: true,
            volume_multiplier: 1.5,
            false_breakout_filter: true,
            revert_lookback: 3,
            cooldown_secs: 3600,
        }
    }
}

impl BreakoutConfig {
    fn candle_count(&self) -> usize {
        self.period + self.revert_lookback + 2
    }
}

impl StrategyConfig for BreakoutConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.symbols.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "At least one symbol required".into(),
            ));
        }
        if self.period < 2 {
            return Err(StrategyError::InvalidConfig(
                "Period must be at least 2".into(),
            ));
        }
        if self.breakout_margin_pct < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Breakout margin must not be negative".into(),
            ));
        }
        if self.volume_multiplier <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Volume multiplier must be positive".into(),
            ));
        }
        if self.cooldown_secs < 0 {
            return Err(StrategyError::InvalidConfig(
                "Cooldown must not be negative".into(),
            ));
        }
        Ok(())
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// Per-symbol breakout state.
#[derive(Debug, Default)]
struct BreakoutState {
    /// Last computed levels, kept for observability
    support: Option<f64>,
    resistance: Option<f64>,
    /// No signals for this symbol before this instant
    cooldown_until: Option<DateTime<Utc>>,
}

const SIGNAL_VALIDITY_HOURS: i64 = 1;

/// Breakout strategy.
pub struct BreakoutStrategy {
    id: String,
    market: Arc<dyn MarketData>,
    sink: Option<Arc<dyn SignalSink>>,
    trades: Option<Arc<dyn TradeStore>>,
    config: RwLock<BreakoutConfig>,
    status: RwLock<StrategyStatus>,
    states: RwLock<HashMap<String, Arc<Mutex<BreakoutState>>>>,
    evaluations: AtomicU64,
    signals: AtomicU64,
}

impl BreakoutStrategy {
    pub fn new(
        id: String,
        config: BreakoutConfig,
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

    /// (support, resistance) over `window`, which excludes the breakout bar.
    fn levels(config: &BreakoutConfig, window: &[Candle]) -> Option<(f64, f64)> {
        if window.len() < config.period {
            return None;
        }
        let window = &window[window.len() - config.period..];

        match config.method {
            LevelMethod::Donchian => {
                let resistance = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
                let support = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
                Some((support, resistance))
            }
            LevelMethod::CloseRange => {
                let resistance = window
                    .iter()
                    .map(|c| c.close)
                    .fold(f64::NEG_INFINITY, f64::max);
                let support = window.iter().map(|c| c.close).fold(f64::INFINITY, f64::min);
                Some((support, resistance))
            }
            LevelMethod::Bollinger => {
                let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
                let bands = BollingerBands::with_params(config.period, 2.0);
                let last = bands.calculate(&closes).last().copied()?;
                Some((last.lower, last.upper))
            }
        }
    }

    async fn publish(&self, signal: &TradingSignal) {
        if let Some(sink) = &self.sink {
            sink.publish(signal).await;
        }
    }
}

#[async_trait]
impl Strategy for BreakoutStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "breakout"
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
            states.insert(
                symbol.clone(),
                Arc::new(Mutex::new(BreakoutState::default())),
            );
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
        if candles.len() < config.period + 1 {
            return Evaluation::none(format!(
                "insufficient candle history ({} bars)",
                candles.len()
            ));
        }

        // The latest bar is the breakout candidate. With the false-breakout
        // filter on, levels also exclude the revert window; a recent bar that
        // breached and reverted would otherwise raise the level past its own
        // close and the filter could never see the breach.
        let (history, latest) = candles.split_at(candles.len() - 1);
        let latest = latest[0];
        let level_history = if config.false_breakout_filter {
            &history[..history.len().saturating_sub(config.revert_lookback)]
        } else {
            history
        };
        let Some((support, resistance)) = Self::levels(&config, level_history) else {
            return Evaluation::none("insufficient candle history for level computation");
        };

        let mut state = state_handle.lock().await;
        if *self.status.read().await == StrategyStatus::Disposed {
            return Evaluation::none("strategy is disposed");
        }
        state.support = Some(support);
        state.resistance = Some(resistance);

        let now = Utc::now();
        if let Some(until) = state.cooldown_until {
            if now < until {
                return Evaluation::none(format!(
                    "cooldown active for {}s",
                    (until - now).num_seconds()
                ));
            }
        }

        let price = latest.close;
        let margin = config.breakout_margin_pct / 100.0;
        let (side, level) = if price > resistance * (1.0 + margin) {
            (Side::Buy, resistance)
        } else if price < support * (1.0 - margin) {
            (Side::Sell, support)
        } else {
            return Evaluation::none(format!(
                "price {:.2} inside range [{:.2}, {:.2}]",
                price, support, resistance
            ));
        };

        if config.volume_confirmation {
            let lookback = &history[history.len() - config.period..];
            let avg_volume =
                lookback.iter().map(|c| c.volume).sum::<f64>() / lookback.len() as f64;
            if latest.volume < avg_volume * config.volume_multiplier {
                return Evaluation::none(format!(
                    "volume {:.0} below {:.1}x average {:.0}",
                    latest.volume, config.volume_multiplier, avg_volume
                ));
            }
        }

        if config.false_breakout_filter {
            let lookback = config.revert_lookback.min(history.len());
            let breached = history[history.len() - lookback..].iter().any(|c| match side {
                Side::Buy => c.close > level,
                Side::Sell => c.close < level,
            });
            if breached {
                return Evaluation::none("recent close already breached the level");
            }
        }

        if config.cooldown_secs > 0 {
            state.cooldown_until = Some(now + Duration::seconds(config.cooldown_secs));
        }
        drop(state);

        let breakout_pct = ((price - level) / level * 100.0).abs();
        let strength = if breakout_pct >= config.breakout_margin_pct * 2.0 {
            SignalStrength::Strong
        } else {
            SignalStrength::Moderate
        };
        let range = resistance - support;
        let (stop, target) = match side {
            Side::Buy => (level, price + range),
            Side::Sell => (level, price - range),
        };

        let direction = if side == Side::Buy { "resistance" } else { "support" };
        let signal = TradingSignal::new(
            symbol,
            side,
            self.kind(),
            strength,
            price,
            (60.0 + breakout_pct * 10.0).min(95.0),
            format!(
                "Close {:.2} broke {} {:.2} by {:.2}%",
                price, direction, level, breakout_pct
            ),
            self.id.clone(),
            Duration::hours(SIGNAL_VALIDITY_HOURS),
        )
        .with_stop_loss(stop)
        .with_take_profit(target);

        self.signals.fetch_add(1, Ordering::Relaxed);
        info!(strategy = %self.id, %symbol, side = ?side, level, price, "breakout signal");
        self.publish(&signal).await;

        Evaluation::signal(signal)
    }

    async fn update_config(&self, config: serde_json::Value) -> Result<(), StrategyError> {
        let new_config: BreakoutConfig = serde_json::from_value(config)
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        new_config.validate()?;

        let mut states = self.states.write().await;
        states.clear();
        for symbol in &new_config.symbols {
            states.insert(
                symbol.clone(),
                Arc::new(Mutex::new(BreakoutState::default())),
            );
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
