//! Grid strategy.
//!
//! Splits a fixed price range into equally spaced levels and trades level
//! crossings: a downward cross of an untriggered level buys, an upward cross
//! sells. A triggered level re-arms only once price departs from it by more
//! than 1.5x the grid spacing.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use signal_core::{
    error::StrategyError,
    traits::{Evaluation, MarketData, SignalSink, Strategy, StrategyConfig, StrategyStatus, TradeStore},
    types::{Side, SignalStrength, StrategyMetrics, Timeframe, TradingSignal},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Which side of the grid is allowed to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    #[default]
    Both,
    BuyOnly,
    SellOnly,
}

/// Configuration for the Grid strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Symbols to trade
    pub symbols: Vec<String>,
    /// Timeframe the instance is scoped to
    pub timeframe: Timeframe,
    /// Bottom of the grid range
    pub lower_price: f64,
    /// Top of the grid range
    pub upper_price: f64,
    /// Number of equal steps the range is split into
    pub grid_count: usize,
    /// Trade direction restriction
    pub mode: GridMode,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            timeframe: Timeframe::Minute5,
            lower_price: 100.0,
            upper_price: 200.0,
            grid_count: 10,
            mode: GridMode::Both,
        }
    }
}

impl StrategyConfig for GridConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.symbols.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "At least one symbol required".into(),
            ));
        }
        if self.upper_price <= self.lower_price {
            return Err(StrategyError::InvalidConfig(
                "Upper price must be greater than lower price".into(),
            ));
        }
        if self.grid_count < 2 {
            return Err(StrategyError::InvalidConfig(
                "Grid count must be at least 2".into(),
            ));
        }
        Ok(())
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// One grid level with its trigger latch.
#[derive(Debug, Clone)]
struct GridLevel {
    price: f64,
    triggered: bool,
}

/// Per-symbol working state, owned exclusively by one instance.
#[derive(Debug)]
struct GridState {
    levels: Vec<GridLevel>,
    spacing: f64,
    lower: f64,
    upper: f64,
    last_price: Option<f64>,
}

impl GridState {
    fn from_config(config: &GridConfig) -> Self {
        let spacing = (config.upper_price - config.lower_price) / config.grid_count as f64;
        let levels = (0..=config.grid_count)
            .map(|i| GridLevel {
                price: config.lower_price + i as f64 * spacing,
                triggered: false,
            })
            .collect();
        Self {
            levels,
            spacing,
            lower: config.lower_price,
            upper: config.upper_price,
            last_price: None,
        }
    }
}

/// How long a grid signal stays actionable.
const SIGNAL_VALIDITY_MINS: i64 = 5;

/// Grid trading strategy.
pub struct GridStrategy {
    id: String,
    market: Arc<dyn MarketData>,
    sink: Option<Arc<dyn SignalSink>>,
    trades: Option<Arc<dyn TradeStore>>,
    config: RwLock<GridConfig>,
    status: RwLock<StrategyStatus>,
    states: RwLock<HashMap<String, Arc<Mutex<GridState>>>>,
    evaluations: AtomicU64,
    signals: AtomicU64,
}

impl GridStrategy {
    /// Create a new, uninitialized instance.
    pub fn new(
        id: String,
        config: GridConfig,
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

    /// Find the level crossed between `prev` and `price`, if any.
    ///
    /// When one move crosses several levels the one closest to the current
    /// price wins; the others stay armed for later crossings.
    fn crossed_level(state: &GridState, prev: f64, price: f64) -> Option<(usize, Side)> {
        let mut best: Option<(usize, Side, f64)> = None;

        for (index, level) in state.levels.iter().enumerate() {
            if level.triggered {
                continue;
            }

            let side = if prev > level.price && price <= level.price {
                Side::Buy
            } else if prev < level.price && price >= level.price {
                Side::Sell
            } else {
                continue;
            };

            let distance = (level.price - price).abs();
            if best.map_or(true, |(_, _, d)| distance < d) {
                best = Some((index, side, distance));
            }
        }

        best.map(|(index, side, _)| (index, side))
    }

    fn mode_allows(mode: GridMode, side: Side) -> bool {
        match mode {
            GridMode::Both => true,
            GridMode::BuyOnly => side == Side::Buy,
            GridMode::SellOnly => side == Side::Sell,
        }
    }

    async fn publish(&self, signal: &TradingSignal) {
        if let Some(sink) = &self.sink {
            sink.publish(signal).await;
        }
    }
}

#[async_trait]
impl Strategy for GridStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "grid"
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
                Arc::new(Mutex::new(GridState::from_config(&config))),
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
        let mode = self.config.read().await.mode;

        // Collaborator call happens before the per-symbol lock is taken.
        let price = match self.market.quote(symbol).await {
            Ok(price) => price,
            Err(e) => {
                warn!(strategy = %self.id, %symbol, error = %e, "quote fetch failed");
                return Evaluation::none(format!("quote fetch failed: {}", e));
            }
        };

        let mut state = state_handle.lock().await;
        if *self.status.read().await == StrategyStatus::Disposed {
            return Evaluation::none("strategy is disposed");
        }

        // Re-arm levels the price has moved well away from.
        let rearm_distance = state.spacing * 1.5;
        for level in &mut state.levels {
            if level.triggered && (price - level.price).abs() > rearm_distance {
                level.triggered = false;
            }
        }

        let prev = state.last_price.replace(price);
        let prev = match prev {
            Some(prev) => prev,
            None => return Evaluation::none("first observation, grid primed"),
        };

        if price < state.lower || price > state.upper {
            return Evaluation::none(format!(
                "price {:.2} outside grid range [{:.2}, {:.2}]",
                price, state.lower, state.upper
            ));
        }

        let Some((index, side)) = Self::crossed_level(&state, prev, price) else {
            return Evaluation::none("no level crossed");
        };
        if !Self::mode_allows(mode, side) {
            return Evaluation::none(format!("{:?} signals disabled by grid mode", side));
        }

        state.levels[index].triggered = true;
        let level_price = state.levels[index].price;
        let spacing = state.spacing;

        // Levels deeper in the range carry more conviction.
        let range = state.upper - state.lower;
        let depth = match side {
            Side::Buy => (state.upper - level_price) / range,
            Side::Sell => (level_price - state.lower) / range,
        };
        let confidence = 50.0 + depth * 45.0;
        drop(state);

        let direction = if side == Side::Buy { "downward" } else { "upward" };
        let signal = TradingSignal::new(
            symbol,
            side,
            self.kind(),
            SignalStrength::Moderate,
            level_price,
            confidence,
            format!(
                "Price crossed grid level {:.2} {} (spacing {:.2})",
                level_price, direction, spacing
            ),
            self.id.clone(),
            Duration::minutes(SIGNAL_VALIDITY_MINS),
        )
        .with_stop_loss(match side {
            Side::Buy => level_price - spacing,
            Side::Sell => level_price + spacing,
        })
        .with_take_profit(match side {
            Side::Buy => level_price + spacing,
            Side::Sell => level_price - spacing,
        });

        self.signals.fetch_add(1, Ordering::Relaxed);
        info!(strategy = %self.id, %symbol, side = ?side, level = level_price, "grid signal");
        self.publish(&signal).await;

        Evaluation::signal(signal)
    }

    async fn update_config(&self, config: serde_json::Value) -> Result<(), StrategyError> {
        let new_config: GridConfig = serde_json::from_value(config)
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        new_config.validate()?;

        let mut states = self.states.write().await;
        states.clear();
        for symbol in &new_config.symbols {
            states.insert(
                symbol.clone(),
                Arc::new(Mutex::new(GridState::from_config(&new_config))),
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
        // Status flips before state cleanup so in-flight evaluations observe
        // the disposal and discard their work.
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
