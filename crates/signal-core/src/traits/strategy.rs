//! Strategy trait definitions.

use crate::error::StrategyError;
use crate::types::{StrategyMetrics, TradingSignal};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), StrategyError>;

    /// Symbols this configuration covers.
    fn symbols(&self) -> &[String];
}

/// Lifecycle state of a strategy instance.
///
/// `Idle` until `initialize` succeeds, then `Active`. `Paused` suspends
/// evaluation without losing state. `Error` marks a failed initialization.
/// `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyStatus {
    Idle,
    Active,
    Paused,
    Error,
    Disposed,
}

/// Outcome of a single `evaluate` call.
///
/// Evaluation never fails: internal errors are converted to `NoSignal` with
/// a descriptive reason.
#[derive(Debug, Clone)]
pub enum Evaluation {
    /// A trading signal was produced.
    Signal(Box<TradingSignal>),
    /// No signal; `reason` explains why.
    NoSignal { reason: String },
}

impl Evaluation {
    /// Build a no-signal result.
    pub fn none(reason: impl Into<String>) -> Self {
        Evaluation::NoSignal {
            reason: reason.into(),
        }
    }

    /// Build a signal result.
    pub fn signal(signal: TradingSignal) -> Self {
        Evaluation::Signal(Box::new(signal))
    }

    /// True when a signal was produced.
    pub fn is_signal(&self) -> bool {
        matches!(self, Evaluation::Signal(_))
    }

    /// The contained signal, if any.
    pub fn into_signal(self) -> Option<TradingSignal> {
        match self {
            Evaluation::Signal(signal) => Some(*signal),
            Evaluation::NoSignal { .. } => None,
        }
    }
}

/// Core strategy contract.
///
/// A strategy instance owns per-symbol working state keyed by the symbols in
/// its configuration. External triggers (a tick, a candle close, a schedule)
/// call `evaluate` per symbol; evaluations of different (strategy, symbol)
/// pairs run without mutual coordination, while evaluations of the same pair
/// are serialized internally by the instance.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Unique instance id assigned at creation.
    fn id(&self) -> &str;

    /// Strategy type key (e.g. "grid").
    fn kind(&self) -> &'static str;

    /// Symbols currently covered by the instance configuration.
    async fn symbols(&self) -> Vec<String>;

    /// Current lifecycle status.
    async fn status(&self) -> StrategyStatus;

    /// Seed per-symbol state and transition Idle -> Active.
    async fn initialize(&self) -> Result<(), StrategyError>;

    /// Evaluate market state for one symbol.
    ///
    /// Returns either a signal or a no-signal result with a human-readable
    /// reason. Collaborator failures and bad inputs are caught, logged and
    /// reported as no-signal; this method never errors.
    async fn evaluate(&self, symbol: &str) -> Evaluation;

    /// Replace the configuration wholesale and rebuild per-symbol state.
    async fn update_config(&self, config: serde_json::Value) -> Result<(), StrategyError>;

    /// Suspend evaluation without losing state.
    async fn pause(&self);

    /// Resume evaluation after a pause.
    async fn resume(&self);

    /// Tear down the instance: clear state and enter the terminal
    /// `Disposed` status. Safe to call concurrently with in-flight
    /// evaluations of the same instance.
    async fn dispose(&self);

    /// Performance metrics derived on demand from completed trade history.
    async fn metrics(&self) -> StrategyMetrics;
}
