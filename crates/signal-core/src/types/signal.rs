//! Trading signal types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Qualitative strength of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

/// A time-bounded BUY/SELL recommendation.
///
/// Signals are ephemeral: produced by exactly one `evaluate` call, consumed
/// by a downstream execution component, and meaningless after `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    /// Unique signal id
    pub id: Uuid,
    /// Instrument symbol
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Strategy kind that produced the signal
    pub source: String,
    /// Qualitative strength
    pub strength: SignalStrength,
    /// Reference price the signal was computed at
    pub price: f64,
    /// Suggested stop-loss price
    pub stop_loss: Option<f64>,
    /// Suggested take-profit price
    pub take_profit: Option<f64>,
    /// Expected target price
    pub target_price: Option<f64>,
    /// Confidence in the range 0..=100
    pub confidence: f64,
    /// Human-readable rationale derived from the computed quantities
    pub reason: String,
    /// Id of the owning strategy instance
    pub strategy_id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time; the signal is void afterwards
    pub expires_at: DateTime<Utc>,
}

impl TradingSignal {
    /// Create a signal valid for `validity` from now.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        source: impl Into<String>,
        strength: SignalStrength,
        price: f64,
        confidence: f64,
        reason: impl Into<String>,
        strategy_id: impl Into<String>,
        validity: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            source: source.into(),
            strength,
            price,
            stop_loss: None,
            take_profit: None,
            target_price: None,
            confidence: confidence.clamp(0.0, 100.0),
            reason: reason.into(),
            strategy_id: strategy_id.into(),
            created_at: now,
            expires_at: now + validity,
        }
    }

    /// Attach a stop-loss price.
    pub fn with_stop_loss(mut self, price: f64) -> Self {
        self.stop_loss = Some(price);
        self
    }

    /// Attach a take-profit price.
    pub fn with_take_profit(mut self, price: f64) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// Attach a target price.
    pub fn with_target(mut self, price: f64) -> Self {
        self.target_price = Some(price);
        self
    }

    /// Whether the signal has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
