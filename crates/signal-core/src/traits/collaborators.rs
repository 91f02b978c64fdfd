//! External collaborator trait definitions.
//!
//! The engine depends on these abstract interfaces only; concrete providers
//! (exchange clients, databases, notification channels) live elsewhere.

use crate::error::DataError;
use crate::types::{Candle, ClosedTrade, Timeframe, TradingSignal};
use async_trait::async_trait;

/// Market data provider.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Current price for a symbol.
    async fn quote(&self, symbol: &str) -> Result<f64, DataError>;

    /// The most recent `count` candles for a symbol, ordered oldest to
    /// newest. Fewer candles may be returned when less history exists.
    async fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError>;
}

/// Read-only persistence view used to derive strategy metrics.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Completed trades attributed to a strategy instance.
    async fn closed_trades(&self, strategy_id: &str) -> Result<Vec<ClosedTrade>, DataError>;
}

/// Optional fire-and-forget sink for produced signals.
///
/// Publication failures must not affect evaluation; implementations log and
/// swallow their own errors.
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// Deliver a produced signal to downstream consumers.
    async fn publish(&self, signal: &TradingSignal);
}
