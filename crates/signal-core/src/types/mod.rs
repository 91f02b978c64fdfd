//! Core data types for the strategy evaluation engine.

mod candle;
mod metrics;
mod signal;
mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use metrics::{ClosedTrade, StrategyMetrics};
pub use signal::{Side, SignalStrength, TradingSignal};
pub use timeframe::Timeframe;
