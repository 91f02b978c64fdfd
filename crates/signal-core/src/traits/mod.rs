//! Core traits for the strategy evaluation engine.

mod collaborators;
mod indicator;
mod strategy;

pub use collaborators::{MarketData, SignalSink, TradeStore};
pub use indicator::{CandleIndicator, Indicator, MultiOutputIndicator};
pub use strategy::{Evaluation, Strategy, StrategyConfig, StrategyStatus};
