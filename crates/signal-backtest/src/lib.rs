//! Bar-by-bar backtesting for strategy instances.

pub mod engine;
pub mod replay;
pub mod report;
pub mod statistics;

pub use engine::{BacktestConfig, BacktestEngine};
pub use replay::ReplayFeed;
pub use report::BacktestReport;
pub use statistics::{BacktestStats, TradeRecord};
