//! Trading strategy implementations.
//!
//! This crate provides the four strategy variants of the evaluation engine:
//! - Grid (level-crossing signals over a fixed price range)
//! - Trend-Following (MA cross / MACD histogram direction detection)
//! - Mean-Reversion (deviation from a rolling mean, several methods)
//! - Breakout (support/resistance breaks with confirmation filters)
//!
//! plus the [`StrategyFactory`] that creates, owns and destroys instances.

mod breakout;
mod factory;
mod grid;
mod mean_reversion;
mod trend;

pub use breakout::{BreakoutConfig, BreakoutStrategy, LevelMethod};
pub use factory::{RiskTier, StrategyDescriptor, StrategyFactory};
pub use grid::{GridConfig, GridMode, GridStrategy};
pub use mean_reversion::{DeviationMethod, MeanReversionConfig, MeanReversionStrategy};
pub use trend::{TrendConfig, TrendDirection, TrendMethod, TrendStrategy};
