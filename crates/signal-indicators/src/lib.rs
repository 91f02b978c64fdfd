//! Technical indicators.
//!
//! Pure, stateless implementations of the indicators used by the strategy
//! variants:
//! - Moving averages (SMA, EMA)
//! - Momentum indicators (RSI, MACD, Stochastic)
//! - Volatility indicators (Bollinger Bands, Standard Deviation)
//!
//! Every indicator returns an output sequence aligned to the tail of its
//! input and an empty sequence for insufficient input.

pub mod momentum;
pub mod moving_average;
pub mod volatility;

pub use momentum::{Macd, MacdOutput, Rsi, Stochastic, StochasticOutput};
pub use moving_average::{Ema, Sma};
pub use volatility::{BollingerBands, BollingerOutput, StdDev};
