//! Command implementations.

pub mod backtest;
pub mod scan;
pub mod strategies;
