//! Core types and traits for the strategy evaluation engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Candle, CandleSeries, Timeframe)
//! - Trading signals and strategy metrics
//! - Trait seams for strategies, indicators and external collaborators

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
