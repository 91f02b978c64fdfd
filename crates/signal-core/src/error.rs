//! Error types for the strategy evaluation engine.

use thiserror::Error;

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown strategy type: {0}")]
    UnknownType(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Symbol {symbol} is not configured for strategy {strategy}")]
    UnknownSymbol { strategy: String, symbol: String },

    #[error("Strategy is disposed")]
    Disposed,

    #[error("Strategy initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Strategy error: {0}")]
    Internal(String),
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Data source error: {0}")]
    Internal(String),
}

/// Indicator calculation errors.
///
/// Short input is not an error condition for indicators; it yields an empty
/// output series. These variants cover misuse such as a zero period.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
