//! Historical candle replay behind the market-data interface.

use async_trait::async_trait;
use signal_core::error::DataError;
use signal_core::traits::MarketData;
use signal_core::types::{Candle, Timeframe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`MarketData`] implementation that replays a fixed candle sequence.
///
/// A cursor marks the "current" bar; `quote` answers with its close and
/// `candles` only ever exposes history up to and including it, so a strategy
/// under test sees exactly what it would have seen live.
pub struct ReplayFeed {
    symbol: String,
    candles: Vec<Candle>,
    cursor: AtomicUsize,
}

impl ReplayFeed {
    /// Wrap a candle sequence ordered oldest to newest.
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            candles,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of bars in the feed.
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Move the cursor to bar `index`.
    pub fn seek(&self, index: usize) {
        self.cursor.store(index, Ordering::Relaxed);
    }

    /// The bar at the cursor, if the feed is non-empty.
    pub fn current(&self) -> Option<&Candle> {
        self.candles.get(self.cursor.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl MarketData for ReplayFeed {
    async fn quote(&self, symbol: &str) -> Result<f64, DataError> {
        if symbol != self.symbol {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        self.current()
            .map(|c| c.close)
            .ok_or(DataError::NoDataAvailable)
    }

    async fn candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        if symbol != self.symbol {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }

        let end = (self.cursor.load(Ordering::Relaxed) + 1).min(self.candles.len());
        let start = end.saturating_sub(count);
        Ok(self.candles[start..end].to_vec())
    }
}
