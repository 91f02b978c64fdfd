//! OHLCV candle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::Timeframe;

/// One immutable OHLCV bar for a fixed timeframe.
///
/// Candles are produced by the market-data collaborator and consumed
/// read-only by indicators, detectors and strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix timestamp in milliseconds (open time)
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
}

impl Candle {
    /// Create a new candle.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// High-low range of the bar.
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// True if the bar closed above its open.
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// True if the bar closed below its open.
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// The timestamp as a `DateTime<Utc>`.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp)
            .unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap())
    }
}

/// Time-series container for candles of one (symbol, timeframe) pair.
///
/// Candles are held oldest to newest. When a capacity is set, pushing past it
/// drops the oldest candle.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    /// Instrument symbol
    pub symbol: String,
    /// Timeframe of the candles
    pub timeframe: Timeframe,
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleSeries {
    /// Create a new empty series.
    pub fn new(symbol: String, timeframe: Timeframe) -> Self {
        Self {
            symbol,
            timeframe,
            candles: VecDeque::new(),
            capacity: 0,
        }
    }

    /// Create a series with a maximum capacity (0 = unlimited).
    pub fn with_capacity(symbol: String, timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            symbol,
            timeframe,
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new candle, removing the oldest if at capacity.
    pub fn push(&mut self, candle: Candle) {
        if self.capacity > 0 && self.candles.len() >= self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    /// Push multiple candles.
    pub fn extend(&mut self, candles: impl IntoIterator<Item = Candle>) {
        for candle in candles {
            self.push(candle);
        }
    }

    /// Number of candles held.
    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// True if the series holds no candles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The most recent candle.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// The last N candles, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Candle> {
        let start = self.candles.len().saturating_sub(n);
        self.candles.iter().skip(start).copied().collect()
    }

    /// Candle by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// Close prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// High prices, oldest first.
    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    /// Low prices, oldest first.
    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    /// Volumes, oldest first.
    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Iterator over the candles, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }
}

impl FromIterator<Candle> for CandleSeries {
    fn from_iter<T: IntoIterator<Item = Candle>>(iter: T) -> Self {
        Self {
            symbol: String::new(),
            timeframe: Timeframe::Daily,
            candles: iter.into_iter().collect(),
            capacity: 0,
        }
    }
}
