//! Backtesting engine.
//!
//! Replays a candle sequence bar by bar against a strategy instance. Each
//! bar advances the feed cursor, runs one evaluation and fills any produced
//! signal at that bar's close with no slippage or partial fills. The
//! synthetic book is long-only: a BUY opens a position with all available
//! cash, a SELL closes it in full.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use signal_core::traits::{Evaluation, Strategy};
use signal_core::types::Side;
use tracing::debug;

use crate::replay::ReplayFeed;
use crate::report::BacktestReport;
use crate::statistics::{BacktestStats, TradeRecord};

/// Backtest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Starting cash
    pub initial_capital: Decimal,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
        }
    }
}

/// Bar-by-bar backtesting engine.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Replay the feed against `strategy` for one symbol.
    ///
    /// The strategy must have been created with this feed as its market-data
    /// collaborator, otherwise its evaluations see different prices than the
    /// fills.
    pub async fn run(
        &self,
        strategy: &dyn Strategy,
        feed: &ReplayFeed,
        symbol: &str,
    ) -> BacktestReport {
        let mut stats = BacktestStats::new(self.config.initial_capital);
        let mut cash = self.config.initial_capital;
        // Open long position: (entry_price, quantity)
        let mut position: Option<(Decimal, Decimal)> = None;
        let mut last_close = Decimal::ZERO;
        let mut last_timestamp = 0i64;

        for index in 0..feed.len() {
            feed.seek(index);
            let Some(bar) = feed.current().copied() else {
                break;
            };
            let close = Decimal::try_from(bar.close).unwrap_or(Decimal::ZERO);
            last_close = close;
            last_timestamp = bar.timestamp;

            let evaluation = strategy.evaluate(symbol).await;
            if let Evaluation::Signal(signal) = evaluation {
                stats.signals_seen += 1;

                match signal.side {
                    Side::Buy if position.is_none() && close > Decimal::ZERO => {
                        let quantity = cash / close;
                        cash = Decimal::ZERO;
                        position = Some((close, quantity));
                        stats.add_trade(TradeRecord {
                            symbol: symbol.to_string(),
                            side: Side::Buy,
                            quantity,
                            price: close,
                            timestamp: bar_time(bar.timestamp),
                            pnl: None,
                            reason: signal.reason.clone(),
                        });
                    }
                    Side::Sell => {
                        if let Some((entry, quantity)) = position.take() {
                            let pnl = (close - entry) * quantity;
                            cash += quantity * close;
                            stats.add_trade(TradeRecord {
                                symbol: symbol.to_string(),
                                side: Side::Sell,
                                quantity,
                                price: close,
                                timestamp: bar_time(bar.timestamp),
                                pnl: Some(pnl),
                                reason: signal.reason.clone(),
                            });
                        } else {
                            debug!(%symbol, "sell signal with no open position, skipped");
                        }
                    }
                    Side::Buy => {
                        debug!(%symbol, "buy signal while holding, skipped");
                    }
                }
            }

            let equity = cash
                + position
                    .map(|(_, quantity)| quantity * close)
                    .unwrap_or(Decimal::ZERO);
            stats.record_equity(bar.timestamp, equity);
        }

        // Liquidate anything still open at the last close.
        if let Some((entry, quantity)) = position.take() {
            let pnl = (last_close - entry) * quantity;
            cash += quantity * last_close;
            stats.add_trade(TradeRecord {
                symbol: symbol.to_string(),
                side: Side::Sell,
                quantity,
                price: last_close,
                timestamp: bar_time(last_timestamp),
                pnl: Some(pnl),
                reason: "End of data, position liquidated".to_string(),
            });
        }

        stats.finalize(cash);
        BacktestReport {
            config: self.config.clone(),
            stats,
        }
    }
}

fn bar_time(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp).unwrap_or_else(Utc::now)
}
