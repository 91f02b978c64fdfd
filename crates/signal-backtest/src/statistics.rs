//! Backtest statistics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use signal_core::types::Side;

/// Record of a single simulated fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Realized profit, set on closing trades only
    pub pnl: Option<Decimal>,
    /// Rationale copied from the originating signal
    pub reason: String,
}

/// Aggregate statistics collected over one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub total_return_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Decimal,
    /// Average profit per winning trade
    pub avg_win: Decimal,
    /// Average loss per losing trade
    pub avg_loss: Decimal,
    /// Gross profit / gross loss
    pub profit_factor: Decimal,
    pub bars_processed: usize,
    pub signals_seen: usize,
    pub equity_curve: Vec<(i64, Decimal)>,
    pub trades: Vec<TradeRecord>,
    peak_equity: Decimal,
}

impl BacktestStats {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            final_equity: initial_capital,
            total_return_pct: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            bars_processed: 0,
            signals_seen: 0,
            equity_curve: Vec::new(),
            trades: Vec::new(),
            peak_equity: initial_capital,
        }
    }

    /// Record mark-to-market equity after processing one bar.
    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) {
        self.equity_curve.push((timestamp, equity));

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * dec!(100);
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }

        self.bars_processed += 1;
    }

    pub fn add_trade(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
        self.total_trades += 1;
    }

    /// Derive the aggregate figures once the run is over.
    pub fn finalize(&mut self, final_equity: Decimal) {
        self.final_equity = final_equity;

        if self.initial_capital > Decimal::ZERO {
            self.total_return_pct =
                (self.final_equity - self.initial_capital) / self.initial_capital * dec!(100);
        }

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        for trade in &self.trades {
            if let Some(pnl) = trade.pnl {
                if pnl > Decimal::ZERO {
                    self.winning_trades += 1;
                    gross_profit += pnl;
                } else if pnl < Decimal::ZERO {
                    self.losing_trades += 1;
                    gross_loss += pnl.abs();
                }
            }
        }

        let closed = self.winning_trades + self.losing_trades;
        if closed > 0 {
            self.win_rate_pct = Decimal::from(self.winning_trades * 100) / Decimal::from(closed);
        }
        if self.winning_trades > 0 {
            self.avg_win = gross_profit / Decimal::from(self.winning_trades);
        }
        if self.losing_trades > 0 {
            self.avg_loss = gross_loss / Decimal::from(self.losing_trades);
        }
        if gross_loss > Decimal::ZERO {
            self.profit_factor = gross_profit / gross_loss;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: Option<Decimal>) -> TradeRecord {
        TradeRecord {
            symbol: "TEST".to_string(),
            side: Side::Sell,
            quantity: dec!(1),
            price: dec!(100),
            timestamp: Utc::now(),
            pnl,
            reason: String::new(),
        }
    }

    #[test]
    fn test_drawdown_tracks_peak() {
        let mut stats = BacktestStats::new(dec!(1000));
        stats.record_equity(0, dec!(1000));
        stats.record_equity(1, dec!(1200));
        stats.record_equity(2, dec!(900));
        stats.record_equity(3, dec!(1100));

        // 1200 -> 900 is a 25% drawdown.
        assert_eq!(stats.max_drawdown_pct, dec!(25));
        assert_eq!(stats.bars_processed, 4);
    }

    #[test]
    fn test_finalize_trade_breakdown() {
        let mut stats = BacktestStats::new(dec!(1000));
        stats.add_trade(trade(None)); // entry, no pnl
        stats.add_trade(trade(Some(dec!(30))));
        stats.add_trade(trade(Some(dec!(10))));
        stats.add_trade(trade(Some(dec!(-20))));
        stats.finalize(dec!(1020));

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        // 2 of 3 closed trades won.
        assert!(stats.win_rate_pct > dec!(66) && stats.win_rate_pct < dec!(67));
        assert_eq!(stats.avg_win, dec!(20));
        assert_eq!(stats.avg_loss, dec!(20));
        assert_eq!(stats.profit_factor, dec!(2));
        assert_eq!(stats.total_return_pct, dec!(2));
    }
}
