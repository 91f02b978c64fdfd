//! Strategy performance metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed round-trip trade, as recorded by the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// Instrument symbol
    pub symbol: String,
    /// Entry fill price
    pub entry_price: f64,
    /// Exit fill price
    pub exit_price: f64,
    /// Traded quantity
    pub quantity: f64,
    /// Realized profit and loss
    pub pnl: f64,
    /// Entry time
    pub opened_at: DateTime<Utc>,
    /// Exit time
    pub closed_at: DateTime<Utc>,
}

/// Performance metrics derived from completed trade history.
///
/// Recomputed on demand; never persisted by the engine itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyMetrics {
    /// Number of evaluate calls performed
    pub evaluations: u64,
    /// Number of signals emitted
    pub signals_generated: u64,
    /// Number of completed trades
    pub total_trades: usize,
    /// Trades with positive P&L
    pub winning_trades: usize,
    /// Trades with negative P&L
    pub losing_trades: usize,
    /// Win rate percentage over completed trades
    pub win_rate_pct: f64,
    /// Sum of realized P&L
    pub total_pnl: f64,
    /// Mean realized P&L per trade
    pub avg_pnl: f64,
}

impl StrategyMetrics {
    /// Derive trade statistics from completed trades, keeping the given
    /// evaluation counters.
    pub fn from_trades(trades: &[ClosedTrade], evaluations: u64, signals: u64) -> Self {
        let total_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
        let losing_trades = trades.iter().filter(|t| t.pnl < 0.0).count();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();

        let win_rate_pct = if total_trades > 0 {
            winning_trades as f64 * 100.0 / total_trades as f64
        } else {
            0.0
        };
        let avg_pnl = if total_trades > 0 {
            total_pnl / total_trades as f64
        } else {
            0.0
        };

        Self {
            evaluations,
            signals_generated: signals,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate_pct,
            total_pnl,
            avg_pnl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: f64) -> ClosedTrade {
        ClosedTrade {
            symbol: "BTCUSDT".to_string(),
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            quantity: 1.0,
            pnl,
            opened_at: Utc::now(),
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_metrics_from_trades() {
        let trades = vec![trade(10.0), trade(-5.0), trade(20.0), trade(-1.0)];
        let metrics = StrategyMetrics::from_trades(&trades, 100, 4);

        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 2);
        assert!((metrics.win_rate_pct - 50.0).abs() < 1e-10);
        assert!((metrics.total_pnl - 24.0).abs() < 1e-10);
        assert!((metrics.avg_pnl - 6.0).abs() < 1e-10);
        assert_eq!(metrics.evaluations, 100);
    }

    #[test]
    fn test_metrics_empty_history() {
        let metrics = StrategyMetrics::from_trades(&[], 3, 0);
        assert_eq!(metrics.total_trades, 0);
        assert!((metrics.win_rate_pct).abs() < f64::EPSILON);
    }
}
