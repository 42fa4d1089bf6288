//! Performance analysis over a finished backtest.

use serde::Serialize;

use chrono::{DateTime, Utc};

use super::simulator::TradeOutcome;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// One point of the equity curve, recorded at each trade exit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
    pub trade_pnl: f64,
}

/// Full result of a backtest run: aggregate metrics plus the per-trade
/// outcomes and the equity curve they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_pnl: f64,
    pub total_pnl_pct: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percentage of trades with positive pnl, 0 when there are no trades.
    pub win_rate: f64,
    /// Worst peak-to-trough decline of the equity curve, as a percentage.
    pub max_drawdown: f64,
    /// Annualized mean/stddev of per-trade returns, 0 with fewer than two
    /// trades or zero variance.
    pub sharpe_ratio: f64,
    /// Gross profit over gross loss, 0 when there are no losing trades.
    pub profit_factor: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub average_trade: f64,
    pub trades: Vec<TradeOutcome>,
    pub equity_curve: Vec<EquityPoint>,
}

impl PerformanceReport {
    pub fn analyze(
        trades: Vec<TradeOutcome>,
        equity_curve: Vec<EquityPoint>,
        initial_balance: f64,
        final_balance: f64,
    ) -> PerformanceReport {
        let total_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
        let losing_trades = total_trades - winning_trades;

        let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.pnl <= 0.0)
            .map(|t| t.pnl.abs())
            .sum();

        let largest_win = trades.iter().map(|t| t.pnl).fold(0.0, f64::max);
        let largest_loss = trades.iter().map(|t| t.pnl).fold(0.0, f64::min);

        let total_pnl = final_balance - initial_balance;

        PerformanceReport {
            initial_balance,
            final_balance,
            total_pnl,
            total_pnl_pct: if initial_balance > 0.0 {
                total_pnl / initial_balance * 100.0
            } else {
                0.0
            },
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: if total_trades > 0 {
                winning_trades as f64 / total_trades as f64 * 100.0
            } else {
                0.0
            },
            max_drawdown: max_drawdown(initial_balance, &equity_curve),
            sharpe_ratio: sharpe_ratio(initial_balance, &equity_curve),
            profit_factor: if gross_loss > 0.0 {
                gross_profit / gross_loss
            } else {
                0.0
            },
            gross_profit,
            gross_loss,
            largest_win,
            largest_loss,
            average_trade: if total_trades > 0 {
                trades.iter().map(|t| t.pnl).sum::<f64>() / total_trades as f64
            } else {
                0.0
            },
            trades,
            equity_curve,
        }
    }
}

fn equity_values(initial_balance: f64, curve: &[EquityPoint]) -> Vec<f64> {
    let mut values = Vec::with_capacity(curve.len() + 1);
    values.push(initial_balance);
    values.extend(curve.iter().map(|p| p.balance));
    values
}

/// Worst percentage decline from any running peak of the equity series.
fn max_drawdown(initial_balance: f64, curve: &[EquityPoint]) -> f64 {
    let values = equity_values(initial_balance, curve);

    let mut peak = f64::MIN;
    let mut worst = 0.0f64;
    for &value in &values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak * 100.0;
            worst = worst.max(drawdown);
        }
    }
    worst
}

/// Per-period simple returns annualized by the square root of trading days.
/// Population standard deviation; zero when it is undefined or zero.
fn sharpe_ratio(initial_balance: f64, curve: &[EquityPoint]) -> f64 {
    let values = equity_values(initial_balance, curve);

    let returns: Vec<f64> = values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
