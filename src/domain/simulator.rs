//! Candle-replay backtest over parsed signals.
//!
//! Each intent is simulated independently against historical candles, but
//! position sizing uses the running balance, so trade order matters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::analyzer::{EquityPoint, PerformanceReport};
use super::candle::Candle;
use super::risk::{position_size, RiskParameters};
use super::settings::TradeSettings;
use super::signal::{Side, SignalIntent};
use crate::ports::market_data_port::MarketDataPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Target,
    StopLoss,
    Timeout,
}

/// One fully simulated trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeOutcome {
    pub coin: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_reason: ExitReason,
    pub size: f64,
    pub leverage: u32,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub duration_hours: f64,
}

/// Time range and candle interval of a backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: String,
}

impl BacktestWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        BacktestWindow {
            start,
            end,
            interval: "1h".to_string(),
        }
    }
}

/// Replay every intent against historical candles and aggregate the
/// outcomes into a performance report.
///
/// Intents missing a coin or entry zone are skipped, as are symbols whose
/// candle fetch fails or returns nothing; a backtest never aborts over a
/// single bad signal.
pub fn run_backtest(
    intents: &[SignalIntent],
    settings: &TradeSettings,
    initial_balance: f64,
    window: &BacktestWindow,
    market_data: &dyn MarketDataPort,
) -> PerformanceReport {
    let mut balance = initial_balance;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::new();

    for intent in intents {
        let Some(symbol) = intent.symbol() else {
            debug!("skipping intent without coin");
            continue;
        };
        if intent.entry_zone.is_empty() {
            debug!(symbol, "skipping intent without entry zone");
            continue;
        }

        let candles =
            match market_data.fetch_candles(&symbol, &window.interval, window.start, window.end) {
                Ok(candles) => candles,
                Err(err) => {
                    warn!(symbol, error = %err, "candle fetch failed, skipping signal");
                    continue;
                }
            };
        if candles.is_empty() {
            warn!(symbol, "no candles in window, skipping signal");
            continue;
        }

        let Some(outcome) = simulate_trade(intent, &symbol, &candles, settings, balance) else {
            continue;
        };

        balance += outcome.pnl;
        equity_curve.push(EquityPoint {
            timestamp: outcome.exit_time,
            balance,
            trade_pnl: outcome.pnl,
        });
        trades.push(outcome);
    }

    PerformanceReport::analyze(trades, equity_curve, initial_balance, balance)
}

/// Simulate a single intent. `None` when no entry level is ever touched or
/// when no candle remains after the entry fill.
fn simulate_trade(
    intent: &SignalIntent,
    symbol: &str,
    candles: &[Candle],
    settings: &TradeSettings,
    balance: f64,
) -> Option<TradeOutcome> {
    let side = intent.side?;

    let (entry_price, entry_time) = find_entry(candles, &intent.entry_zone)?;

    let after_entry: Vec<&Candle> = candles
        .iter()
        .filter(|c| c.timestamp > entry_time)
        .collect();
    if after_entry.is_empty() {
        debug!(symbol, "entry filled on final candle, no exit possible");
        return None;
    }

    let (exit_price, exit_time, exit_reason) =
        find_exit(side, &after_entry, &intent.targets, intent.stop_loss);

    let params = RiskParameters::balance_at_risk(balance, settings.risk_pct, settings.default_size);
    let size = position_size(&params, intent.entry_zone.first().copied(), intent.stop_loss);

    let price_change = match side {
        Side::Long => (exit_price - entry_price) / entry_price,
        Side::Short => (entry_price - exit_price) / entry_price,
    };
    let leverage = intent.leverage;
    let pnl = price_change * size * leverage as f64;

    Some(TradeOutcome {
        coin: intent.coin.clone().unwrap_or_default(),
        symbol: symbol.to_string(),
        side,
        entry_price,
        entry_time,
        exit_price,
        exit_time,
        exit_reason,
        size,
        leverage,
        pnl,
        pnl_pct: price_change * leverage as f64 * 100.0,
        duration_hours: (exit_time - entry_time).num_seconds() as f64 / 3600.0,
    })
}

/// First candle whose range covers any entry level; levels are tried in
/// list order within each candle.
fn find_entry(candles: &[Candle], entry_zone: &[f64]) -> Option<(f64, DateTime<Utc>)> {
    for candle in candles {
        for &price in entry_zone {
            if candle.touches(price) {
                return Some((price, candle.timestamp));
            }
        }
    }
    None
}

/// Walk candles after the entry fill. Within one candle the stop is checked
/// before any target. Falls back to a timeout exit at the final close.
fn find_exit(
    side: Side,
    candles: &[&Candle],
    targets: &[f64],
    stop_loss: Option<f64>,
) -> (f64, DateTime<Utc>, ExitReason) {
    for candle in candles {
        if let Some(stop) = stop_loss {
            let stopped = match side {
                Side::Long => candle.low <= stop,
                Side::Short => candle.high >= stop,
            };
            if stopped {
                return (stop, candle.timestamp, ExitReason::StopLoss);
            }
        }

        for &target in targets {
            let hit = match side {
                Side::Long => candle.high >= target,
                Side::Short => candle.low <= target,
            };
            if hit {
                return (target, candle.timestamp, ExitReason::Target);
            }
        }
    }

    let last = candles[candles.len() - 1];
    (last.close, last.timestamp, ExitReason::Timeout)
}
