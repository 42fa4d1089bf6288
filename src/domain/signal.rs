//! Structured trade intent produced by the signal interpreter.

use serde::{Deserialize, Serialize};

/// Default quote asset when a signal names only the base coin.
pub const DEFAULT_QUOTE: &str = "USDT";

/// Maximum number of entry-zone levels and target levels kept per signal.
pub const MAX_PRICE_LEVELS: usize = 5;

pub const MIN_LEVERAGE: u32 = 1;
pub const MAX_LEVERAGE: u32 = 100;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

/// Margin mode requested by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    Isolated,
    Cross,
}

/// Structured description of one trade alert.
///
/// Immutable once produced: re-parsing the same raw text yields a fresh
/// intent. Entry zone and targets are sorted ascending, deduplicated, and
/// capped at [`MAX_PRICE_LEVELS`]; leverage is always within
/// [[`MIN_LEVERAGE`], [`MAX_LEVERAGE`]].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalIntent {
    pub raw_text: String,
    pub coin: Option<String>,
    pub quote: String,
    pub side: Option<Side>,
    pub entry_zone: Vec<f64>,
    pub leverage: u32,
    pub margin_mode: MarginMode,
    pub targets: Vec<f64>,
    pub stop_loss: Option<f64>,
    pub parse_errors: Vec<String>,
}

impl SignalIntent {
    /// True when no parse errors were recorded.
    pub fn is_success(&self) -> bool {
        self.parse_errors.is_empty()
    }

    /// Exchange symbol, e.g. coin `BTC` with quote `USDT` gives `BTCUSDT`.
    pub fn symbol(&self) -> Option<String> {
        self.coin.as_ref().map(|c| format!("{}{}", c, self.quote))
    }
}
