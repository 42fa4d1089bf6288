//! Market data access port trait.

use chrono::{DateTime, Utc};

use crate::domain::candle::Candle;
use crate::domain::error::TeletraderError;

pub trait MarketDataPort: std::fmt::Debug {
    /// Candles for `symbol` at `interval`, ascending by timestamp, bounded
    /// by `[start, end]` inclusive.
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, TeletraderError>;
}
