//! Binance klines REST adapter.
//!
//! Pulls historical candles from the public `/api/v3/klines` endpoint. No
//! API key is needed for market data.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::domain::candle::Candle;
use crate::domain::error::TeletraderError;
use crate::ports::market_data_port::MarketDataPort;

const MAINNET_URL: &str = "https://api.binance.com";
const KLINE_LIMIT: u32 = 1000;

#[derive(Debug)]
pub struct BinanceAdapter {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl BinanceAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        BinanceAdapter {
            base_url: base_url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn mainnet() -> Self {
        Self::new(MAINNET_URL)
    }
}

fn market_data_error(symbol: &str, reason: impl ToString) -> TeletraderError {
    TeletraderError::MarketData {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    }
}

/// One kline row as returned by Binance: open time in epoch milliseconds
/// followed by OHLC and volume encoded as strings.
fn kline_to_candle(row: &[Value], symbol: &str) -> Result<Candle, TeletraderError> {
    fn field_f64(row: &[Value], index: usize, symbol: &str) -> Result<f64, TeletraderError> {
        row.get(index)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| market_data_error(symbol, format!("bad kline field {}", index)))
    }

    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| market_data_error(symbol, "missing kline open time"))?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(open_time)
        .ok_or_else(|| market_data_error(symbol, format!("timestamp out of range: {}", open_time)))?;

    Ok(Candle {
        timestamp,
        open: field_f64(row, 1, symbol)?,
        high: field_f64(row, 2, symbol)?,
        low: field_f64(row, 3, symbol)?,
        close: field_f64(row, 4, symbol)?,
        volume: field_f64(row, 5, symbol)?,
    })
}

impl MarketDataPort for BinanceAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, TeletraderError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        debug!(symbol, interval, "fetching klines");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("startTime", &start.timestamp_millis().to_string()),
                ("endTime", &end.timestamp_millis().to_string()),
                ("limit", &KLINE_LIMIT.to_string()),
            ])
            .send()
            .map_err(|e| market_data_error(symbol, e))?;

        if !response.status().is_success() {
            return Err(market_data_error(
                symbol,
                format!("klines request returned {}", response.status()),
            ));
        }

        let rows: Vec<Vec<Value>> = response.json().map_err(|e| market_data_error(symbol, e))?;

        let mut candles = rows
            .iter()
            .map(|row| kline_to_candle(row, symbol))
            .collect::<Result<Vec<_>, _>>()?;
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}
