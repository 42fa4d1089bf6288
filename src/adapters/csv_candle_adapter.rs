//! CSV candle data adapter.
//!
//! Expects one file per symbol and interval, `{SYMBOL}_{interval}.csv`, with
//! a header row of `timestamp,open,high,low,close,volume` and epoch
//! milliseconds in the timestamp column.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;

use crate::domain::candle::Candle;
use crate::domain::error::TeletraderError;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Debug)]
pub struct CsvCandleAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvCandleAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }
}

fn row_to_candle(row: CandleRow, symbol: &str) -> Result<Candle, TeletraderError> {
    let timestamp = DateTime::<Utc>::from_timestamp_millis(row.timestamp).ok_or_else(|| {
        TeletraderError::MarketData {
            symbol: symbol.to_string(),
            reason: format!("timestamp out of range: {}", row.timestamp),
        }
    })?;
    Ok(Candle {
        timestamp,
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        volume: row.volume,
    })
}

impl MarketDataPort for CsvCandleAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, TeletraderError> {
        let path = self.csv_path(symbol, interval);
        let file = File::open(&path).map_err(|e| TeletraderError::MarketData {
            symbol: symbol.to_string(),
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(file);
        let mut candles = Vec::new();

        for result in rdr.deserialize::<CandleRow>() {
            let row = result.map_err(|e| TeletraderError::MarketData {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let candle = row_to_candle(row, symbol)?;

            if candle.timestamp < start || candle.timestamp > end {
                continue;
            }
            candles.push(candle);
        }

        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn epoch_ms(hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn setup() -> (TempDir, CsvCandleAdapter) {
        let dir = TempDir::new().unwrap();
        // Rows deliberately out of order
        let content = format!(
            "timestamp,open,high,low,close,volume\n\
             {},101.0,104.0,100.5,103.0,2000\n\
             {},100.0,102.0,99.0,101.0,1000\n\
             {},103.0,111.0,102.0,110.0,3000\n",
            epoch_ms(1),
            epoch_ms(0),
            epoch_ms(2),
        );
        fs::write(dir.path().join("BTCUSDT_1h.csv"), content).unwrap();

        let adapter = CsvCandleAdapter::new(dir.path().to_path_buf());
        (dir, adapter)
    }

    fn full_day() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap(),
        )
    }

    #[test]
    fn reads_and_sorts_candles() {
        let (_dir, adapter) = setup();
        let (start, end) = full_day();

        let candles = adapter.fetch_candles("BTCUSDT", "1h", start, end).unwrap();

        assert_eq!(candles.len(), 3);
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[2].high, 111.0);
    }

    #[test]
    fn filters_by_window_inclusively() {
        let (_dir, adapter) = setup();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();

        let candles = adapter.fetch_candles("BTCUSDT", "1h", start, end).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, start);
        assert_eq!(candles[1].timestamp, end);
    }

    #[test]
    fn missing_file_is_market_data_error() {
        let (_dir, adapter) = setup();
        let (start, end) = full_day();

        let err = adapter.fetch_candles("ETHUSDT", "1h", start, end).unwrap_err();
        assert!(matches!(err, TeletraderError::MarketData { .. }));
    }

    #[test]
    fn malformed_row_is_market_data_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BTCUSDT_1h.csv"),
            "timestamp,open,high,low,close,volume\nnot_a_number,1,2,3,4,5\n",
        )
        .unwrap();
        let adapter = CsvCandleAdapter::new(dir.path().to_path_buf());
        let (start, end) = full_day();

        let err = adapter.fetch_candles("BTCUSDT", "1h", start, end).unwrap_err();
        assert!(matches!(err, TeletraderError::MarketData { .. }));
    }

    #[test]
    fn interval_selects_different_file() {
        let (dir, adapter) = setup();
        fs::write(
            dir.path().join("BTCUSDT_4h.csv"),
            format!(
                "timestamp,open,high,low,close,volume\n{},1.0,2.0,0.5,1.5,10\n",
                epoch_ms(0)
            ),
        )
        .unwrap();
        let (start, end) = full_day();

        let candles = adapter.fetch_candles("BTCUSDT", "4h", start, end).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 1.5);
    }
}
