//! Domain error types.
//!
//! Parse failures are deliberately not represented here: they are soft and
//! recorded inside the produced [`SignalIntent`](super::signal::SignalIntent).

/// Top-level error type for teletrader.
#[derive(Debug, thiserror::Error)]
pub enum TeletraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid pattern rule for {field}: {reason}")]
    RuleInvalid { field: String, reason: String },

    #[error("market data error for {symbol}: {reason}")]
    MarketData { symbol: String, reason: String },

    #[error("no candle data for {symbol}")]
    NoData { symbol: String },

    #[error("gateway error: {reason}")]
    Gateway { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TeletraderError> for std::process::ExitCode {
    fn from(err: &TeletraderError) -> Self {
        let code: u8 = match err {
            TeletraderError::Io(_) => 1,
            TeletraderError::ConfigParse { .. }
            | TeletraderError::ConfigMissing { .. }
            | TeletraderError::ConfigInvalid { .. } => 2,
            TeletraderError::RuleInvalid { .. } => 3,
            TeletraderError::MarketData { .. } | TeletraderError::NoData { .. } => 4,
            TeletraderError::Gateway { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
