//! INI file configuration adapter.

use configparser::ini::Ini;
use std::path::Path;

use crate::domain::error::TeletraderError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TeletraderError> {
        let mut config = Ini::new();
        config
            .load(&path)
            .map_err(|e| TeletraderError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TeletraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|e| TeletraderError::ConfigParse {
                file: "<inline>".to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[trading]
risk_pct = 2.5
default_size = 25
entry_distribution = 40, 35, 25

[backtest]
start_date = 2024-01-01
end_date = 2024-06-30
initial_balance = 5000.0

[data]
source = csv
csv_dir = ./candles
"#;

    #[test]
    fn from_string_parses_all_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();

        assert_eq!(adapter.get_double("trading", "risk_pct", 0.0), 2.5);
        assert_eq!(adapter.get_int("trading", "default_size", 0), 25);
        assert_eq!(
            adapter.get_string("trading", "entry_distribution"),
            Some("40, 35, 25".to_string())
        );
        assert_eq!(
            adapter.get_string("backtest", "start_date"),
            Some("2024-01-01".to_string())
        );
        assert_eq!(adapter.get_double("backtest", "initial_balance", 0.0), 5000.0);
        assert_eq!(adapter.get_string("data", "source"), Some("csv".to_string()));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[trading]\n").unwrap();
        assert_eq!(adapter.get_string("trading", "risk_pct"), None);
        assert_eq!(adapter.get_int("trading", "leverage", 7), 7);
        assert_eq!(adapter.get_double("trading", "risk_pct", 2.0), 2.0);
        assert!(adapter.get_bool("trading", "dry_run", true));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[trading]\nrisk_pct = lots\n").unwrap();
        assert_eq!(adapter.get_double("trading", "risk_pct", 2.0), 2.0);
        assert_eq!(adapter.get_int("trading", "risk_pct", 3), 3);
    }

    #[test]
    fn bool_value_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[flags]\na = yes\nb = 0\nc = TRUE\nd = maybe\n")
                .unwrap();
        assert!(adapter.get_bool("flags", "a", false));
        assert!(!adapter.get_bool("flags", "b", true));
        assert!(adapter.get_bool("flags", "c", false));
        // Unrecognized spelling keeps the default
        assert!(adapter.get_bool("flags", "d", true));
    }

    #[test]
    fn from_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("data", "csv_dir"), Some("./candles".to_string()));
    }

    #[test]
    fn from_file_missing_path_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/teletrader.ini").unwrap_err();
        assert!(matches!(err, TeletraderError::ConfigParse { .. }));
    }
}
