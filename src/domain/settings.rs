//! Trading settings shared by the simulator and the executor.

use super::error::TeletraderError;
use super::ladder::Distributions;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeSettings {
    pub risk_pct: f64,
    pub default_size: f64,
    pub distributions: Distributions,
}

impl Default for TradeSettings {
    fn default() -> Self {
        TradeSettings {
            risk_pct: 2.0,
            default_size: 10.0,
            distributions: Distributions::default(),
        }
    }
}

/// Parse a comma-separated percentage list such as `40, 35, 25`.
pub fn parse_distribution(value: &str) -> Result<Vec<f64>, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| format!("invalid percentage: {}", s))
        })
        .collect::<Result<_, _>>()?;

    if parts.is_empty() {
        return Err("distribution must list at least one percentage".to_string());
    }
    Ok(parts)
}

pub fn validate_settings(settings: &TradeSettings) -> Result<(), TeletraderError> {
    if settings.risk_pct <= 0.0 || settings.risk_pct > 100.0 {
        return Err(invalid("risk_pct", "risk_pct must be in (0, 100]"));
    }
    if settings.default_size <= 0.0 {
        return Err(invalid("default_size", "default_size must be positive"));
    }
    validate_distribution("entry_distribution", &settings.distributions.entry)?;
    validate_distribution("target_distribution", &settings.distributions.target)?;
    Ok(())
}

fn validate_distribution(key: &str, distribution: &[f64]) -> Result<(), TeletraderError> {
    if distribution.is_empty() {
        return Err(invalid(key, "distribution must not be empty"));
    }
    if distribution.iter().any(|&p| p <= 0.0) {
        return Err(invalid(key, "percentages must be positive"));
    }
    let sum: f64 = distribution.iter().sum();
    if sum > 100.0 + 1e-9 {
        return Err(invalid(key, "percentages must not sum above 100"));
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> TeletraderError {
    TeletraderError::ConfigInvalid {
        section: "trading".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
