//! Risk-based position sizing.
//!
//! Two distinct policies, kept separately named rather than unified: the
//! simulator sizes against the account balance, live execution scales a base
//! order size. Collapsing them would silently change simulated vs. live
//! sizing behavior (see DESIGN.md).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    /// Size so that hitting the stop costs `balance * risk_pct / 100`,
    /// capped at 20% of balance. Fallback: `min(default_size, balance * 0.1)`.
    BalanceAtRisk,
    /// Scale `default_size` by risked fraction over risk-per-unit, capped at
    /// five times the base size. Fallback: `default_size`.
    BaseMultiplier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskParameters {
    pub balance: f64,
    pub risk_pct: f64,
    pub default_size: f64,
    pub policy: SizePolicy,
}

impl RiskParameters {
    pub fn balance_at_risk(balance: f64, risk_pct: f64, default_size: f64) -> Self {
        RiskParameters {
            balance,
            risk_pct,
            default_size,
            policy: SizePolicy::BalanceAtRisk,
        }
    }

    /// Balance is not consulted by the base-multiplier policy.
    pub fn base_multiplier(risk_pct: f64, default_size: f64) -> Self {
        RiskParameters {
            balance: 0.0,
            risk_pct,
            default_size,
            policy: SizePolicy::BaseMultiplier,
        }
    }
}

/// Compute a position size from entry and stop prices.
///
/// A missing or non-positive entry/stop yields the policy's fallback size
/// rather than an error.
pub fn position_size(params: &RiskParameters, entry: Option<f64>, stop: Option<f64>) -> f64 {
    let fallback = match params.policy {
        SizePolicy::BalanceAtRisk => params.default_size.min(params.balance * 0.1),
        SizePolicy::BaseMultiplier => params.default_size,
    };

    let (entry, stop) = match (entry, stop) {
        (Some(e), Some(s)) if e > 0.0 && s > 0.0 => (e, s),
        _ => return fallback,
    };

    let risk_per_unit = (entry - stop).abs() / entry;
    if risk_per_unit <= 0.0 {
        return fallback;
    }

    match params.policy {
        SizePolicy::BalanceAtRisk => {
            let risk_amount = params.balance * params.risk_pct / 100.0;
            (risk_amount / risk_per_unit).min(params.balance * 0.2)
        }
        SizePolicy::BaseMultiplier => {
            let size = (params.risk_pct / 100.0) / risk_per_unit * params.default_size;
            size.min(params.default_size * 5.0)
        }
    }
}
