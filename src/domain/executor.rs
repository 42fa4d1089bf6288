//! Live order placement for one parsed signal.
//!
//! Orders are placed independently: a rejected rung is recorded and the
//! remaining rungs are still attempted, so a partial ladder on the exchange
//! is always visible in the result rather than silently dropped.

use serde::Serialize;
use tracing::{info, warn};

use super::ladder::{OrderLadder, OrderStep};
use super::risk::{position_size, RiskParameters};
use super::settings::TradeSettings;
use super::signal::SignalIntent;
use crate::ports::gateway_port::{ExchangeGatewayPort, OrderHandle, OrderRequest, OrderType};

/// Result of one order placement attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOutcome {
    Placed(OrderHandle),
    Failed { reason: String },
}

impl OrderOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, OrderOutcome::Placed(_))
    }
}

/// Everything that happened while executing one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Whether the placement flow ran to completion. Individual orders may
    /// still have failed; check [`ExecutionResult::fully_placed`].
    pub success: bool,
    pub symbol: Option<String>,
    pub position_size: f64,
    pub leverage: u32,
    pub entry_orders: Vec<OrderOutcome>,
    pub target_orders: Vec<OrderOutcome>,
    pub stop_order: Option<OrderOutcome>,
    pub error: Option<String>,
}

impl ExecutionResult {
    fn failure(symbol: Option<String>, error: String) -> Self {
        ExecutionResult {
            success: false,
            symbol,
            position_size: 0.0,
            leverage: 0,
            entry_orders: vec![],
            target_orders: vec![],
            stop_order: None,
            error: Some(error),
        }
    }

    /// True when every attempted order was accepted by the exchange.
    pub fn fully_placed(&self) -> bool {
        self.success
            && self.entry_orders.iter().all(OrderOutcome::is_placed)
            && self.target_orders.iter().all(OrderOutcome::is_placed)
            && self.stop_order.as_ref().is_none_or(OrderOutcome::is_placed)
    }
}

/// Place the full order ladder for one intent on the exchange.
pub fn execute(
    intent: &SignalIntent,
    settings: &TradeSettings,
    gateway: &dyn ExchangeGatewayPort,
) -> ExecutionResult {
    let Some(symbol) = intent.symbol() else {
        return ExecutionResult::failure(None, "signal has no coin symbol".to_string());
    };
    if intent.side.is_none() {
        return ExecutionResult::failure(Some(symbol), "signal has no position side".to_string());
    }
    if intent.entry_zone.is_empty() {
        return ExecutionResult::failure(Some(symbol), "signal has no entry zone".to_string());
    }

    if let Err(err) = gateway.set_leverage(&symbol, intent.leverage, intent.margin_mode) {
        return ExecutionResult::failure(Some(symbol), err.to_string());
    }

    let params = RiskParameters::base_multiplier(settings.risk_pct, settings.default_size);
    let size = position_size(&params, intent.entry_zone.first().copied(), intent.stop_loss);

    // Side is present, so the ladder always builds
    let Some(ladder) = OrderLadder::for_intent(intent, size, &settings.distributions) else {
        return ExecutionResult::failure(Some(symbol), "signal has no position side".to_string());
    };

    let entry_orders: Vec<OrderOutcome> = ladder
        .entries
        .iter()
        .map(|step| place_step(gateway, &symbol, step, OrderType::Limit))
        .collect();
    let target_orders: Vec<OrderOutcome> = ladder
        .targets
        .iter()
        .map(|step| place_step(gateway, &symbol, step, OrderType::Limit))
        .collect();
    let stop_order = ladder
        .stop
        .as_ref()
        .map(|step| place_step(gateway, &symbol, step, OrderType::StopMarket));

    let result = ExecutionResult {
        success: true,
        symbol: Some(symbol),
        position_size: size,
        leverage: intent.leverage,
        entry_orders,
        target_orders,
        stop_order,
        error: None,
    };
    info!(
        symbol = result.symbol.as_deref().unwrap_or("?"),
        fully_placed = result.fully_placed(),
        "execution complete"
    );
    result
}

fn place_step(
    gateway: &dyn ExchangeGatewayPort,
    symbol: &str,
    step: &OrderStep,
    order_type: OrderType,
) -> OrderOutcome {
    let request = OrderRequest {
        symbol: symbol.to_string(),
        side: step.side,
        order_type,
        size: step.size,
        price: Some(step.price),
        reduce_only: step.reduce_only,
    };
    match gateway.place_order(&request) {
        Ok(handle) => OrderOutcome::Placed(handle),
        Err(err) => {
            warn!(symbol, price = step.price, error = %err, "order rejected");
            OrderOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}
