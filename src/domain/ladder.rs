//! Order ladder construction: DCA entries, take-profit ladder, stop order.

use serde::{Deserialize, Serialize};

use super::signal::{Side, SignalIntent};

/// Exchange-facing order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn flipped(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Side of the orders that open a position.
pub fn opening_side(side: Side) -> OrderSide {
    match side {
        Side::Long => OrderSide::Buy,
        Side::Short => OrderSide::Sell,
    }
}

/// One rung of a ladder: a price level and the size allocated to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStep {
    pub price: f64,
    pub size: f64,
    pub side: OrderSide,
    pub reduce_only: bool,
}

/// The complete order plan for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLadder {
    pub entries: Vec<OrderStep>,
    pub targets: Vec<OrderStep>,
    pub stop: Option<OrderStep>,
}

/// Size-fraction percentages applied across ladder steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Distributions {
    pub entry: Vec<f64>,
    pub target: Vec<f64>,
}

impl Default for Distributions {
    fn default() -> Self {
        Distributions {
            entry: vec![40.0, 35.0, 25.0],
            target: vec![50.0, 30.0, 20.0],
        }
    }
}

/// Entry orders, side-aligned with the position direction.
///
/// Uses the first `min(len(prices), len(distribution))` steps; step `i`
/// receives `total_size * distribution[i] / 100` at `prices[i]`.
pub fn build_entry_ladder(
    side: Side,
    prices: &[f64],
    total_size: f64,
    distribution: &[f64],
) -> Vec<OrderStep> {
    let order_side = opening_side(side);
    let steps = prices.len().min(distribution.len());

    (0..steps)
        .map(|i| OrderStep {
            price: prices[i],
            size: total_size * distribution[i] / 100.0,
            side: order_side,
            reduce_only: false,
        })
        .collect()
}

/// Take-profit orders: direction flipped relative to entries, reduce-only.
pub fn build_target_ladder(
    side: Side,
    prices: &[f64],
    total_size: f64,
    distribution: &[f64],
) -> Vec<OrderStep> {
    let order_side = opening_side(side).flipped();
    let steps = prices.len().min(distribution.len());

    (0..steps)
        .map(|i| OrderStep {
            price: prices[i],
            size: total_size * distribution[i] / 100.0,
            side: order_side,
            reduce_only: true,
        })
        .collect()
}

/// Single reduce-only stop order for the full remaining size, or `None`
/// when the signal carries no stop price.
pub fn build_stop_order(side: Side, stop_price: Option<f64>, total_size: f64) -> Option<OrderStep> {
    stop_price.map(|price| OrderStep {
        price,
        size: total_size,
        side: opening_side(side).flipped(),
        reduce_only: true,
    })
}

impl OrderLadder {
    /// Build all three ladders for an intent. `None` when the intent has
    /// no position side.
    pub fn for_intent(
        intent: &SignalIntent,
        total_size: f64,
        distributions: &Distributions,
    ) -> Option<OrderLadder> {
        let side = intent.side?;
        Some(OrderLadder {
            entries: build_entry_ladder(side, &intent.entry_zone, total_size, &distributions.entry),
            targets: build_target_ladder(side, &intent.targets, total_size, &distributions.target),
            stop: build_stop_order(side, intent.stop_loss, total_size),
        })
    }
}
