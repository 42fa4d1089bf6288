//! Exchange gateway port trait and its wire-level order types.

use serde::{Deserialize, Serialize};

use crate::domain::error::TeletraderError;
use crate::domain::ladder::OrderSide;
use crate::domain::signal::MarginMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
    StopMarket,
}

/// One order as handed to the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub size: f64,
    /// Limit or trigger price; `None` for plain market orders.
    pub price: Option<f64>,
    pub reduce_only: bool,
}

/// Exchange acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub id: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
    pub leverage: u32,
}

pub trait ExchangeGatewayPort {
    fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> Result<(), TeletraderError>;

    fn place_order(&self, request: &OrderRequest) -> Result<OrderHandle, TeletraderError>;

    fn positions(&self, symbol: &str) -> Result<Vec<PositionInfo>, TeletraderError>;
}
