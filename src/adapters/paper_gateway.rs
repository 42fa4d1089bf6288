//! In-memory exchange gateway for dry runs.
//!
//! Records every call instead of talking to an exchange. Single-threaded by
//! construction (`RefCell`), matching the CLI's synchronous flow.

use std::cell::RefCell;

use crate::domain::error::TeletraderError;
use crate::domain::signal::MarginMode;
use crate::ports::gateway_port::{
    ExchangeGatewayPort, OrderHandle, OrderRequest, PositionInfo,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LeverageCall {
    pub symbol: String,
    pub leverage: u32,
    pub margin_mode: MarginMode,
}

#[derive(Default)]
pub struct PaperGateway {
    orders: RefCell<Vec<OrderRequest>>,
    leverage_calls: RefCell<Vec<LeverageCall>>,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.borrow().clone()
    }

    pub fn leverage_calls(&self) -> Vec<LeverageCall> {
        self.leverage_calls.borrow().clone()
    }
}

impl ExchangeGatewayPort for PaperGateway {
    fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> Result<(), TeletraderError> {
        self.leverage_calls.borrow_mut().push(LeverageCall {
            symbol: symbol.to_string(),
            leverage,
            margin_mode,
        });
        Ok(())
    }

    fn place_order(&self, request: &OrderRequest) -> Result<OrderHandle, TeletraderError> {
        let mut orders = self.orders.borrow_mut();
        orders.push(request.clone());
        Ok(OrderHandle {
            id: format!("paper-{}", orders.len()),
            symbol: request.symbol.clone(),
        })
    }

    fn positions(&self, _symbol: &str) -> Result<Vec<PositionInfo>, TeletraderError> {
        Ok(vec![])
    }
}
