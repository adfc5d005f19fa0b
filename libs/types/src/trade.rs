//! Trade execution types

use crate::ids::{OrderId, Symbol, TradeId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed match between a resting and an incoming order
///
/// The price is always the resting (maker) order's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub price: Price,
    pub executed_at: i64, // Unix nanos
}

impl Trade {
    /// Create a new trade with a fresh id
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        symbol: Symbol,
        quantity: Quantity,
        price: Price,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            buy_order_id,
            sell_order_id,
            symbol,
            quantity,
            price,
            executed_at,
        }
    }

    /// Notional value (price × quantity)
    pub fn trade_value(&self) -> Decimal {
        self.price.as_decimal() * Decimal::from(self.quantity.as_u64())
    }
}
