//! Order lifecycle types

use crate::ids::{OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order status
///
/// `Filled` and `Cancelled` are terminal; no further transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted, nothing executed yet
    Pending,
    /// Partially executed, remainder resting
    Partial,
    /// Completely executed (terminal)
    Filled,
    /// Cancelled by the user (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Partial => "PARTIAL",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Authoritative order record
///
/// This is the persisted shape; the book keeps its own node wrapper with
/// the time-priority sequence attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Order {
    /// Create a new pending order
    pub fn new(
        user_id: impl Into<String>,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        price: Price,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id: user_id.into(),
            symbol,
            side,
            quantity,
            price,
            filled_quantity: Quantity::ZERO,
            status: OrderStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Quantity still open: `quantity - filled_quantity`
    pub fn remaining(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    /// Check quantity invariant: filled never exceeds total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity <= self.quantity
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// Record an execution against this order and adjust status
    ///
    /// # Panics
    /// Panics if the fill would exceed the order quantity
    pub fn apply_fill(&mut self, fill: Quantity, timestamp: i64) {
        let new_filled = self.filled_quantity + fill;
        assert!(
            new_filled <= self.quantity,
            "fill would exceed order quantity"
        );

        self.filled_quantity = new_filled;
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };
        self.updated_at = timestamp;
    }

    /// Cancel the order
    ///
    /// # Panics
    /// Panics if order is already in a terminal state
    pub fn cancel(&mut self, timestamp: i64) {
        assert!(!self.status.is_terminal(), "cannot cancel terminal order");
        self.status = OrderStatus::Cancelled;
        self.updated_at = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1_708_123_456_789_000_000;

    fn test_order() -> Order {
        Order::new(
            "alice",
            Symbol::new("AAPL"),
            Side::Buy,
            Quantity::new(100),
            Price::parse("150.00").unwrap(),
            TS,
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_side_wire_format() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        let side: Side = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(side, Side::Sell);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Partial.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_order_creation() {
        let order = test_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.remaining(), Quantity::new(100));
        assert!(order.check_invariant());
        assert!(!order.has_fills());
    }

    #[test]
    fn test_order_fill_transitions() {
        let mut order = test_order();

        order.apply_fill(Quantity::new(30), TS + 1);
        assert_eq!(order.status, OrderStatus::Partial);
        assert_eq!(order.remaining(), Quantity::new(70));

        order.apply_fill(Quantity::new(70), TS + 2);
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.remaining().is_zero());
        assert!(order.check_invariant());
    }

    #[test]
    #[should_panic(expected = "fill would exceed order quantity")]
    fn test_order_overfill_panics() {
        let mut order = test_order();
        order.apply_fill(Quantity::new(150), TS + 1);
    }

    #[test]
    fn test_order_cancel() {
        let mut order = test_order();
        order.cancel(TS + 1);
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.status.is_terminal());
    }

    #[test]
    #[should_panic(expected = "cannot cancel terminal order")]
    fn test_cancel_terminal_panics() {
        let mut order = test_order();
        order.apply_fill(Quantity::new(100), TS + 1);
        order.cancel(TS + 2);
    }

    #[test]
    fn test_order_serialization_roundtrip() {
        let order = test_order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
