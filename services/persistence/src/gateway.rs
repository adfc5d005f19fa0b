//! Persistence gateway interface
//!
//! The matching engine talks to storage exclusively through
//! [`PersistenceGateway`]. The atomic primitive is [`PersistenceGateway::apply`]:
//! every mutation produced by a single engine operation (the taker's order,
//! counterparty fill updates, and the trades between them) is committed as
//! one batch or not at all.

use crate::journal::JournalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::ids::{OrderId, Symbol};
use types::numeric::Quantity;
use types::order::{Order, OrderStatus};
use types::trade::Trade;

/// One mutation inside a write batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteOp {
    /// First persistence of a new order (any status).
    InsertOrder(Order),
    /// Fill-progress or cancellation update for an existing order.
    UpdateOrderFill {
        order_id: OrderId,
        filled_quantity: Quantity,
        status: OrderStatus,
        updated_at: i64,
    },
    /// Full-record replacement (order modification).
    ReplaceOrder(Order),
    /// Executed trades, in execution order.
    InsertTrades(Vec<Trade>),
}

/// All writes from one engine operation, committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(mut self, order: &Order) -> Self {
        self.ops.push(WriteOp::InsertOrder(order.clone()));
        self
    }

    pub fn update_order_fill(
        mut self,
        order_id: OrderId,
        filled_quantity: Quantity,
        status: OrderStatus,
        updated_at: i64,
    ) -> Self {
        self.ops.push(WriteOp::UpdateOrderFill {
            order_id,
            filled_quantity,
            status,
            updated_at,
        });
        self
    }

    pub fn replace_order(mut self, order: &Order) -> Self {
        self.ops.push(WriteOp::ReplaceOrder(order.clone()));
        self
    }

    pub fn insert_trades(mut self, trades: &[Trade]) -> Self {
        if !trades.is_empty() {
            self.ops.push(WriteOp::InsertTrades(trades.to_vec()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Duplicate order: {order_id}")]
    DuplicateOrder { order_id: OrderId },

    #[error("Unknown order: {order_id}")]
    UnknownOrder { order_id: OrderId },
}

/// Abstract writer and reader for order and trade records.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Commit a batch atomically: either every op is durable or none is.
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Fetch one order by id.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders for a user, newest first.
    async fn list_user_orders(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Trades, newest first, optionally restricted to one symbol.
    async fn list_trades(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
    ) -> Result<Vec<Trade>, StoreError>;

    /// Non-terminal orders in arrival order, for book rebuild at startup.
    async fn list_open_orders(&self) -> Result<Vec<Order>, StoreError>;

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.apply(WriteBatch::new().insert_order(order)).await
    }

    async fn update_order_fill(
        &self,
        order_id: OrderId,
        filled_quantity: Quantity,
        status: OrderStatus,
        updated_at: i64,
    ) -> Result<(), StoreError> {
        self.apply(WriteBatch::new().update_order_fill(
            order_id,
            filled_quantity,
            status,
            updated_at,
        ))
        .await
    }

    async fn insert_trades(&self, trades: &[Trade]) -> Result<(), StoreError> {
        self.apply(WriteBatch::new().insert_trades(trades)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::Price;
    use types::order::Side;

    fn sample_order() -> Order {
        Order::new(
            "alice",
            Symbol::new("AAPL"),
            Side::Buy,
            Quantity::new(100),
            Price::parse("150.00").unwrap(),
            1_708_123_456_789_000_000,
        )
    }

    #[test]
    fn test_batch_builder_collects_ops() {
        let order = sample_order();
        let batch = WriteBatch::new()
            .insert_order(&order)
            .update_order_fill(
                order.order_id,
                Quantity::new(40),
                OrderStatus::Partial,
                order.created_at + 1,
            );
        assert_eq!(batch.ops.len(), 2);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_empty_trade_slice_adds_no_op() {
        let batch = WriteBatch::new().insert_trades(&[]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_batch_serialization_roundtrip() {
        let order = sample_order();
        let batch = WriteBatch::new().insert_order(&order);
        let bytes = bincode::serialize(&batch).unwrap();
        let back: WriteBatch = bincode::deserialize(&bytes).unwrap();
        assert_eq!(batch, back);
    }
}
