//! Price level with FIFO time priority
//!
//! A price level holds every resting order at one price on one side.
//! Queue position is fixed at insertion: nodes carry the book's
//! monotonic sequence, and within a level earlier sequences always sit
//! closer to the front.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus};

/// A resting order plus the sequence that fixes its time priority.
#[derive(Debug, Clone)]
pub struct OrderNode {
    pub order: Order,
    pub sequence: u64,
}

impl OrderNode {
    pub fn remaining(&self) -> Quantity {
        self.order.remaining()
    }
}

/// FIFO queue of order nodes at a single price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Price,
    orders: VecDeque<OrderNode>,
    /// Sum of `remaining` across queued nodes.
    total_quantity: Quantity,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_quantity: Quantity::ZERO,
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// Append a node at the back of the queue (lowest time priority).
    pub fn push_back(&mut self, node: OrderNode) {
        self.total_quantity = self.total_quantity + node.remaining();
        self.orders.push_back(node);
    }

    /// Peek the node with the highest time priority.
    pub fn front(&self) -> Option<&OrderNode> {
        self.orders.front()
    }

    /// Execute `fill` units against the front node.
    ///
    /// Returns the maker's updated order record; a completely filled
    /// node is dequeued.
    pub fn fill_front(&mut self, fill: Quantity, timestamp: i64) -> Option<Order> {
        let node = self.orders.front_mut()?;
        node.order.apply_fill(fill, timestamp);
        self.total_quantity = self.total_quantity - fill;

        let order = node.order.clone();
        if order.is_filled() {
            self.orders.pop_front();
        }
        Some(order)
    }

    /// Remove a queued node by id, regardless of its position.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<OrderNode> {
        let idx = self
            .orders
            .iter()
            .position(|n| &n.order.order_id == order_id)?;
        let node = self.orders.remove(idx)?;
        self.total_quantity = self.total_quantity - node.remaining();
        Some(node)
    }

    /// Shrink a queued order to `new_quantity` without touching its
    /// queue position.
    ///
    /// The caller guarantees `filled_quantity <= new_quantity <= quantity`.
    /// Shrinking exactly to the filled quantity completes the order: it
    /// becomes FILLED and leaves the queue.
    pub fn reduce_order(
        &mut self,
        order_id: &OrderId,
        new_quantity: Quantity,
        timestamp: i64,
    ) -> Option<Order> {
        let idx = self
            .orders
            .iter()
            .position(|n| &n.order.order_id == order_id)?;
        let node = &mut self.orders[idx];
        debug_assert!(
            new_quantity >= node.order.filled_quantity && new_quantity <= node.order.quantity,
            "reduce_order bounds checked by caller"
        );

        let released = node.order.remaining() - (new_quantity - node.order.filled_quantity);
        node.order.quantity = new_quantity;
        node.order.updated_at = timestamp;
        self.total_quantity = self.total_quantity - released;

        if node.order.remaining().is_zero() {
            node.order.status = OrderStatus::Filled;
            return self.orders.remove(idx).map(|n| n.order);
        }
        Some(node.order.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderNode> {
        self.orders.iter()
    }
}
