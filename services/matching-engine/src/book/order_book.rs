//! Per-symbol order book with price-time priority matching
//!
//! The book owns both sides, an id index for O(1) level lookup on
//! cancel/modify, and the sequence counter that fixes time priority.
//! It is not synchronized; the engine serializes access per symbol.

use std::collections::HashMap;
use types::errors::OrderError;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Trade;

use super::ask_book::AskBook;
use super::bid_book::BidBook;
use super::price_level::OrderNode;

/// Whether the book may match two orders from the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfTradePolicy {
    /// Same-user matches execute like any other (default).
    #[default]
    Allow,
    /// A same-user match aborts the incoming operation.
    Reject,
}

/// Result of a submit or modify: the final taker record, the trades it
/// produced in execution order, and the counterparty records they updated.
#[derive(Debug, Clone)]
pub struct Submission {
    pub order: Order,
    pub trades: Vec<Trade>,
    pub maker_updates: Vec<Order>,
}

/// True when an incoming order at `incoming_price` crosses a resting
/// order at `resting_price`.
fn crosses(incoming_side: Side, incoming_price: Price, resting_price: Price) -> bool {
    match incoming_side {
        Side::Buy => incoming_price >= resting_price,
        Side::Sell => incoming_price <= resting_price,
    }
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: Symbol,
    bids: BidBook,
    asks: AskBook,
    /// Resting order locations: id → (side, level price).
    locations: HashMap<OrderId, (Side, Price)>,
    next_sequence: u64,
    last_trade_price: Option<Price>,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BidBook::new(),
            asks: AskBook::new(),
            locations: HashMap::new(),
            next_sequence: 1,
            last_trade_price: None,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Match a new order against the opposite side, resting any residual.
    pub fn submit(
        &mut self,
        order: Order,
        policy: SelfTradePolicy,
        timestamp: i64,
    ) -> Result<Submission, OrderError> {
        if self.locations.contains_key(&order.order_id) {
            return Err(OrderError::Duplicate {
                order_id: order.order_id.to_string(),
            });
        }
        debug_assert_eq!(&order.symbol, &self.symbol);
        self.execute(order, policy, timestamp)
    }

    fn execute(
        &mut self,
        mut order: Order,
        policy: SelfTradePolicy,
        timestamp: i64,
    ) -> Result<Submission, OrderError> {
        let (trades, maker_updates) = self.match_incoming(&mut order, policy, timestamp)?;
        if !order.remaining().is_zero() {
            self.rest(order.clone());
        }
        Ok(Submission {
            order,
            trades,
            maker_updates,
        })
    }

    /// The matching loop. Executes while the best opposite level crosses
    /// the incoming limit, always at the resting (maker) price, draining
    /// makers front-to-back.
    fn match_incoming(
        &mut self,
        order: &mut Order,
        policy: SelfTradePolicy,
        timestamp: i64,
    ) -> Result<(Vec<Trade>, Vec<Order>), OrderError> {
        let mut trades = Vec::new();
        let mut maker_updates = Vec::new();

        while !order.remaining().is_zero() {
            let best = match order.side {
                Side::Buy => self.asks.best_price(),
                Side::Sell => self.bids.best_price(),
            };
            let Some(best_price) = best else { break };
            if !crosses(order.side, order.price, best_price) {
                break;
            }

            let level = match order.side {
                Side::Buy => self.asks.level_mut(best_price),
                Side::Sell => self.bids.level_mut(best_price),
            }
            .expect("best price always names a live level");

            let front = level.front().expect("levels are never left empty");
            if policy == SelfTradePolicy::Reject && front.order.user_id == order.user_id {
                return Err(OrderError::SelfTrade {
                    user_id: order.user_id.clone(),
                });
            }

            let fill = order.remaining().min(front.remaining());
            let maker = level
                .fill_front(fill, timestamp)
                .expect("front checked above");
            order.apply_fill(fill, timestamp);

            let (buy_order_id, sell_order_id) = match order.side {
                Side::Buy => (order.order_id, maker.order_id),
                Side::Sell => (maker.order_id, order.order_id),
            };
            trades.push(Trade::new(
                buy_order_id,
                sell_order_id,
                self.symbol.clone(),
                fill,
                best_price, // maker's price
                timestamp,
            ));
            self.last_trade_price = Some(best_price);

            if maker.is_filled() {
                self.locations.remove(&maker.order_id);
            }
            maker_updates.push(maker);

            match order.side {
                Side::Buy => self.asks.prune_level(best_price),
                Side::Sell => self.bids.prune_level(best_price),
            }
        }

        Ok((trades, maker_updates))
    }

    fn rest(&mut self, order: Order) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let side = order.side;
        let price = order.price;
        let order_id = order.order_id;
        let node = OrderNode { order, sequence };
        match side {
            Side::Buy => self.bids.insert(node),
            Side::Sell => self.asks.insert(node),
        }
        self.locations.insert(order_id, (side, price));
    }

    /// Remove a resting order. Terminal or unknown orders are NOT_FOUND:
    /// a filled or already-cancelled order has left the book.
    pub fn cancel(&mut self, order_id: &OrderId, timestamp: i64) -> Result<Order, OrderError> {
        let (side, price) = self
            .locations
            .remove(order_id)
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;
        let node = match side {
            Side::Buy => self.bids.remove(order_id, price),
            Side::Sell => self.asks.remove(order_id, price),
        }
        .expect("location index out of sync with book");

        let mut order = node.order;
        order.cancel(timestamp);
        Ok(order)
    }

    /// Modify a resting order.
    ///
    /// A price change or a quantity increase forfeits time priority: the
    /// node is pulled and resubmitted (re-running the match). A quantity
    /// reduction down to no less than the filled quantity shrinks the
    /// node in place, keeping its sequence. Reducing exactly to the
    /// filled quantity completes the order.
    pub fn modify(
        &mut self,
        order_id: &OrderId,
        new_quantity: Option<Quantity>,
        new_price: Option<Price>,
        policy: SelfTradePolicy,
        timestamp: i64,
    ) -> Result<Submission, OrderError> {
        let (side, price) = *self
            .locations
            .get(order_id)
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;

        let (current_quantity, filled_quantity) = {
            let level = match side {
                Side::Buy => self.bids.level(price),
                Side::Sell => self.asks.level(price),
            }
            .expect("location index out of sync with book");
            let node = level
                .iter()
                .find(|n| &n.order.order_id == order_id)
                .expect("location index out of sync with book");
            (node.order.quantity, node.order.filled_quantity)
        };

        if let Some(q) = new_quantity {
            if q < filled_quantity {
                return Err(OrderError::InvalidModify(format!(
                    "new quantity {} is below filled quantity {}",
                    q, filled_quantity
                )));
            }
            if q == filled_quantity {
                // Nothing left to trade; the order completes here.
                let completed = self.complete_by_reduction(order_id, side, price, q, timestamp);
                return Ok(Submission {
                    order: completed,
                    trades: Vec::new(),
                    maker_updates: Vec::new(),
                });
            }
        }

        let price_changed = new_price.is_some_and(|p| p != price);
        let quantity_increased = new_quantity.is_some_and(|q| q > current_quantity);

        if price_changed || quantity_increased {
            // Cancel + resubmit: fresh sequence, full re-match.
            self.locations.remove(order_id);
            let node = match side {
                Side::Buy => self.bids.remove(order_id, price),
                Side::Sell => self.asks.remove(order_id, price),
            }
            .expect("location index out of sync with book");

            let mut order = node.order;
            if let Some(q) = new_quantity {
                order.quantity = q;
            }
            if let Some(p) = new_price {
                order.price = p;
            }
            order.updated_at = timestamp;
            return self.execute(order, policy, timestamp);
        }

        match new_quantity {
            Some(q) if q < current_quantity => {
                // In-place reduction preserves time priority.
                let level = match side {
                    Side::Buy => self.bids.level_mut(price),
                    Side::Sell => self.asks.level_mut(price),
                }
                .expect("location index out of sync with book");
                let order = level
                    .reduce_order(order_id, q, timestamp)
                    .expect("node present in level");
                Ok(Submission {
                    order,
                    trades: Vec::new(),
                    maker_updates: Vec::new(),
                })
            }
            _ => {
                // Same price, same quantity: keep priority untouched.
                let order = self.get(order_id).expect("checked above");
                Ok(Submission {
                    order,
                    trades: Vec::new(),
                    maker_updates: Vec::new(),
                })
            }
        }
    }

    fn complete_by_reduction(
        &mut self,
        order_id: &OrderId,
        side: Side,
        price: Price,
        new_quantity: Quantity,
        timestamp: i64,
    ) -> Order {
        let level = match side {
            Side::Buy => self.bids.level_mut(price),
            Side::Sell => self.asks.level_mut(price),
        }
        .expect("location index out of sync with book");
        let order = level
            .reduce_order(order_id, new_quantity, timestamp)
            .expect("node present in level");
        debug_assert_eq!(order.status, OrderStatus::Filled);

        self.locations.remove(order_id);
        match side {
            Side::Buy => self.bids.prune_level(price),
            Side::Sell => self.asks.prune_level(price),
        }
        order
    }

    /// Re-insert a persisted open order during startup rebuild. No
    /// matching runs: the stored state was cross-free when written.
    pub fn restore(&mut self, order: Order) {
        debug_assert!(!order.status.is_terminal());
        debug_assert!(!order.remaining().is_zero());
        self.rest(order);
    }

    /// Look up a resting order.
    pub fn get(&self, order_id: &OrderId) -> Option<Order> {
        let (side, price) = *self.locations.get(order_id)?;
        let level = match side {
            Side::Buy => self.bids.level(price),
            Side::Sell => self.asks.level(price),
        }?;
        level
            .iter()
            .find(|n| &n.order.order_id == order_id)
            .map(|n| n.order.clone())
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price
    }

    /// Top `levels` aggregated price levels: `(bids, asks)`, bids
    /// descending, asks ascending.
    pub fn depth(&self, levels: usize) -> (Vec<(Price, Quantity)>, Vec<(Price, Quantity)>) {
        (self.bids.depth(levels), self.asks.depth(levels))
    }

    /// All resting orders (no particular order); mainly for diagnostics
    /// and invariant checks.
    pub fn resting(&self) -> Vec<Order> {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .flat_map(|level| level.iter().map(|n| n.order.clone()))
            .collect()
    }

    pub fn resting_count(&self) -> usize {
        self.locations.len()
    }
}
