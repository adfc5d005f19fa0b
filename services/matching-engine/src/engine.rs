//! Matching engine: symbol registry, per-symbol locking, persistence
//! coordination
//!
//! One async mutex per order book serializes all mutations on a symbol;
//! distinct symbols never contend. A write batch is committed while the
//! symbol lock is still held, so the persisted trade order always equals
//! the execution order, and a failed commit rolls the book back to its
//! pre-operation state.

use dashmap::DashMap;
use persistence::{PersistenceGateway, StoreError, WriteBatch};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use types::errors::{EngineError, OrderError};
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Trade;

use crate::book::{OrderBook, SelfTradePolicy};

pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as i64
}

/// Engine-level policy knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub self_trade_policy: SelfTradePolicy,
}

/// Parameters for a new order submission.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
}

/// What a submit or modify produced.
#[derive(Debug, Clone)]
pub struct SubmitReport {
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// Top-of-book view for one symbol.
#[derive(Debug, Clone)]
pub struct MarketSummary {
    pub symbol: Symbol,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub last_trade: Option<Trade>,
}

/// Aggregated depth for one symbol.
#[derive(Debug, Clone)]
pub struct DepthSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

pub struct MatchingEngine {
    books: DashMap<Symbol, Arc<Mutex<OrderBook>>>,
    store: Arc<dyn PersistenceGateway>,
    config: EngineConfig,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn PersistenceGateway>, config: EngineConfig) -> Self {
        Self {
            books: DashMap::new(),
            store,
            config,
        }
    }

    /// Get or lazily create the book for a symbol.
    fn book(&self, symbol: &Symbol) -> Arc<Mutex<OrderBook>> {
        self.books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(OrderBook::new(symbol.clone()))))
            .clone()
    }

    pub(crate) fn book_if_exists(&self, symbol: &Symbol) -> Option<Arc<Mutex<OrderBook>>> {
        self.books.get(symbol).map(|entry| entry.value().clone())
    }

    /// Symbols with a live book.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    fn persistence_error(err: StoreError) -> EngineError {
        EngineError::Persistence {
            message: err.to_string(),
        }
    }

    /// Submit a new limit order: match under the symbol lock, persist the
    /// batch, respond.
    pub async fn submit(&self, new_order: NewOrder) -> Result<SubmitReport, EngineError> {
        let timestamp = now_nanos();
        let order = Order::new(
            new_order.user_id,
            new_order.symbol.clone(),
            new_order.side,
            new_order.quantity,
            new_order.price,
            timestamp,
        );
        let order_id = order.order_id;

        let handle = self.book(&new_order.symbol);
        let mut book = handle.lock().await;
        let backup = book.clone();

        let submission = match book.submit(order, self.config.self_trade_policy, timestamp) {
            Ok(s) => s,
            Err(e) => {
                *book = backup;
                return Err(e.into());
            }
        };

        let mut batch = WriteBatch::new().insert_order(&submission.order);
        for maker in &submission.maker_updates {
            batch = batch.update_order_fill(
                maker.order_id,
                maker.filled_quantity,
                maker.status,
                maker.updated_at,
            );
        }
        batch = batch.insert_trades(&submission.trades);

        if let Err(e) = self.store.apply(batch).await {
            *book = backup;
            tracing::error!(
                symbol = %new_order.symbol,
                %order_id,
                error = %e,
                "persistence commit failed; book rolled back"
            );
            return Err(Self::persistence_error(e));
        }

        tracing::debug!(
            symbol = %new_order.symbol,
            %order_id,
            status = %submission.order.status,
            trades = submission.trades.len(),
            "order submitted"
        );
        Ok(SubmitReport {
            order: submission.order,
            trades: submission.trades,
        })
    }

    /// Cancel a resting order.
    pub async fn cancel(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Order, EngineError> {
        let timestamp = now_nanos();
        let handle = self
            .book_if_exists(symbol)
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;
        let mut book = handle.lock().await;
        let backup = book.clone();

        let cancelled = book.cancel(order_id, timestamp)?;

        let batch = WriteBatch::new().update_order_fill(
            cancelled.order_id,
            cancelled.filled_quantity,
            OrderStatus::Cancelled,
            timestamp,
        );
        if let Err(e) = self.store.apply(batch).await {
            *book = backup;
            tracing::error!(symbol = %symbol, %order_id, error = %e, "cancel commit failed; book rolled back");
            return Err(Self::persistence_error(e));
        }

        tracing::debug!(symbol = %symbol, %order_id, "order cancelled");
        Ok(cancelled)
    }

    /// Modify a resting order's quantity and/or price.
    pub async fn modify(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
        new_quantity: Option<Quantity>,
        new_price: Option<Price>,
    ) -> Result<SubmitReport, EngineError> {
        if new_quantity.is_none() && new_price.is_none() {
            return Err(OrderError::InvalidModify("nothing to modify".to_string()).into());
        }

        let timestamp = now_nanos();
        let handle = self
            .book_if_exists(symbol)
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;
        let mut book = handle.lock().await;
        let backup = book.clone();

        let submission = match book.modify(
            order_id,
            new_quantity,
            new_price,
            self.config.self_trade_policy,
            timestamp,
        ) {
            Ok(s) => s,
            Err(e) => {
                *book = backup;
                return Err(e.into());
            }
        };

        let mut batch = WriteBatch::new().replace_order(&submission.order);
        for maker in &submission.maker_updates {
            batch = batch.update_order_fill(
                maker.order_id,
                maker.filled_quantity,
                maker.status,
                maker.updated_at,
            );
        }
        batch = batch.insert_trades(&submission.trades);

        if let Err(e) = self.store.apply(batch).await {
            *book = backup;
            tracing::error!(symbol = %symbol, %order_id, error = %e, "modify commit failed; book rolled back");
            return Err(Self::persistence_error(e));
        }

        tracing::debug!(
            symbol = %symbol,
            %order_id,
            trades = submission.trades.len(),
            "order modified"
        );
        Ok(SubmitReport {
            order: submission.order,
            trades: submission.trades,
        })
    }

    /// Fetch an order: live book state when a symbol is given, otherwise
    /// (or as fallback) the persisted record.
    pub async fn get_order(
        &self,
        symbol: Option<&Symbol>,
        order_id: &OrderId,
    ) -> Result<Option<Order>, EngineError> {
        if let Some(symbol) = symbol {
            if let Some(handle) = self.book_if_exists(symbol) {
                if let Some(order) = handle.lock().await.get(order_id) {
                    return Ok(Some(order));
                }
            }
        }
        self.store
            .get_order(order_id)
            .await
            .map_err(Self::persistence_error)
    }

    /// All persisted orders for a user, newest first.
    pub async fn list_user_orders(&self, user_id: &str) -> Result<Vec<Order>, EngineError> {
        self.store
            .list_user_orders(user_id)
            .await
            .map_err(Self::persistence_error)
    }

    /// Trade history, newest first.
    pub async fn list_trades(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
    ) -> Result<Vec<Trade>, EngineError> {
        self.store
            .list_trades(symbol, limit)
            .await
            .map_err(Self::persistence_error)
    }

    /// Best bid/ask plus the most recent trade for a symbol.
    pub async fn market(&self, symbol: &Symbol) -> Result<MarketSummary, EngineError> {
        let (best_bid, best_ask) = match self.book_if_exists(symbol) {
            Some(handle) => {
                let book = handle.lock().await;
                (book.best_bid(), book.best_ask())
            }
            None => (None, None),
        };
        let last_trade = self
            .store
            .list_trades(Some(symbol), 1)
            .await
            .map_err(Self::persistence_error)?
            .pop();
        Ok(MarketSummary {
            symbol: symbol.clone(),
            best_bid,
            best_ask,
            last_trade,
        })
    }

    /// Aggregated depth, top `levels` per side.
    pub async fn depth(&self, symbol: &Symbol, levels: usize) -> DepthSnapshot {
        let (bids, asks) = match self.book_if_exists(symbol) {
            Some(handle) => handle.lock().await.depth(levels),
            None => (Vec::new(), Vec::new()),
        };
        DepthSnapshot {
            symbol: symbol.clone(),
            bids,
            asks,
        }
    }

    /// Reload every non-terminal persisted order into its book. Orders
    /// re-enter in arrival order, so rebuilt books keep the original
    /// time priority. Returns the number of orders restored.
    pub async fn rebuild_from_store(&self) -> Result<usize, EngineError> {
        let open = self
            .store
            .list_open_orders()
            .await
            .map_err(Self::persistence_error)?;

        let mut count = 0usize;
        for order in open {
            let handle = self.book(&order.symbol);
            let mut book = handle.lock().await;
            book.restore(order);
            count += 1;
        }
        tracing::info!(orders = count, "order books rebuilt from store");
        Ok(count)
    }
}
