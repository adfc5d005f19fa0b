//! End-to-end engine scenarios against a real journal-backed store.

use matching_engine::{MatchingEngine, NewOrder};
use persistence::{JournalStore, PersistenceGateway, StoreError, WriteBatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Trade;

fn new_order(user: &str, symbol: &str, side: Side, qty: u64, price: &str) -> NewOrder {
    NewOrder {
        user_id: user.to_string(),
        symbol: Symbol::new(symbol),
        side,
        quantity: Quantity::new(qty),
        price: Price::parse(price).unwrap(),
    }
}

fn engine_with_store() -> (Arc<MatchingEngine>, Arc<JournalStore>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(JournalStore::open(tmp.path()).unwrap());
    let engine = Arc::new(MatchingEngine::new(store.clone()));
    (engine, store, tmp)
}

#[tokio::test]
async fn test_simple_cross() {
    let (engine, store, _tmp) = engine_with_store();

    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "150.00"))
        .await
        .unwrap();
    assert_eq!(s1.order.status, OrderStatus::Pending);
    assert!(s1.trades.is_empty());

    let b1 = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 100, "150.00"))
        .await
        .unwrap();
    assert_eq!(b1.order.status, OrderStatus::Filled);
    assert_eq!(b1.trades.len(), 1);
    assert_eq!(b1.trades[0].quantity, Quantity::new(100));
    assert_eq!(b1.trades[0].price, Price::parse("150.00").unwrap());

    let aapl = Symbol::new("AAPL");
    let market = engine.market(&aapl).await.unwrap();
    assert_eq!(market.best_bid, None);
    assert_eq!(market.best_ask, None);
    assert!(market.last_trade.is_some());

    // Both sides persisted as FILLED.
    let stored = store.get_order(&s1.order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Filled);
    assert_eq!(store.trade_count(), 1);
}

#[tokio::test]
async fn test_partial_fill_rests() {
    let (engine, _store, _tmp) = engine_with_store();

    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "150.00"))
        .await
        .unwrap();
    let b1 = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 60, "150.00"))
        .await
        .unwrap();

    assert_eq!(b1.order.status, OrderStatus::Filled);
    assert_eq!(b1.trades[0].quantity, Quantity::new(60));

    let aapl = Symbol::new("AAPL");
    let market = engine.market(&aapl).await.unwrap();
    assert_eq!(market.best_ask, Some(Price::parse("150.00").unwrap()));

    let depth = engine.depth(&aapl, 10).await;
    assert_eq!(depth.asks, vec![(Price::parse("150.00").unwrap(), Quantity::new(40))]);

    let resting = engine
        .get_order(Some(&aapl), &s1.order.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resting.status, OrderStatus::Partial);
    assert_eq!(resting.remaining(), Quantity::new(40));
}

#[tokio::test]
async fn test_maker_price_rule() {
    let (engine, _store, _tmp) = engine_with_store();

    engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "149.00"))
        .await
        .unwrap();
    let b1 = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 100, "151.00"))
        .await
        .unwrap();

    assert_eq!(b1.order.status, OrderStatus::Filled);
    assert_eq!(b1.trades[0].price, Price::parse("149.00").unwrap());
}

#[tokio::test]
async fn test_time_priority() {
    let (engine, _store, _tmp) = engine_with_store();

    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 50, "150.00"))
        .await
        .unwrap();
    let s2 = engine
        .submit(new_order("s2", "AAPL", Side::Sell, 50, "150.00"))
        .await
        .unwrap();

    let b1 = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 60, "150.00"))
        .await
        .unwrap();
    assert_eq!(b1.trades.len(), 2);
    assert_eq!(b1.trades[0].sell_order_id, s1.order.order_id);
    assert_eq!(b1.trades[0].quantity, Quantity::new(50));
    assert_eq!(b1.trades[1].sell_order_id, s2.order.order_id);
    assert_eq!(b1.trades[1].quantity, Quantity::new(10));

    let aapl = Symbol::new("AAPL");
    let s2_state = engine
        .get_order(Some(&aapl), &s2.order.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(s2_state.status, OrderStatus::Partial);
    assert_eq!(s2_state.remaining(), Quantity::new(40));
}

#[tokio::test]
async fn test_cancel_then_no_match() {
    let (engine, _store, _tmp) = engine_with_store();
    let aapl = Symbol::new("AAPL");

    let b1 = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 100, "150.00"))
        .await
        .unwrap();
    let cancelled = engine.cancel(&aapl, &b1.order.order_id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "150.00"))
        .await
        .unwrap();
    assert!(s1.trades.is_empty());
    let market = engine.market(&aapl).await.unwrap();
    assert_eq!(market.best_ask, Some(Price::parse("150.00").unwrap()));
    assert_eq!(market.best_bid, None);
}

#[tokio::test]
async fn test_second_cancel_not_found_state_unchanged() {
    let (engine, store, _tmp) = engine_with_store();
    let aapl = Symbol::new("AAPL");

    let b1 = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 100, "150.00"))
        .await
        .unwrap();
    engine.cancel(&aapl, &b1.order.order_id).await.unwrap();

    let before = store.get_order(&b1.order.order_id).await.unwrap().unwrap();
    let err = engine.cancel(&aapl, &b1.order.order_id).await.unwrap_err();
    assert!(err.to_string().contains("not found"));

    // State unchanged by the failed second cancel.
    let after = store.get_order(&b1.order.order_id).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_modify_price_back_and_forth_loses_priority() {
    let (engine, _store, _tmp) = engine_with_store();
    let aapl = Symbol::new("AAPL");

    let b1 = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 100, "149.00"))
        .await
        .unwrap();
    let b2 = engine
        .submit(new_order("b2", "AAPL", Side::Buy, 100, "149.00"))
        .await
        .unwrap();

    // Same-price modify keeps b1 in front.
    engine
        .modify(
            &aapl,
            &b1.order.order_id,
            None,
            Some(Price::parse("149.00").unwrap()),
        )
        .await
        .unwrap();

    // Price away and back pushes b1 behind b2.
    engine
        .modify(
            &aapl,
            &b1.order.order_id,
            None,
            Some(Price::parse("148.00").unwrap()),
        )
        .await
        .unwrap();
    engine
        .modify(
            &aapl,
            &b1.order.order_id,
            None,
            Some(Price::parse("149.00").unwrap()),
        )
        .await
        .unwrap();

    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "149.00"))
        .await
        .unwrap();
    assert_eq!(s1.trades[0].buy_order_id, b2.order.order_id);
}

#[tokio::test]
async fn test_modify_invalid_quantity_conflicts() {
    let (engine, _store, _tmp) = engine_with_store();
    let aapl = Symbol::new("AAPL");

    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "150.00"))
        .await
        .unwrap();
    engine
        .submit(new_order("b1", "AAPL", Side::Buy, 60, "150.00"))
        .await
        .unwrap();

    // 60 already filled; shrinking below that is invalid.
    let err = engine
        .modify(&aapl, &s1.order.order_id, Some(Quantity::new(50)), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid modification"));
}

#[tokio::test]
async fn test_unknown_symbol_queries_are_empty() {
    let (engine, _store, _tmp) = engine_with_store();
    let ghost = Symbol::new("GHOST");

    let market = engine.market(&ghost).await.unwrap();
    assert_eq!(market.best_bid, None);
    assert!(market.last_trade.is_none());

    let depth = engine.depth(&ghost, 10).await;
    assert!(depth.bids.is_empty() && depth.asks.is_empty());

    let err = engine.cancel(&ghost, &OrderId::new()).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_symbols_are_independent() {
    let (engine, _store, _tmp) = engine_with_store();

    engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "150.00"))
        .await
        .unwrap();
    let msft_buy = engine
        .submit(new_order("b1", "MSFT", Side::Buy, 100, "150.00"))
        .await
        .unwrap();

    // Same price on another symbol does not match.
    assert!(msft_buy.trades.is_empty());
    assert_eq!(engine.symbols().len(), 2);
}

#[tokio::test]
async fn test_concurrent_symbols_progress_in_parallel() {
    let (engine, store, _tmp) = engine_with_store();
    let symbols = ["AAPL", "MSFT", "TSLA", "AMZN"];

    let mut handles = Vec::new();
    for symbol in symbols {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..50 {
                engine
                    .submit(new_order("maker", symbol, Side::Sell, 10, "100.00"))
                    .await
                    .unwrap();
                engine
                    .submit(new_order("taker", symbol, Side::Buy, 10, "100.00"))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // 50 full matches per symbol.
    assert_eq!(store.trade_count(), 4 * 50);
    for symbol in symbols {
        let market = engine.market(&Symbol::new(symbol)).await.unwrap();
        assert_eq!(market.best_bid, None);
        assert_eq!(market.best_ask, None);
    }
}

#[tokio::test]
async fn test_rebuild_restores_books_and_priority() {
    let tmp = TempDir::new().unwrap();

    let (b1_id, b2_id);
    {
        let store = Arc::new(JournalStore::open(tmp.path()).unwrap());
        let engine = MatchingEngine::new(store);
        b1_id = engine
            .submit(new_order("b1", "AAPL", Side::Buy, 100, "150.00"))
            .await
            .unwrap()
            .order
            .order_id;
        b2_id = engine
            .submit(new_order("b2", "AAPL", Side::Buy, 100, "150.00"))
            .await
            .unwrap()
            .order
            .order_id;
        engine
            .submit(new_order("s0", "AAPL", Side::Sell, 40, "150.00"))
            .await
            .unwrap();
        // b1 now PARTIAL (60 left), b2 untouched.
    }

    // Fresh process: replay store, rebuild books.
    let store = Arc::new(JournalStore::open(tmp.path()).unwrap());
    let engine = MatchingEngine::new(store);
    let restored = engine.rebuild_from_store().await.unwrap();
    assert_eq!(restored, 2);

    let aapl = Symbol::new("AAPL");
    let depth = engine.depth(&aapl, 10).await;
    assert_eq!(depth.bids, vec![(Price::parse("150.00").unwrap(), Quantity::new(160))]);

    // Arrival order survived the restart: b1 still fills first.
    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 70, "150.00"))
        .await
        .unwrap();
    assert_eq!(s1.trades[0].buy_order_id, b1_id);
    assert_eq!(s1.trades[0].quantity, Quantity::new(60));
    assert_eq!(s1.trades[1].buy_order_id, b2_id);
    assert_eq!(s1.trades[1].quantity, Quantity::new(10));
}

/// Store wrapper that can be switched to fail every commit.
struct FlakyStore {
    inner: Arc<JournalStore>,
    failing: AtomicBool,
}

#[async_trait::async_trait]
impl PersistenceGateway for FlakyStore {
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Serialization("injected failure".to_string()));
        }
        self.inner.apply(batch).await
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.get_order(order_id).await
    }

    async fn list_user_orders(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        self.inner.list_user_orders(user_id).await
    }

    async fn list_trades(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
    ) -> Result<Vec<Trade>, StoreError> {
        self.inner.list_trades(symbol, limit).await
    }

    async fn list_open_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.inner.list_open_orders().await
    }
}

#[tokio::test]
async fn test_failed_commit_rolls_back_book() {
    let tmp = TempDir::new().unwrap();
    let inner = Arc::new(JournalStore::open(tmp.path()).unwrap());
    let store = Arc::new(FlakyStore {
        inner: inner.clone(),
        failing: AtomicBool::new(false),
    });
    let engine = MatchingEngine::new(store.clone());
    let aapl = Symbol::new("AAPL");

    let s1 = engine
        .submit(new_order("s1", "AAPL", Side::Sell, 100, "150.00"))
        .await
        .unwrap();

    // A crossing buy arrives while the store is down: the whole
    // operation unwinds, leaving the resting ask untouched.
    store.failing.store(true, Ordering::SeqCst);
    let err = engine
        .submit(new_order("b1", "AAPL", Side::Buy, 100, "150.00"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Persistence error"));

    store.failing.store(false, Ordering::SeqCst);
    let resting = engine
        .get_order(Some(&aapl), &s1.order.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resting.status, OrderStatus::Pending);
    assert_eq!(resting.remaining(), Quantity::new(100));
    assert_eq!(inner.trade_count(), 0);

    // The book still matches normally afterwards.
    let b2 = engine
        .submit(new_order("b2", "AAPL", Side::Buy, 100, "150.00"))
        .await
        .unwrap();
    assert_eq!(b2.order.status, OrderStatus::Filled);
}
