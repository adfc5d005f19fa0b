//! Periodic depth snapshot loop
//!
//! A background task that captures top-of-book and depth for every live
//! symbol on an interval and hands each capture to an observer. The loop
//! must never stall matching: it only takes a symbol lock when free,
//! yielding once and then skipping the symbol for that tick if the book
//! stays contended.

use std::sync::Arc;
use std::time::Duration;
use types::ids::Symbol;
use types::numeric::{Price, Quantity};

use crate::engine::{now_nanos, MatchingEngine};

/// One captured view of a symbol's book.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
    pub captured_at: i64,
}

/// Sink for periodic book snapshots.
pub trait SnapshotObserver: Send + Sync {
    fn observe(&self, snapshot: BookSnapshot);
}

/// Default observer: structured log line per symbol.
pub struct LogObserver;

impl SnapshotObserver for LogObserver {
    fn observe(&self, snapshot: BookSnapshot) {
        tracing::info!(
            symbol = %snapshot.symbol,
            best_bid = snapshot.best_bid.map(|p| p.to_string()),
            best_ask = snapshot.best_ask.map(|p| p.to_string()),
            bid_levels = snapshot.bids.len(),
            ask_levels = snapshot.asks.len(),
            "book snapshot"
        );
    }
}

pub struct SnapshotLoop {
    engine: Arc<MatchingEngine>,
    interval: Duration,
    depth: usize,
    observer: Arc<dyn SnapshotObserver>,
}

impl SnapshotLoop {
    pub const DEFAULT_DEPTH: usize = 10;

    pub fn new(engine: Arc<MatchingEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            depth: Self::DEFAULT_DEPTH,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SnapshotObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Run forever; spawn this on the runtime.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.capture_all().await;
        }
    }

    /// One capture pass over all live symbols.
    pub async fn capture_all(&self) {
        for symbol in self.engine.symbols() {
            if let Some(snapshot) = self.try_capture(&symbol).await {
                self.observer.observe(snapshot);
            } else {
                tracing::debug!(symbol = %symbol, "book contended, snapshot skipped");
            }
        }
    }

    /// Capture one symbol without waiting on matching. Two non-blocking
    /// attempts separated by a yield, then give up until the next tick.
    async fn try_capture(&self, symbol: &Symbol) -> Option<BookSnapshot> {
        let handle = self.engine.book_if_exists(symbol)?;
        for attempt in 0..2 {
            if let Ok(book) = handle.try_lock() {
                let (bids, asks) = book.depth(self.depth);
                return Some(BookSnapshot {
                    symbol: symbol.clone(),
                    best_bid: book.best_bid(),
                    best_ask: book.best_ask(),
                    bids,
                    asks,
                    captured_at: now_nanos(),
                });
            }
            if attempt == 0 {
                tokio::task::yield_now().await;
            }
        }
        None
    }
}
