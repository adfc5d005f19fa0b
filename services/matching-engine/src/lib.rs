//! Limit order matching engine
//!
//! Price-time priority matching over per-symbol order books:
//! better-priced orders execute first, and among equal prices the
//! earlier arrival wins. Execution is always at the resting (maker)
//! order's price.
//!
//! Per-symbol mutation is serialized by one lock per book; symbols
//! progress in parallel. All durable effects of one operation are
//! committed through the persistence gateway as a single atomic batch
//! before the operation is acknowledged.

pub mod book;
pub mod engine;
pub mod snapshot;

pub use book::{OrderBook, SelfTradePolicy, Submission};
pub use engine::{
    DepthSnapshot, EngineConfig, MarketSummary, MatchingEngine, NewOrder, SubmitReport,
};
pub use snapshot::{BookSnapshot, LogObserver, SnapshotLoop, SnapshotObserver};
