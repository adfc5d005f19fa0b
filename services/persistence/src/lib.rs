//! Durable storage for orders and trades
//!
//! The in-memory order books are a cache; this crate holds the
//! authoritative records. Writes arrive as atomic batches through the
//! [`gateway::PersistenceGateway`] trait and land in an append-only,
//! checksummed journal; reads are served from the replayed in-memory
//! model.

pub mod gateway;
pub mod journal;
pub mod store;

pub use gateway::{PersistenceGateway, StoreError, WriteBatch, WriteOp};
pub use journal::FsyncPolicy;
pub use store::JournalStore;
