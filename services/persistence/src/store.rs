//! Journal-backed order and trade store
//!
//! [`JournalStore`] keeps the full read model in memory and makes it
//! durable through the append-only journal: a batch is first serialized
//! and appended (fsynced), then applied to the in-memory maps. A batch
//! that fails validation or fails to reach the journal leaves the model
//! untouched. On open, the journal's valid prefix is replayed to rebuild
//! the model, so a torn final record simply never happened.

use crate::gateway::{PersistenceGateway, StoreError, WriteBatch, WriteOp};
use crate::journal::{self, FsyncPolicy, JournalWriter};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use types::ids::{OrderId, Symbol};
use types::order::Order;
use types::trade::Trade;

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as i64
}

#[derive(Default)]
struct ReadModel {
    orders: HashMap<OrderId, Order>,
    /// Execution order; newest last.
    trades: Vec<Trade>,
}

impl ReadModel {
    /// Reject batches that cannot apply cleanly, before anything is journaled.
    fn validate(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut inserted: Vec<OrderId> = Vec::new();
        for op in &batch.ops {
            match op {
                WriteOp::InsertOrder(order) => {
                    if self.orders.contains_key(&order.order_id) {
                        return Err(StoreError::DuplicateOrder {
                            order_id: order.order_id,
                        });
                    }
                    inserted.push(order.order_id);
                }
                WriteOp::UpdateOrderFill { order_id, .. } | WriteOp::ReplaceOrder(Order { order_id, .. }) => {
                    if !self.orders.contains_key(order_id) && !inserted.contains(order_id) {
                        return Err(StoreError::UnknownOrder {
                            order_id: *order_id,
                        });
                    }
                }
                WriteOp::InsertTrades(_) => {}
            }
        }
        Ok(())
    }

    fn apply(&mut self, batch: WriteBatch) {
        for op in batch.ops {
            match op {
                WriteOp::InsertOrder(order) | WriteOp::ReplaceOrder(order) => {
                    self.orders.insert(order.order_id, order);
                }
                WriteOp::UpdateOrderFill {
                    order_id,
                    filled_quantity,
                    status,
                    updated_at,
                } => {
                    if let Some(order) = self.orders.get_mut(&order_id) {
                        order.filled_quantity = filled_quantity;
                        order.status = status;
                        order.updated_at = updated_at;
                    }
                }
                WriteOp::InsertTrades(trades) => {
                    self.trades.extend(trades);
                }
            }
        }
    }
}

/// File-backed [`PersistenceGateway`] implementation.
pub struct JournalStore {
    state: RwLock<ReadModel>,
    journal: Mutex<JournalWriter>,
}

impl JournalStore {
    /// Open (or create) the store under `dir`, replaying the journal.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_fsync(dir, FsyncPolicy::Always)
    }

    pub fn open_with_fsync(
        dir: impl AsRef<Path>,
        fsync_policy: FsyncPolicy,
    ) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let replay = journal::replay(dir)?;
        if replay.discarded_bytes > 0 {
            journal::truncate_tail(dir, replay.valid_bytes)?;
        }

        let mut model = ReadModel::default();
        for record in &replay.records {
            let batch: WriteBatch = bincode::deserialize(&record.payload)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            model.apply(batch);
        }

        tracing::info!(
            dir = %dir.display(),
            records = replay.records.len(),
            orders = model.orders.len(),
            trades = model.trades.len(),
            discarded_bytes = replay.discarded_bytes,
            "journal store opened"
        );

        let writer = JournalWriter::open(dir, replay.next_sequence(), fsync_policy)?;
        Ok(Self {
            state: RwLock::new(model),
            journal: Mutex::new(writer),
        })
    }

    /// Number of persisted orders (testing / diagnostics).
    pub fn order_count(&self) -> usize {
        self.state.read().expect("store lock poisoned").orders.len()
    }

    /// Number of persisted trades (testing / diagnostics).
    pub fn trade_count(&self) -> usize {
        self.state.read().expect("store lock poisoned").trades.len()
    }
}

#[async_trait]
impl PersistenceGateway for JournalStore {
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        // The write lock spans validate → journal → model update, so batch
        // order in the journal always matches apply order.
        let mut state = self.state.write().expect("store lock poisoned");
        state.validate(&batch)?;

        let payload =
            bincode::serialize(&batch).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.journal
            .lock()
            .expect("journal lock poisoned")
            .append(now_nanos(), &payload)?;

        state.apply(batch);
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.orders.get(order_id).cloned())
    }

    async fn list_user_orders(&self, user_id: &str) -> Result<Vec<Order>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });
        Ok(orders)
    }

    async fn list_trades(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
    ) -> Result<Vec<Trade>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state
            .trades
            .iter()
            .rev()
            .filter(|t| symbol.map_or(true, |s| &t.symbol == s))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_open_orders(&self) -> Result<Vec<Order>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect();
        // Arrival order so rebuilt books regain the same time priority.
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Ok(orders)
    }
}
