//! Persisted cart state.
//!
//! The store holds one in-memory cart bound to the current identity's
//! bucket and mirrors every mutation into the key-value store as a full
//! JSON snapshot. Writes are queued and coalesced per storage key, so a
//! slow store sees the latest snapshot rather than every intermediate
//! one, and an older write can never land after a newer one.
//!
//! Persistence is best effort: a failed write is logged and the
//! in-memory cart stays authoritative for the rest of the session.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use scancart_core::ProductId;

use crate::identity::BucketKey;
use crate::models::Product;
use crate::storage::KeyValueStore;

use super::{compute_totals, CartLine, CartTotals};

/// Cart bound to the current identity.
///
/// Cheap to clone; all clones share the same cart and write queue.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    kv: Arc<dyn KeyValueStore>,
    state: Mutex<CartState>,
    writes: StdMutex<WriteQueue>,
    write_signal: Notify,
}

#[derive(Default)]
struct CartState {
    /// `None` until an identity binds the cart.
    bucket: Option<BucketKey>,
    lines: Vec<CartLine>,
}

#[derive(Default)]
struct WriteQueue {
    /// Keys in first-scheduled order. A key appears at most once.
    order: VecDeque<String>,
    /// Latest pending operation per key.
    ops: HashMap<String, PersistOp>,
    /// Whether a drain task is currently running.
    draining: bool,
}

enum PersistOp {
    Set(String),
    Remove,
}

impl CartStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                kv,
                state: Mutex::new(CartState::default()),
                writes: StdMutex::new(WriteQueue::default()),
                write_signal: Notify::new(),
            }),
        }
    }

    /// Bind the cart to a bucket, replacing the in-memory lines with that
    /// bucket's persisted snapshot.
    pub async fn bind(&self, bucket: BucketKey) {
        let lines = self.load_lines(&bucket).await;
        debug!(bucket = %bucket, lines = lines.len(), "cart bound");
        let mut state = self.inner.state.lock().await;
        state.bucket = Some(bucket);
        state.lines = lines;
    }

    /// Bind to a bucket and fold the current lines into it.
    ///
    /// Quantities of products present on both sides are summed. The merged
    /// cart is persisted under the new bucket and the old bucket's
    /// snapshot is deleted, so signing in moves the guest cart rather than
    /// duplicating it.
    pub async fn rebind_merging(&self, bucket: BucketKey) {
        let merged_key = bucket.storage_key();
        let mut target = self.load_lines(&bucket).await;
        let mut state = self.inner.state.lock().await;
        let previous_key = state.bucket.as_ref().map(BucketKey::storage_key);

        for line in state.lines.drain(..) {
            match target
                .iter_mut()
                .find(|existing| existing.product_id == line.product_id)
            {
                Some(existing) => {
                    let quantity = existing.quantity + line.quantity;
                    existing.set_quantity(quantity);
                }
                None => target.push(line),
            }
        }
        debug!(bucket = %bucket, lines = target.len(), "cart merged into bucket");
        state.lines = target;
        state.bucket = Some(bucket);
        self.persist_locked(&state);

        if let Some(previous_key) = previous_key
            && previous_key != merged_key
        {
            self.schedule(previous_key, PersistOp::Remove);
        }
    }

    /// Add a product, merging into an existing line for the same product.
    /// Adding zero of something is a no-op.
    pub async fn add_item(&self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let mut state = self.inner.state.lock().await;
        match state
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            Some(existing) => {
                let merged = existing.quantity + quantity;
                existing.set_quantity(merged);
            }
            None => state.lines.push(CartLine::new(product, quantity)),
        }
        debug!(product_id = %product.id, quantity, "cart add");
        self.persist_locked(&state);
    }

    /// Set a line's quantity exactly; zero removes the line. Unknown
    /// products are ignored.
    pub async fn update_quantity(&self, product_id: &ProductId, quantity: u32) {
        let mut state = self.inner.state.lock().await;
        if quantity == 0 {
            let before = state.lines.len();
            state.lines.retain(|line| line.product_id != *product_id);
            if state.lines.len() == before {
                return;
            }
        } else {
            let Some(line) = state
                .lines
                .iter_mut()
                .find(|line| line.product_id == *product_id)
            else {
                return;
            };
            line.set_quantity(quantity);
        }
        debug!(product_id = %product_id, quantity, "cart quantity set");
        self.persist_locked(&state);
    }

    /// Remove a line. Unknown products are ignored.
    pub async fn remove_item(&self, product_id: &ProductId) {
        let mut state = self.inner.state.lock().await;
        let before = state.lines.len();
        state.lines.retain(|line| line.product_id != *product_id);
        if state.lines.len() == before {
            return;
        }
        debug!(product_id = %product_id, "cart remove");
        self.persist_locked(&state);
    }

    /// Empty the cart. The empty snapshot is persisted like any other, so
    /// a cleared cart stays cleared across restarts.
    pub async fn clear(&self) {
        let mut state = self.inner.state.lock().await;
        state.lines.clear();
        debug!("cart cleared");
        self.persist_locked(&state);
    }

    /// Current lines, in insertion order.
    pub async fn lines(&self) -> Vec<CartLine> {
        self.inner.state.lock().await.lines.clone()
    }

    /// Totals derived from the current lines.
    pub async fn totals(&self) -> CartTotals {
        compute_totals(&self.inner.state.lock().await.lines)
    }

    /// The bucket the cart is bound to, if any.
    pub async fn bucket(&self) -> Option<BucketKey> {
        self.inner.state.lock().await.bucket.clone()
    }

    /// Wait until every queued write has been attempted.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.write_signal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let queue = self
                    .inner
                    .writes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if queue.order.is_empty() && !queue.draining {
                    return;
                }
            }
            notified.as_mut().await;
        }
    }

    /// Load a bucket's lines, preferring a queued write over the stored
    /// snapshot so a rebind racing the drain task still sees the newest
    /// state. Unreadable or corrupt snapshots fall back to empty.
    async fn load_lines(&self, bucket: &BucketKey) -> Vec<CartLine> {
        let key = bucket.storage_key();
        let pending = {
            let queue = self
                .inner
                .writes
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match queue.ops.get(&key) {
                Some(PersistOp::Set(json)) => Some(Some(json.clone())),
                Some(PersistOp::Remove) => Some(None),
                None => None,
            }
        };
        let raw = match pending {
            Some(raw) => raw,
            None => match self.inner.kv.get(&key).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, key, "cart snapshot unreadable, starting empty");
                    None
                }
            },
        };
        raw.map_or_else(Vec::new, |json| parse_lines(&json, &key))
    }

    /// Queue a full snapshot of the current lines. Mutations before any
    /// bucket is bound stay in memory only.
    fn persist_locked(&self, state: &CartState) {
        let Some(bucket) = &state.bucket else {
            debug!("cart not bound yet, mutation kept in memory");
            return;
        };
        match serde_json::to_string(&state.lines) {
            Ok(json) => self.schedule(bucket.storage_key(), PersistOp::Set(json)),
            Err(e) => warn!(error = %e, "cart snapshot not serializable"),
        }
    }

    /// Queue an operation, replacing any pending one for the same key,
    /// and make sure a drain task is running.
    fn schedule(&self, key: String, op: PersistOp) {
        let spawn_drain = {
            let mut queue = self
                .inner
                .writes
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !queue.ops.contains_key(&key) {
                queue.order.push_back(key.clone());
            }
            queue.ops.insert(key, op);
            if queue.draining {
                false
            } else {
                queue.draining = true;
                true
            }
        };
        if spawn_drain {
            let store = self.clone();
            tokio::spawn(async move { store.drain_writes().await });
        }
    }

    /// Pop and execute queued operations until the queue is empty.
    async fn drain_writes(&self) {
        loop {
            let next = {
                let mut queue = self
                    .inner
                    .writes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(key) = queue.order.pop_front()
                    && let Some(op) = queue.ops.remove(&key)
                {
                    Some((key, op))
                } else {
                    queue.draining = false;
                    None
                }
            };
            let Some((key, op)) = next else {
                self.inner.write_signal.notify_waiters();
                return;
            };
            let result = match op {
                PersistOp::Set(json) => self.inner.kv.set(&key, &json).await,
                PersistOp::Remove => self.inner.kv.remove(&key).await,
            };
            if let Err(e) = result {
                warn!(error = %e, key, "cart write failed, in-memory cart unaffected");
            }
        }
    }
}

fn parse_lines(json: &str, key: &str) -> Vec<CartLine> {
    match serde_json::from_str(json) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(error = %e, key, "cart snapshot corrupt, starting empty");
            Vec::new()
        }
    }
}
