use super::listeners::ListenerRegistry;
use super::{
    tree, ListenerId, PushKeyGenerator, Snapshot, Store, StoreError, StorePath, StoreResult,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// In-process store holding the whole tree in memory.
///
/// Used as the injected store in tests and by clients that share one process.
#[derive(Default)]
pub struct MemoryStore {
    root: Mutex<Value>,
    listeners: ListenerRegistry,
    push_keys: PushKeyGenerator,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `set` fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn on_value(
        &self,
        path: &StorePath,
    ) -> StoreResult<(ListenerId, mpsc::UnboundedReceiver<Snapshot>)> {
        let root = self.root.lock().map_err(|_| StoreError::LockPoisoned)?;
        let current = tree::value_at(&root, path).cloned().unwrap_or(Value::Null);
        Ok(self.listeners.register(path, current))
    }

    fn off(&self, id: ListenerId) {
        if self.listeners.remove(id) {
            debug!(%id, "memory listener removed");
        }
    }

    fn push_key(&self, _path: &StorePath) -> String {
        self.push_keys.generate()
    }

    async fn set(&self, path: &StorePath, value: Value) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write to {path} rejected")));
        }
        tree::validate(&value)?;

        let mut root = self.root.lock().map_err(|_| StoreError::LockPoisoned)?;
        tree::write_at(&mut root, path.segments(), tree::normalize(value));
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.listeners.notify(path, |listening| {
            tree::value_at(&root, listening).cloned().unwrap_or(Value::Null)
        });
        Ok(())
    }

    async fn get(&self, path: &StorePath) -> StoreResult<Value> {
        let root = self.root.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tree::value_at(&root, path).cloned().unwrap_or(Value::Null))
    }
}
