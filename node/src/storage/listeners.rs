use super::{ListenerId, Snapshot, StorePath};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

struct Listener {
    path: StorePath,
    tx: mpsc::UnboundedSender<Snapshot>,
}

/// Live listeners of one store, notified in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<ListenerId, Listener>>,
}

impl ListenerRegistry {
    pub(crate) fn register(
        &self,
        path: &StorePath,
        initial: Value,
    ) -> (ListenerId, mpsc::UnboundedReceiver<Snapshot>) {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Snapshot::new(path.clone(), initial));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Listener {
                    path: path.clone(),
                    tx,
                },
            );
        (id, rx)
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Push the current value to every listener whose path overlaps `written`.
    ///
    /// Listeners whose receiver is gone are dropped.
    pub(crate) fn notify<F>(&self, written: &StorePath, mut read: F)
    where
        F: FnMut(&StorePath) -> Value,
    {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|id, listener| {
            if !listener.path.overlaps(written) {
                return true;
            }
            trace!(%id, path = %listener.path, "notifying listener");
            let snapshot = Snapshot::new(listener.path.clone(), read(&listener.path));
            listener.tx.send(snapshot).is_ok()
        });
    }
}
