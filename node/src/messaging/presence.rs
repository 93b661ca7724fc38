//! Typing presence: the debounced local flag and the peer's flag.

use super::typing_path;
use crate::storage::{SharedStore, Snapshot, StorePath, StoreResult, Subscription};
use duochat_messaging::{ConversationKey, ParticipantId};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Publishes the local participant's typing flag.
///
/// Each [`notify`](Self::notify) cancels the pending write and schedules a
/// new one after the quiescence window, so a burst of changes ends in a
/// single write carrying the last value.
pub struct TypingNotifier {
    store: SharedStore,
    path: StorePath,
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl TypingNotifier {
    pub fn new(
        store: &SharedStore,
        key: &ConversationKey,
        me: &ParticipantId,
        window: Duration,
    ) -> StoreResult<Self> {
        Ok(Self {
            store: Arc::clone(store),
            path: typing_path(key, me)?,
            window,
            pending: None,
        })
    }

    /// Must be called from within a tokio runtime.
    pub fn notify(&mut self, typing: bool) {
        self.cancel_pending();

        let store = Arc::clone(&self.store);
        let path = self.path.clone();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Err(err) = store.set(&path, Value::Bool(typing)).await {
                debug!(%err, %path, typing, "typing update dropped");
            }
        }));
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Drop any pending write and write `false` right away.
    pub async fn clear(&mut self) -> StoreResult<()> {
        self.clear_detached().await
    }

    /// Like [`clear`](Self::clear), but returns the write as an owned future
    /// so it can be spawned where no caller can await it.
    pub fn clear_detached(&mut self) -> impl Future<Output = StoreResult<()>> + Send + 'static {
        self.cancel_pending();
        let store = Arc::clone(&self.store);
        let path = self.path.clone();
        async move { store.set(&path, Value::Bool(false)).await }
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for TypingNotifier {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Follows the peer's typing flag for display.
#[derive(Debug)]
pub struct PeerTyping {
    subscription: Subscription,
    typing: bool,
}

impl PeerTyping {
    pub fn subscribe(
        store: &SharedStore,
        key: &ConversationKey,
        peer: &ParticipantId,
    ) -> StoreResult<Self> {
        Ok(Self {
            subscription: Subscription::open(store, typing_path(key, peer)?)?,
            typing: false,
        })
    }

    pub fn apply(&mut self, snapshot: &Snapshot) {
        self.typing = snapshot.as_bool();
    }

    /// Wait for the next change; `None` once unsubscribed.
    pub async fn next_update(&mut self) -> Option<bool> {
        let snapshot = self.subscription.next().await?;
        self.apply(&snapshot);
        Some(self.typing)
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn unsubscribe(&mut self) -> bool {
        self.subscription.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Store};
    use tokio::time::Instant;

    const WINDOW: Duration = Duration::from_millis(500);

    fn id(raw: &str) -> ParticipantId {
        ParticipantId::new(raw).unwrap()
    }

    fn key() -> ConversationKey {
        ConversationKey::resolve(&id("7"), &id("12")).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, SharedStore) {
        let memory = Arc::new(MemoryStore::new());
        let store: SharedStore = memory.clone();
        (memory, store)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_write_of_last_value() {
        let (memory, store) = setup();
        let mut notifier = TypingNotifier::new(&store, &key(), &id("7"), WINDOW).unwrap();
        let (_, mut rx) = store.on_value(&typing_path(&key(), &id("7")).unwrap()).unwrap();
        rx.recv().await.unwrap();

        let start = Instant::now();
        notifier.notify(true);
        tokio::time::advance(Duration::from_millis(100)).await;
        notifier.notify(true);
        tokio::time::advance(Duration::from_millis(100)).await;
        notifier.notify(true);

        let written = rx.recv().await.unwrap();
        assert!(written.as_bool());
        assert_eq!(start.elapsed(), Duration::from_millis(700));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(memory.write_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_value_is_never_written() {
        let (memory, store) = setup();
        let mut notifier = TypingNotifier::new(&store, &key(), &id("7"), WINDOW).unwrap();

        notifier.notify(true);
        tokio::time::advance(Duration::from_millis(300)).await;
        notifier.notify(false);
        assert!(notifier.has_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(memory.write_count(), 1);
        let path = typing_path(&key(), &id("7")).unwrap();
        assert_eq!(memory.get(&path).await.unwrap(), Value::Bool(false));
        assert!(!notifier.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_bypasses_debounce_and_cancels_pending() {
        let (memory, store) = setup();
        let mut notifier = TypingNotifier::new(&store, &key(), &id("7"), WINDOW).unwrap();

        notifier.notify(true);
        notifier.clear().await.unwrap();
        assert_eq!(memory.write_count(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(memory.write_count(), 1);
        let path = typing_path(&key(), &id("7")).unwrap();
        assert_eq!(memory.get(&path).await.unwrap(), Value::Bool(false));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_typing_write_is_silent() {
        let (memory, store) = setup();
        let mut notifier = TypingNotifier::new(&store, &key(), &id("7"), WINDOW).unwrap();
        memory.fail_writes(true);

        notifier.notify(true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!notifier.has_pending());
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn peer_flag_follows_store() {
        let (_, store) = setup();
        let mut peer = PeerTyping::subscribe(&store, &key(), &id("12")).unwrap();

        assert_eq!(peer.next_update().await, Some(false));

        let path = typing_path(&key(), &id("12")).unwrap();
        store.set(&path, Value::Bool(true)).await.unwrap();
        assert_eq!(peer.next_update().await, Some(true));
        assert!(peer.is_typing());

        store.set(&path, Value::Null).await.unwrap();
        assert_eq!(peer.next_update().await, Some(false));

        assert!(peer.unsubscribe());
        assert!(!peer.unsubscribe());
        assert_eq!(peer.next_update().await, None);
    }
}
