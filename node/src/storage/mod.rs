//! Hierarchical key-value store consumed by the conversation engine.
//!
//! Values are JSON trees addressed by `/`-separated paths. Listeners receive
//! the full value at their path immediately and again after every write that
//! touches it.

mod disk;
mod listeners;
mod memory;
pub mod push_key;
mod tree;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use push_key::PushKeyGenerator;

use async_trait::async_trait;
use duochat_messaging::is_valid_segment;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid path segment {0:?}")]
    InvalidPath(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
}

/// Location of a node in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root(segment: impl AsRef<str>) -> StoreResult<Self> {
        Self::default().child(segment)
    }

    /// Parse `a/b/c`. Leading and trailing slashes are ignored.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        raw.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(Self::default(), |path, segment| path.child(segment))
    }

    pub fn child(&self, segment: impl AsRef<str>) -> StoreResult<Self> {
        let segment = segment.as_ref();
        if !is_valid_segment(segment) {
            return Err(StoreError::InvalidPath(segment.to_owned()));
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_owned());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True when a write at one path changes the value seen at the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Value of a path at the moment a listener was notified.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: StorePath,
    value: Value,
}

impl Snapshot {
    pub fn new(path: StorePath, value: Value) -> Self {
        Self { path, value }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Boolean flag stored at this path; anything else reads as `false`.
    pub fn as_bool(&self) -> bool {
        self.value.as_bool().unwrap_or(false)
    }

    /// Immediate children in ascending key order.
    pub fn children(&self) -> Vec<(&str, &Value)> {
        let mut children: Vec<_> = self
            .value
            .as_object()
            .map(|object| object.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default();
        children.sort_by(|a, b| a.0.cmp(b.0));
        children
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// The store collaborator. Injected as [`SharedStore`] so tests can swap in
/// a [`MemoryStore`].
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Register a live listener. The current value is queued immediately.
    fn on_value(
        &self,
        path: &StorePath,
    ) -> StoreResult<(ListenerId, mpsc::UnboundedReceiver<Snapshot>)>;

    /// Deregister a listener. Unknown or already removed ids are ignored.
    fn off(&self, id: ListenerId);

    /// Allocate a unique, chronologically sortable child name under `path`.
    fn push_key(&self, path: &StorePath) -> String;

    /// Replace the subtree at `path` with `value`. `null` removes it.
    async fn set(&self, path: &StorePath, value: Value) -> StoreResult<()>;

    /// One-shot read; `null` when nothing is stored.
    async fn get(&self, path: &StorePath) -> StoreResult<Value>;
}

pub type SharedStore = Arc<dyn Store>;

/// A registered listener that detaches itself exactly once.
pub struct Subscription {
    store: SharedStore,
    id: ListenerId,
    path: StorePath,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    active: bool,
}

impl Subscription {
    pub fn open(store: &SharedStore, path: StorePath) -> StoreResult<Self> {
        let (id, rx) = store.on_value(&path)?;
        debug!(%id, %path, "listener attached");
        Ok(Self {
            store: Arc::clone(store),
            id,
            path,
            rx,
            active: true,
        })
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Wait for the next snapshot. `None` once cancelled.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.active {
            return None;
        }
        self.rx.recv().await
    }

    /// Detach from the store. Returns `false` if already detached.
    pub fn cancel(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.store.off(self.id);
        self.rx.close();
        debug!(id = %self.id, path = %self.path, "listener detached");
        true
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_parsing_and_relations() {
        let conversation = StorePath::parse("/conversations/12~7/").unwrap();
        let typing = conversation.child("typing").unwrap().child("7").unwrap();

        assert_eq!(conversation.to_string(), "conversations/12~7");
        assert!(conversation.contains(&typing));
        assert!(!typing.contains(&conversation));
        assert!(typing.overlaps(&conversation));
        assert!(!typing.overlaps(&StorePath::root("profiles").unwrap()));
        assert!(StorePath::parse("a/b.c").is_err());
    }

    #[test]
    fn snapshot_children_are_key_ordered() {
        let snapshot = Snapshot::new(
            StorePath::root("c").unwrap(),
            json!({"typing": {}, "-B": 2, "-A": 1}),
        );
        let keys: Vec<_> = snapshot.children().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["-A", "-B", "typing"]);
        assert!(!snapshot.as_bool());
    }

    #[tokio::test]
    async fn subscription_cancels_once() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let path = StorePath::root("flag").unwrap();
        let mut subscription = Subscription::open(&store, path.clone()).unwrap();

        let initial = subscription.next().await.unwrap();
        assert!(initial.is_null());

        assert!(subscription.cancel());
        assert!(!subscription.cancel());
        assert!(subscription.next().await.is_none());

        store.set(&path, json!(true)).await.unwrap();
        assert!(subscription.next().await.is_none());
    }
}
