use super::listeners::ListenerRegistry;
use super::{tree, ListenerId, PushKeyGenerator, Snapshot, Store, StorePath, StoreResult};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

/// Sled-backed store.
///
/// Every leaf is kept under its full path (`conversations/12~7/-Nx…/body`)
/// as JSON bytes, so a subtree is one prefix scan.
pub struct DiskStore {
    nodes: sled::Tree,
    listeners: ListenerRegistry,
    push_keys: PushKeyGenerator,
    // Serializes write-then-notify so listeners see writes in order.
    write_lock: Mutex<()>,
}

impl DiskStore {
    const TREE: &'static str = "nodes";

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create storage directory {:?}", path))?;
        let db = sled::open(path)
            .with_context(|| format!("failed to open sled database at {:?}", path))?;
        Ok(Self::from_db(&db)?)
    }

    /// Store backed by a temporary database removed on drop.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(&db)
    }

    fn from_db(db: &sled::Db) -> StoreResult<Self> {
        Ok(Self {
            nodes: db.open_tree(Self::TREE)?,
            listeners: ListenerRegistry::default(),
            push_keys: PushKeyGenerator::new(),
            write_lock: Mutex::new(()),
        })
    }

    fn read(&self, path: &StorePath) -> StoreResult<Value> {
        let key = path.to_string();
        if !path.is_root() {
            if let Some(leaf) = self.nodes.get(key.as_bytes())? {
                return Ok(serde_json::from_slice(&leaf)?);
            }
        }

        let prefix = if path.is_root() {
            String::new()
        } else {
            format!("{key}/")
        };
        let mut object = Map::new();
        for entry in self.nodes.scan_prefix(prefix.as_bytes()) {
            let (raw_key, raw_value) = entry?;
            let full = String::from_utf8_lossy(&raw_key);
            let relative: Vec<String> = full[prefix.len()..]
                .split('/')
                .map(str::to_owned)
                .collect();
            let leaf: Value = serde_json::from_slice(&raw_value)?;
            let mut root = Value::Object(std::mem::take(&mut object));
            tree::write_at(&mut root, &relative, leaf);
            if let Value::Object(rebuilt) = root {
                object = rebuilt;
            }
        }

        if object.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::Object(object))
        }
    }

    fn write(&self, path: &StorePath, value: Value) -> StoreResult<()> {
        let key = path.to_string();
        let mut batch = sled::Batch::default();

        // A leaf stored at an ancestor would shadow the new subtree.
        let segments = path.segments();
        for depth in 1..segments.len() {
            batch.remove(segments[..depth].join("/").as_bytes());
        }
        if !path.is_root() {
            batch.remove(key.as_bytes());
        }
        let prefix = if path.is_root() {
            String::new()
        } else {
            format!("{key}/")
        };
        for entry in self.nodes.scan_prefix(prefix.as_bytes()) {
            let (old_key, _) = entry?;
            batch.remove(old_key);
        }

        for (relative, leaf) in tree::flatten(&value) {
            let mut full = segments.to_vec();
            full.extend(relative);
            batch.insert(full.join("/").as_bytes(), serde_json::to_vec(&leaf)?);
        }

        self.nodes.apply_batch(batch)?;
        self.nodes.flush()?;
        Ok(())
    }
}

#[async_trait]
impl Store for DiskStore {
    fn on_value(
        &self,
        path: &StorePath,
    ) -> StoreResult<(ListenerId, mpsc::UnboundedReceiver<Snapshot>)> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.read(path)?;
        Ok(self.listeners.register(path, current))
    }

    fn off(&self, id: ListenerId) {
        if self.listeners.remove(id) {
            debug!(%id, "disk listener removed");
        }
    }

    fn push_key(&self, _path: &StorePath) -> String {
        self.push_keys.generate()
    }

    async fn set(&self, path: &StorePath, value: Value) -> StoreResult<()> {
        tree::validate(&value)?;
        let value = tree::normalize(value);

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(path, value)?;
        self.listeners.notify(path, |listening| {
            self.read(listening).unwrap_or_else(|err| {
                debug!(%err, path = %listening, "failed to read value for listener");
                Value::Null
            })
        });
        Ok(())
    }

    async fn get(&self, path: &StorePath) -> StoreResult<Value> {
        self.read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn subtree_round_trips_through_leaves() {
        let store = DiskStore::temporary().unwrap();
        let message = json!({"body": "hi", "time": "t", "sender": "7", "receiver": "12"});
        store.set(&path("c/k/-A"), message.clone()).await.unwrap();
        store.set(&path("c/k/typing/7"), json!(true)).await.unwrap();

        assert_eq!(store.get(&path("c/k/-A")).await.unwrap(), message);
        assert_eq!(store.get(&path("c/k/typing/7")).await.unwrap(), json!(true));
        assert_eq!(
            store.get(&path("c/k")).await.unwrap(),
            json!({"-A": message, "typing": {"7": true}})
        );
    }

    #[tokio::test]
    async fn set_replaces_previous_subtree() {
        let store = DiskStore::temporary().unwrap();
        store
            .set(&path("p"), json!({"a": {"x": 1, "y": 2}}))
            .await
            .unwrap();
        store.set(&path("p/a"), json!({"z": 3})).await.unwrap();
        assert_eq!(store.get(&path("p")).await.unwrap(), json!({"a": {"z": 3}}));

        store.set(&path("p/a"), Value::Null).await.unwrap();
        assert_eq!(store.get(&path("p")).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn leaf_is_replaced_by_nested_write() {
        let store = DiskStore::temporary().unwrap();
        store.set(&path("flag"), json!(true)).await.unwrap();
        store.set(&path("flag/nested"), json!(1)).await.unwrap();
        assert_eq!(
            store.get(&path("flag")).await.unwrap(),
            json!({"nested": 1})
        );
    }

    #[tokio::test]
    async fn sibling_prefixes_stay_separate() {
        let store = DiskStore::temporary().unwrap();
        store.set(&path("c/12~7/-A"), json!({"body": "a"})).await.unwrap();
        store.set(&path("c/12~70/-B"), json!({"body": "b"})).await.unwrap();
        assert_eq!(
            store.get(&path("c/12~7")).await.unwrap(),
            json!({"-A": {"body": "a"}})
        );
    }

    #[tokio::test]
    async fn listeners_follow_writes() {
        let store = DiskStore::temporary().unwrap();
        let (id, mut rx) = store.on_value(&path("c/k/typing/12")).unwrap();
        assert!(rx.recv().await.unwrap().is_null());

        store.set(&path("c/k/typing/12"), json!(true)).await.unwrap();
        assert!(rx.recv().await.unwrap().as_bool());

        store.off(id);
        store.set(&path("c/k/typing/12"), json!(false)).await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
