use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use super::{
    ChangeHub, RealtimeStore, StoreError, StorePath, Subscription, Transaction,
    TransactionResult, Transition, resolve_update, tree,
};

/// In-process realtime store.
///
/// The whole tree lives behind one `RwLock`; every write holds the write half
/// while it mutates and notifies listeners, so listeners observe writes in
/// commit order. [`MemoryStore::disconnect`] simulates losing the connection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tree: Arc<RwLock<Value>>,
    hub: ChangeHub,
    offline: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an initial tree.
    pub fn with_tree(root: Value) -> Self {
        Self {
            tree: Arc::new(RwLock::new(tree::normalize(root).unwrap_or(Value::Null))),
            ..Self::default()
        }
    }

    /// Fail every subsequent operation and cancel all live listeners.
    pub fn disconnect(&self, reason: impl Into<String>) {
        let reason = reason.into();
        *self.offline.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.clone());
        self.hub.cancel_all(StoreError::Disconnected(reason));
    }

    pub fn reconnect(&self) {
        *self.offline.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Number of registered listeners; lets callers check nothing leaks.
    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        match &*self.offline.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn notify(&self, root: &Value, changed: &[StorePath]) {
        let values: HashMap<StorePath, Option<Value>> = self
            .hub
            .affected(changed)
            .into_iter()
            .map(|p| {
                let v = tree::read_at(root, p.segments());
                (p, v)
            })
            .collect();
        if !values.is_empty() {
            self.hub.deliver(&values);
        }
    }

    async fn write_all(&self, writes: Vec<(StorePath, Value)>) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut root = self.tree.write().await;
        let changed: Vec<StorePath> = writes.iter().map(|(p, _)| p.clone()).collect();
        for (path, value) in writes {
            tree::write_at(&mut root, path.segments(), Some(value));
        }
        self.notify(&root, &changed);
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.ensure_online()?;
        let root = self.tree.read().await;
        Ok(tree::read_at(&root, path.segments()))
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.write_all(vec![(path.clone(), value)]).await
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        let writes = resolve_update(path, fields)?;
        self.write_all(writes).await
    }

    async fn transact(
        &self,
        path: &StorePath,
        tx: Transaction,
    ) -> Result<TransactionResult, StoreError> {
        self.ensure_online()?;
        let mut root = self.tree.write().await;
        let current = tree::read_at(&root, path.segments());
        match tx(current.clone()) {
            Transition::Commit(next) => {
                tree::write_at(&mut root, path.segments(), next);
                self.notify(&root, std::slice::from_ref(path));
                Ok(TransactionResult {
                    committed: true,
                    snapshot: tree::read_at(&root, path.segments()),
                })
            }
            Transition::Abort => Ok(TransactionResult {
                committed: false,
                snapshot: current,
            }),
        }
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        self.ensure_online()?;
        // Holding the read guard keeps writers out until the listener is in place.
        let root = self.tree.read().await;
        let current = tree::read_at(&root, path.segments());
        Ok(self.hub.register(path.clone(), current))
    }
}
