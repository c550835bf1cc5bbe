//! Realtime key-path tree store.
//!
//! The store is a JSON tree addressed by [`StorePath`]s. It offers point reads,
//! whole-value writes, atomic multi-field updates, a single-subtree
//! read-modify-write [`RealtimeStore::transact`], and value listeners that fire
//! with the current value on registration and again on every change to their
//! subtree. Writing `null` removes a node; empty objects never persist.

mod hub;
mod memory;
mod path;
mod sqlite;
pub mod tree;

pub use hub::{ChangeEvent, ChangeHub, Subscription};
pub use memory::MemoryStore;
pub use path::StorePath;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use sea_orm::DbErr;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("invalid store path: {0}")]
    InvalidPath(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("listener cancelled: {0}")]
    Disconnected(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<DbErr> for StoreError {
    fn from(e: DbErr) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// What a transaction handler decided after seeing the current value.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Replace the subtree with this value (`None` removes it).
    Commit(Option<Value>),
    /// Leave the subtree untouched.
    Abort,
}

/// Read-modify-write handler passed to [`RealtimeStore::transact`].
pub type Transaction = Box<dyn FnOnce(Option<Value>) -> Transition + Send>;

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionResult {
    pub committed: bool,
    /// Value at the transaction path after the transaction ran.
    pub snapshot: Option<Value>,
}

#[async_trait]
pub trait RealtimeStore: Send + Sync + 'static {
    /// Value at `path`, or `None` when nothing is stored there.
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Replace the value at `path`. `Value::Null` removes it.
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Apply every `(relative path, value)` pair under `path` as one atomic
    /// write. Keys may span several segments (`"students/abc"`).
    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Run `tx` against the current value at `path` with no other write able
    /// to interleave.
    async fn transact(
        &self,
        path: &StorePath,
        tx: Transaction,
    ) -> Result<TransactionResult, StoreError>;

    /// Register a value listener on `path`.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError>;

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.set(path, Value::Null).await
    }

    async fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        Ok(self.get(path).await?.is_some())
    }
}

/// Resolve `update` keys into absolute write targets, validating all of them
/// before anything is written.
pub(crate) fn resolve_update(
    base: &StorePath,
    fields: Map<String, Value>,
) -> Result<Vec<(StorePath, Value)>, StoreError> {
    fields
        .into_iter()
        .map(|(key, value)| Ok((base.join(&key)?, value)))
        .collect()
}
