use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    ChangeHub, RealtimeStore, StoreError, StorePath, Subscription, Transaction,
    TransactionResult, Transition, resolve_update, tree,
};
use crate::models::realtime_document::{ActiveModel, Column, Entity, Model};

/// Realtime store persisted in SQLite through sea-orm.
///
/// Every child of a top-level collection is one `realtime_documents` row.
/// Writes load the rows they touch inside a database transaction, apply the
/// change to the in-memory subtree and write the rows back. A process-wide
/// gate serializes writes so listeners see them in commit order.
#[derive(Clone)]
pub struct SqliteStore {
    db: DatabaseConnection,
    hub: ChangeHub,
    gate: Arc<Mutex<()>>,
}

/// Rows a write needs to load and persist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Scope {
    Collection(String),
    Document(String, String),
}

impl SqliteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            hub: ChangeHub::new(),
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }

    fn scopes_for(targets: &[StorePath]) -> Result<Vec<Scope>, StoreError> {
        let mut collections = BTreeSet::new();
        let mut documents = BTreeSet::new();
        for path in targets {
            match path.segments() {
                [] => {
                    return Err(StoreError::InvalidPath(
                        "cannot write the store root".into(),
                    ));
                }
                [collection] => {
                    collections.insert(collection.clone());
                }
                [collection, key, ..] => {
                    documents.insert((collection.clone(), key.clone()));
                }
            }
        }
        let mut scopes: Vec<Scope> = collections.iter().cloned().map(Scope::Collection).collect();
        scopes.extend(
            documents
                .into_iter()
                .filter(|(c, _)| !collections.contains(c))
                .map(|(c, k)| Scope::Document(c, k)),
        );
        Ok(scopes)
    }

    fn assemble(rows: Vec<Model>) -> Result<Value, StoreError> {
        let mut root = Value::Null;
        for row in rows {
            let body: Value = serde_json::from_str(&row.body)?;
            tree::write_at(&mut root, &[row.collection, row.doc_key], Some(body));
        }
        Ok(root)
    }

    async fn load_path(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        match path.segments() {
            [] => {
                let rows = Entity::find().all(&self.db).await?;
                Ok(tree::read_at(&Self::assemble(rows)?, &[]))
            }
            [collection] => {
                let rows = Entity::find()
                    .filter(Column::Collection.eq(collection.as_str()))
                    .all(&self.db)
                    .await?;
                Ok(tree::read_at(&Self::assemble(rows)?, path.segments()))
            }
            [collection, key, rest @ ..] => {
                let row = Entity::find_by_id((collection.clone(), key.clone()))
                    .one(&self.db)
                    .await?;
                match row {
                    Some(row) => {
                        let doc: Value = serde_json::from_str(&row.body)?;
                        Ok(tree::read_at(&doc, rest))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    async fn load_scopes(txn: &DatabaseTransaction, scopes: &[Scope]) -> Result<Value, StoreError> {
        let mut rows = Vec::new();
        for scope in scopes {
            match scope {
                Scope::Collection(c) => {
                    rows.extend(
                        Entity::find()
                            .filter(Column::Collection.eq(c.as_str()))
                            .all(txn)
                            .await?,
                    );
                }
                Scope::Document(c, k) => {
                    if let Some(row) = Entity::find_by_id((c.clone(), k.clone())).one(txn).await? {
                        rows.push(row);
                    }
                }
            }
        }
        Self::assemble(rows)
    }

    async fn upsert(
        txn: &DatabaseTransaction,
        collection: &str,
        key: &str,
        body: &Value,
    ) -> Result<(), StoreError> {
        let row = ActiveModel {
            collection: Set(collection.to_string()),
            doc_key: Set(key.to_string()),
            body: Set(serde_json::to_string(body)?),
            updated_at: Set(Utc::now()),
        };
        Entity::insert(row)
            .on_conflict(
                OnConflict::columns([Column::Collection, Column::DocKey])
                    .update_columns([Column::Body, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(txn)
            .await?;
        Ok(())
    }

    async fn persist_scopes(
        txn: &DatabaseTransaction,
        scopes: &[Scope],
        local: &Value,
    ) -> Result<(), StoreError> {
        for scope in scopes {
            match scope {
                Scope::Collection(c) => {
                    Entity::delete_many()
                        .filter(Column::Collection.eq(c.as_str()))
                        .exec(txn)
                        .await?;
                    if let Some(Value::Object(children)) = tree::get_at(local, &[c.clone()]) {
                        for (key, body) in children {
                            Self::upsert(txn, c, key, body).await?;
                        }
                    }
                }
                Scope::Document(c, k) => match tree::get_at(local, &[c.clone(), k.clone()]) {
                    Some(body) => Self::upsert(txn, c, k, body).await?,
                    None => {
                        Entity::delete_by_id((c.clone(), k.clone())).exec(txn).await?;
                    }
                },
            }
        }
        Ok(())
    }

    /// Load the rows under `targets`, let `mutate` change them, persist if it
    /// reports a change, then notify listeners.
    async fn run_write<F, R>(&self, targets: Vec<StorePath>, mutate: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Value) -> (R, bool) + Send,
        R: Send,
    {
        let scopes = Self::scopes_for(&targets)?;
        let _gate = self.gate.lock().await;

        let txn = self.db.begin().await?;
        let mut local = Self::load_scopes(&txn, &scopes).await?;
        let (result, changed) = mutate(&mut local);
        if !changed {
            txn.rollback().await?;
            return Ok(result);
        }
        Self::persist_scopes(&txn, &scopes, &local).await?;
        txn.commit().await?;

        let mut values = HashMap::new();
        for path in self.hub.affected(&targets) {
            match self.load_path(&path).await {
                Ok(value) => {
                    values.insert(path, value);
                }
                Err(e) => {
                    tracing::warn!("Listeners on {path} not refreshed after commit: {e}");
                }
            }
        }
        if !values.is_empty() {
            self.hub.deliver(&values);
        }
        Ok(result)
    }
}

#[async_trait]
impl RealtimeStore for SqliteStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.load_path(path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let target = path.clone();
        self.run_write(vec![path.clone()], move |local| {
            tree::write_at(local, target.segments(), Some(value));
            ((), true)
        })
        .await
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        let writes = resolve_update(path, fields)?;
        let targets = writes.iter().map(|(p, _)| p.clone()).collect();
        self.run_write(targets, move |local| {
            for (target, value) in writes {
                tree::write_at(local, target.segments(), Some(value));
            }
            ((), true)
        })
        .await
    }

    async fn transact(
        &self,
        path: &StorePath,
        tx: Transaction,
    ) -> Result<TransactionResult, StoreError> {
        let target = path.clone();
        self.run_write(vec![path.clone()], move |local| {
            let current = tree::read_at(local, target.segments());
            match tx(current.clone()) {
                Transition::Commit(next) => {
                    tree::write_at(local, target.segments(), next);
                    let snapshot = tree::read_at(local, target.segments());
                    (
                        TransactionResult {
                            committed: true,
                            snapshot,
                        },
                        true,
                    )
                }
                Transition::Abort => (
                    TransactionResult {
                        committed: false,
                        snapshot: current,
                    },
                    false,
                ),
            }
        })
        .await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let _gate = self.gate.lock().await;
        let current = self.load_path(path).await?;
        Ok(self.hub.register(path.clone(), current))
    }
}
