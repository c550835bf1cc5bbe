use sea_orm::DatabaseConnection;

use crate::realtime::{MemoryStore, SqliteStore};

/// Fresh, migrated in-memory SQLite database.
pub async fn setup_test_db() -> DatabaseConnection {
    crate::connect("sqlite::memory:")
        .await
        .expect("Failed to set up in-memory db")
}

pub async fn sqlite_store() -> SqliteStore {
    SqliteStore::new(setup_test_db().await)
}

pub fn memory_store() -> MemoryStore {
    MemoryStore::new()
}
