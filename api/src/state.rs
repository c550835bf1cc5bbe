use chrono::Duration;
use db::realtime::{MemoryStore, RealtimeStore, SqliteStore};
use sea_orm::DbErr;
use services::attendance_record::SignInService;
use services::attendance_session::SessionLifecycle;
use services::enrollment::StoreEnrollment;
use services::roster_publisher::RosterPublisher;
use services::service::ServiceContext;
use std::sync::Arc;
use util::clock::{Clock, SystemClock};
use util::config::{self, StoreBackend};
use util::paths;

/// Everything a handler needs: the store and the services composed over it.
///
/// Built once by the composition root and cloned into every request.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RealtimeStore>,
    lifecycle: SessionLifecycle,
    sign_in: SignInService,
    publisher: RosterPublisher,
    enrollment: StoreEnrollment,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        clock: Arc<dyn Clock>,
        auto_lock_after: Duration,
    ) -> Self {
        let ctx = ServiceContext::new(store.clone(), clock);
        Self {
            lifecycle: SessionLifecycle::new(ctx.clone()).with_auto_lock_after(auto_lock_after),
            sign_in: SignInService::new(ctx.clone()),
            publisher: RosterPublisher::new(ctx),
            enrollment: StoreEnrollment::new(store.clone()),
            store,
        }
    }

    /// State on the wall clock with the configured auto-lock window.
    pub fn from_config(store: Arc<dyn RealtimeStore>) -> Self {
        Self::new(
            store,
            Arc::new(SystemClock),
            Duration::minutes(config::auto_lock_minutes()),
        )
    }

    pub fn store(&self) -> &Arc<dyn RealtimeStore> {
        &self.store
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn sign_in(&self) -> &SignInService {
        &self.sign_in
    }

    pub fn publisher(&self) -> &RosterPublisher {
        &self.publisher
    }

    pub fn enrollment(&self) -> &StoreEnrollment {
        &self.enrollment
    }
}

/// Open the configured realtime store. SQLite databases are migrated on open.
pub async fn build_store(
    backend: StoreBackend,
    database_path: &str,
) -> Result<Arc<dyn RealtimeStore>, DbErr> {
    match backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; nothing survives a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let url = paths::database_url(database_path)
                .map_err(|e| DbErr::Custom(format!("Cannot prepare {database_path}: {e}")))?;
            let db = db::connect(&url).await?;
            tracing::info!("Realtime store backed by {url}");
            Ok(Arc::new(SqliteStore::new(db)))
        }
    }
}
