use chrono::Duration;
use db::realtime::RealtimeStore;
use std::sync::Arc;
use util::clock::{Clock, SystemClock};

/// Window after an unlock before the session locks itself.
pub const DEFAULT_AUTO_LOCK_AFTER: Duration = Duration::minutes(20);

/// Handles every attendance service shares: the realtime store and the clock
/// used to stamp writes.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn RealtimeStore>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceContext {
    pub fn new(store: Arc<dyn RealtimeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Context on the wall clock.
    pub fn system(store: Arc<dyn RealtimeStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }
}
