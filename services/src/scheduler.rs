//! Background jobs: the auto-lock poller and the retention sweeper.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::attendance_session::SessionLifecycle;
use crate::enrollment::EnrollmentProvider;
use crate::error::AttendanceError;

/// Periodically runs the auto-lock check on every open session, so deadlines
/// fire even when no screen is watching the session.
#[derive(Clone)]
pub struct AutoLockPoller {
    lifecycle: SessionLifecycle,
    enrollment: Arc<dyn EnrollmentProvider>,
    every: Duration,
}

impl AutoLockPoller {
    pub fn new(
        lifecycle: SessionLifecycle,
        enrollment: Arc<dyn EnrollmentProvider>,
        every: Duration,
    ) -> Self {
        Self {
            lifecycle,
            enrollment,
            every,
        }
    }

    /// One pass over the open sessions. Returns how many were auto-locked.
    ///
    /// A session that fails is logged and skipped; only failing to list the
    /// open sessions aborts the pass.
    pub async fn poll_once(&self) -> Result<usize, AttendanceError> {
        let mut locked = 0;
        for key in self.lifecycle.open_sessions().await? {
            let enrolled = match self.enrollment.enrolled_students(key.course_id()).await {
                Ok(students) => students,
                Err(e) => {
                    tracing::warn!("No enrollment for {key}, locking without absences: {e}");
                    Vec::new()
                }
            };
            match self.lifecycle.check_and_auto_lock(&key, &enrolled).await {
                Ok(true) => locked += 1,
                Ok(false) => {}
                Err(e) => tracing::error!("Auto-lock check failed for {key}: {e}"),
            }
        }
        Ok(locked)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Auto-lock poller running every {:?}", self.every);
            loop {
                tokio::time::sleep(self.every).await;
                match self.poll_once().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Auto-locked {n} sessions"),
                    Err(e) => tracing::error!("Auto-lock poll failed: {e}"),
                }
            }
        })
    }
}

/// Periodically deletes sessions past the retention window.
#[derive(Clone)]
pub struct RetentionSweeper {
    lifecycle: SessionLifecycle,
    days: i64,
    every: Duration,
}

impl RetentionSweeper {
    pub fn new(lifecycle: SessionLifecycle, days: i64, every: Duration) -> Self {
        Self {
            lifecycle,
            days,
            every,
        }
    }

    pub async fn sweep_once(&self) -> Result<usize, AttendanceError> {
        self.lifecycle.cleanup_expired_sessions(self.days).await
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.sweep_once().await {
                    tracing::error!("Retention sweep failed: {e}");
                }
                tokio::time::sleep(self.every).await;
            }
        })
    }
}
