use db::models::SessionKeyError;
use db::realtime::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttendanceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sign-in attempted while the session is locked or does not exist.
    #[error("Session is locked")]
    SessionLocked,

    #[error(transparent)]
    InvalidSessionKey(#[from] SessionKeyError),
}
