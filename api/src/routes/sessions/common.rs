use chrono::{DateTime, Utc};
use db::models::session::DATE_FORMAT;
use db::models::{AttendanceRecord, AttendanceStatus, Session, SessionKey};
use serde::{Deserialize, Serialize};

use crate::response::ApiError;

/// Resolve the `{schedule_id}/{date}` path pair into a session key.
pub fn session_key(schedule_id: &str, date: &str) -> Result<SessionKey, ApiError> {
    Ok(SessionKey::parse(schedule_id, date)?)
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub key: String,
    pub schedule_id: String,
    pub date: String,
    pub is_locked: bool,
    pub is_active: bool,
    pub unlock_count: i64,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub first_unlock_time: Option<String>,
    pub last_unlock_time: Option<String>,
    pub auto_lock_time: Option<String>,
    pub auto_locked_at: Option<String>,
    pub manual_mark_session: bool,
    pub roster: Vec<AttendanceRecord>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        let ts = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339());
        let date = s.date.format(DATE_FORMAT).to_string();
        Self {
            key: format!("{}_{date}", s.schedule_id),
            schedule_id: s.schedule_id,
            date,
            is_locked: s.is_locked,
            is_active: s.is_active,
            unlock_count: s.unlock_count,
            start_time: ts(s.start_time),
            end_time: ts(s.end_time),
            first_unlock_time: ts(s.first_unlock_time),
            last_unlock_time: ts(s.last_unlock_time),
            auto_lock_time: ts(s.auto_lock_time),
            auto_locked_at: ts(s.auto_locked_at),
            manual_mark_session: s.manual_mark_session,
            roster: s.roster,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct UnlockResponse {
    pub first_unlock: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct LockResponse {
    pub marked_absent: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct AutoLockResponse {
    pub locked: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct MarkResponse {
    pub first_mark: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct SignedInResponse {
    pub signed_in: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct LockQuery {
    /// Record enrolled students who never signed in as ABSENT before locking.
    pub mark_absent: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RosterQuery {
    /// List every enrolled student, absent ones included.
    pub merged: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SignInReq {
    pub student_id: String,
    pub student_name: String,
    pub matric_number: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceReq {
    pub student_name: String,
    pub status: AttendanceStatus,
    pub matric_number: Option<String>,
    pub email: Option<String>,
}
