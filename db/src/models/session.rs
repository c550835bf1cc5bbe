use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::attendance_record::{AttendanceRecord, as_millis, parse_roster};
use crate::realtime::{StoreError, StorePath};

/// Top-level collection holding every session.
pub const SESSIONS_ROOT: &str = "sessions";

/// Calendar format of the date half of a session key.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field names of a session node under `sessions/{key}`.
pub mod fields {
    pub const IS_LOCKED: &str = "isLocked";
    pub const IS_ACTIVE: &str = "isActive";
    pub const START_TIME: &str = "startTime";
    pub const END_TIME: &str = "endTime";
    pub const FIRST_UNLOCK_TIME: &str = "firstUnlockTime";
    pub const LAST_UNLOCK_TIME: &str = "lastUnlockTime";
    pub const UNLOCK_COUNT: &str = "unlockCount";
    pub const AUTO_LOCK_TIME: &str = "autoLockTime";
    pub const AUTO_LOCKED_AT: &str = "autoLockedAt";
    /// Set when the session was opened by an instructor mark, not an unlock.
    pub const MANUAL_MARK_SESSION: &str = "manualMarkSession";
    pub const STUDENTS: &str = "students";
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionKeyError {
    #[error("schedule id '{0}' is not a valid store key")]
    InvalidScheduleId(String),
    #[error("'{0}' is not a YYYY-MM-DD date")]
    InvalidDate(String),
    #[error("'{0}' is not a {{scheduleId}}_{{date}} session key")]
    Malformed(String),
}

/// Identity of one session: a course-schedule occurrence on a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    schedule_id: String,
    date: NaiveDate,
}

impl SessionKey {
    pub fn new(schedule_id: impl Into<String>, date: NaiveDate) -> Result<Self, SessionKeyError> {
        let schedule_id = schedule_id.into();
        if StorePath::root().child(&schedule_id).is_err() {
            return Err(SessionKeyError::InvalidScheduleId(schedule_id));
        }
        Ok(Self { schedule_id, date })
    }

    /// Build a key from the raw strings screens pass around.
    pub fn parse(schedule_id: &str, date: &str) -> Result<Self, SessionKeyError> {
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| SessionKeyError::InvalidDate(date.to_string()))?;
        Self::new(schedule_id, date)
    }

    pub fn schedule_id(&self) -> &str {
        &self.schedule_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Course code: the schedule id up to its first `_` (`comp2001_1` → `comp2001`).
    pub fn course_id(&self) -> &str {
        self.schedule_id
            .split_once('_')
            .map_or(self.schedule_id.as_str(), |(course, _)| course)
    }

    /// `sessions/{scheduleId}_{date}`
    pub fn path(&self) -> StorePath {
        sessions_path()
            .child(&self.to_string())
            .unwrap_or_else(|_| unreachable!("schedule id validated on construction"))
    }

    pub fn field_path(&self, field: &str) -> Result<StorePath, StoreError> {
        self.path().child(field)
    }

    pub fn roster_path(&self) -> StorePath {
        self.path()
            .child(fields::STUDENTS)
            .unwrap_or_else(|_| unreachable!("constant segment"))
    }

    pub fn lock_path(&self) -> StorePath {
        self.path()
            .child(fields::IS_LOCKED)
            .unwrap_or_else(|_| unreachable!("constant segment"))
    }

    pub fn student_path(&self, student_id: &str) -> Result<StorePath, StoreError> {
        self.roster_path().child(student_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.schedule_id, self.date.format(DATE_FORMAT))
    }
}

impl FromStr for SessionKey {
    type Err = SessionKeyError;

    /// Split at the last `_`; schedule ids may themselves contain `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (schedule_id, date) = s
            .rsplit_once('_')
            .ok_or_else(|| SessionKeyError::Malformed(s.to_string()))?;
        Self::parse(schedule_id, date)
    }
}

pub fn sessions_path() -> StorePath {
    StorePath::root()
        .child(SESSIONS_ROOT)
        .unwrap_or_else(|_| unreachable!("constant segment"))
}

/// Decoded snapshot of a session node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub schedule_id: String,
    pub date: NaiveDate,
    /// Missing means locked.
    pub is_locked: bool,
    pub is_active: bool,
    pub first_unlock_time: Option<DateTime<Utc>>,
    pub last_unlock_time: Option<DateTime<Utc>>,
    pub unlock_count: i64,
    /// `None` when unset or zero.
    pub auto_lock_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub auto_locked_at: Option<DateTime<Utc>>,
    pub manual_mark_session: bool,
    pub roster: Vec<AttendanceRecord>,
}

impl Session {
    pub fn from_value(key: &SessionKey, node: &Value) -> Self {
        let time = |name: &str| {
            node.get(name)
                .and_then(as_millis)
                .filter(|ms| *ms > 0)
                .and_then(DateTime::from_timestamp_millis)
        };

        Self {
            schedule_id: key.schedule_id().to_string(),
            date: key.date(),
            is_locked: node
                .get(fields::IS_LOCKED)
                .and_then(Value::as_bool)
                .unwrap_or(true),
            is_active: node
                .get(fields::IS_ACTIVE)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            first_unlock_time: time(fields::FIRST_UNLOCK_TIME),
            last_unlock_time: time(fields::LAST_UNLOCK_TIME),
            unlock_count: node.get(fields::UNLOCK_COUNT).and_then(as_millis).unwrap_or(0),
            auto_lock_time: time(fields::AUTO_LOCK_TIME),
            start_time: time(fields::START_TIME),
            end_time: time(fields::END_TIME),
            auto_locked_at: time(fields::AUTO_LOCKED_AT),
            manual_mark_session: node
                .get(fields::MANUAL_MARK_SESSION)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            roster: parse_roster(node.get(fields::STUDENTS)),
        }
    }

    pub fn was_ever_unlocked(&self) -> bool {
        self.first_unlock_time.is_some()
    }
}
