use chrono::Duration;
use db::models::attendance_record::{as_millis, parse_roster};
use db::models::session::{fields, sessions_path};
use db::models::{AttendanceRecord, AttendanceStatus, EnrolledStudent, Session, SessionKey};
use db::realtime::Transition;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AttendanceError;
use crate::service::{DEFAULT_AUTO_LOCK_AFTER, ServiceContext};

/// Lock state machine of one attendance session.
///
/// A session starts locked. [`SessionLifecycle::unlock`] opens it for
/// sign-in and arms an auto-lock deadline; an explicit lock or the deadline
/// passing closes it again.
#[derive(Clone)]
pub struct SessionLifecycle {
    ctx: ServiceContext,
    auto_lock_after: Duration,
}

impl SessionLifecycle {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            auto_lock_after: DEFAULT_AUTO_LOCK_AFTER,
        }
    }

    pub fn with_auto_lock_after(mut self, window: Duration) -> Self {
        self.auto_lock_after = window;
        self
    }

    pub fn auto_lock_after(&self) -> Duration {
        self.auto_lock_after
    }

    /// Open the session for sign-in.
    ///
    /// Returns `true` when this is the first unlock the session has ever seen,
    /// in which case `firstUnlockTime` and `startTime` are stamped too. Every
    /// unlock bumps `unlockCount` and re-arms `autoLockTime`.
    pub async fn unlock(&self, key: &SessionKey) -> Result<bool, AttendanceError> {
        let now = self.ctx.clock.now_millis();
        let deadline = now + self.auto_lock_after.num_milliseconds();
        let first = Arc::new(AtomicBool::new(false));

        let seen_first = first.clone();
        let result = self
            .ctx
            .store
            .transact(
                &key.path(),
                Box::new(move |current| {
                    let mut node = into_object(current);
                    let is_first = !node.contains_key(fields::FIRST_UNLOCK_TIME);
                    seen_first.store(is_first, Ordering::SeqCst);

                    let count = node
                        .get(fields::UNLOCK_COUNT)
                        .and_then(as_millis)
                        .unwrap_or(0);
                    node.insert(fields::IS_LOCKED.into(), json!(false));
                    node.insert(fields::IS_ACTIVE.into(), json!(true));
                    node.insert(fields::LAST_UNLOCK_TIME.into(), json!(now));
                    node.insert(fields::UNLOCK_COUNT.into(), json!(count + 1));
                    node.insert(fields::AUTO_LOCK_TIME.into(), json!(deadline));
                    if is_first {
                        node.insert(fields::FIRST_UNLOCK_TIME.into(), json!(now));
                        node.insert(fields::START_TIME.into(), json!(now));
                    }
                    Transition::Commit(Some(Value::Object(node)))
                }),
            )
            .await?;

        let was_first = first.load(Ordering::SeqCst);
        let count = result
            .snapshot
            .as_ref()
            .and_then(|s| s.get(fields::UNLOCK_COUNT))
            .and_then(as_millis)
            .unwrap_or(0);
        tracing::info!("Session {key} unlocked. First time: {was_first}, unlock count: {count}");
        Ok(was_first)
    }

    /// Close the session. Only `isLocked`, `isActive` and `endTime` change.
    pub async fn lock(&self, key: &SessionKey) -> Result<(), AttendanceError> {
        let mut update = Map::new();
        update.insert(fields::IS_LOCKED.into(), json!(true));
        update.insert(fields::IS_ACTIVE.into(), json!(false));
        update.insert(fields::END_TIME.into(), json!(self.ctx.clock.now_millis()));
        self.ctx.store.update(&key.path(), update).await?;
        tracing::info!("Session {key} locked");
        Ok(())
    }

    /// Lock the session after recording everyone enrolled who never signed in
    /// as ABSENT.
    ///
    /// Absences are only written for sessions that were unlocked at least once
    /// and when `enrolled` is non-empty. Returns how many were written.
    pub async fn lock_and_mark_absent(
        &self,
        key: &SessionKey,
        enrolled: &[EnrolledStudent],
    ) -> Result<usize, AttendanceError> {
        let mut marked = 0;
        if !enrolled.is_empty() {
            if let Some(session) = self.session(key).await? {
                if session.was_ever_unlocked() {
                    let present = roster_ids(&session.roster);
                    marked = self.mark_absentees(key, enrolled, &present).await;
                }
            }
        }
        self.lock(key).await?;
        Ok(marked)
    }

    /// Lock the session if its auto-lock deadline has passed.
    ///
    /// The deadline check and the lock happen in one store transaction, so
    /// concurrent callers trigger at most one transition. Returns `true` only
    /// for the caller that performed it. Enrolled students missing from the
    /// roster are then written as auto-marked absences; failures there are
    /// logged and skipped.
    pub async fn check_and_auto_lock(
        &self,
        key: &SessionKey,
        enrolled: &[EnrolledStudent],
    ) -> Result<bool, AttendanceError> {
        let now = self.ctx.clock.now_millis();
        let result = self
            .ctx
            .store
            .transact(
                &key.path(),
                Box::new(move |current| {
                    let Some(Value::Object(mut node)) = current else {
                        return Transition::Abort;
                    };
                    let deadline = node
                        .get(fields::AUTO_LOCK_TIME)
                        .and_then(as_millis)
                        .unwrap_or(0);
                    if !is_unlocked(&node) || deadline == 0 || now < deadline {
                        return Transition::Abort;
                    }
                    node.insert(fields::IS_LOCKED.into(), json!(true));
                    node.insert(fields::IS_ACTIVE.into(), json!(false));
                    node.insert(fields::AUTO_LOCKED_AT.into(), json!(now));
                    Transition::Commit(Some(Value::Object(node)))
                }),
            )
            .await?;

        if !result.committed {
            return Ok(false);
        }
        tracing::info!("Session {key} auto-locked");

        let snapshot = result.snapshot.unwrap_or(Value::Null);
        let roster = parse_roster(snapshot.get(fields::STUDENTS));
        let mut present = roster_ids(&roster);
        if let Some(Value::Object(entries)) = snapshot.get(fields::STUDENTS) {
            present.extend(entries.keys().cloned());
        }
        let marked = self.mark_absentees(key, enrolled, &present).await;
        if marked > 0 {
            tracing::info!("Marked {marked} students absent in {key}");
        }
        Ok(true)
    }

    /// Current snapshot of the session, `None` if it was never written.
    pub async fn session(&self, key: &SessionKey) -> Result<Option<Session>, AttendanceError> {
        let node = self.ctx.store.get(&key.path()).await?;
        Ok(node.map(|n| Session::from_value(key, &n)))
    }

    /// Keys of every session currently unlocked.
    pub async fn open_sessions(&self) -> Result<Vec<SessionKey>, AttendanceError> {
        let Some(Value::Object(all)) = self.ctx.store.get(&sessions_path()).await? else {
            return Ok(Vec::new());
        };
        let mut open = Vec::new();
        for (raw, node) in &all {
            if !node.as_object().is_some_and(is_unlocked) {
                continue;
            }
            match raw.parse::<SessionKey>() {
                Ok(key) => open.push(key),
                Err(e) => tracing::warn!("Ignoring unparseable session key '{raw}': {e}"),
            }
        }
        Ok(open)
    }

    /// Delete sessions whose `startTime` is older than `days` days.
    ///
    /// Sessions without a positive `startTime` (never opened) are kept. A
    /// window reaching past the representable calendar deletes nothing.
    pub async fn cleanup_expired_sessions(&self, days: i64) -> Result<usize, AttendanceError> {
        let Some(cutoff) = Duration::try_days(days)
            .and_then(|window| self.ctx.clock.now().checked_sub_signed(window))
            .map(|t| t.timestamp_millis())
        else {
            tracing::warn!("Retention window of {days} days is out of range; nothing removed");
            return Ok(0);
        };
        let root = sessions_path();
        let Some(Value::Object(all)) = self.ctx.store.get(&root).await? else {
            return Ok(0);
        };

        let mut removed = 0;
        for (raw, node) in &all {
            let start = node
                .get(fields::START_TIME)
                .and_then(as_millis)
                .unwrap_or(0);
            if start > 0 && start < cutoff {
                self.ctx.store.remove(&root.child(raw)?).await?;
                removed += 1;
            }
        }
        tracing::info!("Cleaned up {removed} sessions older than {days} days");
        Ok(removed)
    }

    /// Write an auto-marked ABSENT record for every enrolled student not in
    /// `present`. A record that appeared in the meantime is left alone.
    async fn mark_absentees(
        &self,
        key: &SessionKey,
        enrolled: &[EnrolledStudent],
        present: &HashSet<String>,
    ) -> usize {
        let now = self.ctx.clock.now_millis();
        let mut marked = 0;
        for student in enrolled.iter().filter(|s| !present.contains(&s.student_id)) {
            let path = match key.student_path(&student.student_id) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("Cannot mark {} absent in {key}: {e}", student.student_id);
                    continue;
                }
            };
            let record = absent_record(student, now).to_value();
            let written = self
                .ctx
                .store
                .transact(
                    &path,
                    Box::new(move |current| match current {
                        Some(_) => Transition::Abort,
                        None => Transition::Commit(Some(record)),
                    }),
                )
                .await;
            match written {
                Ok(r) if r.committed => marked += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to mark {} absent in {key}: {e}", student.student_id)
                }
            }
        }
        marked
    }
}

fn into_object(current: Option<Value>) -> Map<String, Value> {
    match current {
        Some(Value::Object(node)) => node,
        _ => Map::new(),
    }
}

fn roster_ids(roster: &[AttendanceRecord]) -> HashSet<String> {
    roster.iter().map(|r| r.student_id.clone()).collect()
}

fn absent_record(student: &EnrolledStudent, now: i64) -> AttendanceRecord {
    AttendanceRecord {
        student_id: student.student_id.clone(),
        student_name: student.student_name.clone(),
        matric_number: None,
        email: None,
        status: AttendanceStatus::Absent,
        check_in_time: None,
        timestamp: None,
        auto_marked: Some(true),
        marked_at: Some(now),
        manually_marked: None,
    }
}

/// Open for sign-in only on an explicit `isLocked: false`; missing means locked.
pub(crate) fn is_unlocked(node: &Map<String, Value>) -> bool {
    node.get(fields::IS_LOCKED).and_then(Value::as_bool) == Some(false)
}
