use chrono::SecondsFormat;
use db::models::attendance_record::parse_roster;
use db::models::session::fields;
use db::models::{AttendanceRecord, AttendanceStatus, SessionKey};
use db::realtime::Transition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::attendance_session::is_unlocked;
use crate::error::AttendanceError;
use crate::service::ServiceContext;

/// Who is being recorded. Optional fields are omitted from the stored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub student_id: String,
    pub student_name: String,
    #[serde(default)]
    pub matric_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl StudentIdentity {
    pub fn new(student_id: impl Into<String>, student_name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            student_name: student_name.into(),
            matric_number: None,
            email: None,
        }
    }

    pub fn with_matric_number(mut self, matric: impl Into<String>) -> Self {
        self.matric_number = Some(matric.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Per-status head count of one roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
    pub total: usize,
}

impl SessionSummary {
    pub fn from_roster(roster: &[AttendanceRecord]) -> Self {
        let mut summary = Self::default();
        for record in roster {
            match record.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Excused => summary.excused += 1,
            }
        }
        summary.total = roster.len();
        summary
    }
}

/// Student-facing writes and point reads on a session roster.
#[derive(Clone)]
pub struct SignInService {
    ctx: ServiceContext,
}

impl SignInService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record the student as PRESENT.
    ///
    /// The lock check and the write run as one store transaction on the
    /// session node: a lock that lands first makes this fail with
    /// [`AttendanceError::SessionLocked`] and nothing is written. A missing
    /// session counts as locked. Signing in again overwrites the entry.
    pub async fn sign_in(
        &self,
        key: &SessionKey,
        student: &StudentIdentity,
    ) -> Result<(), AttendanceError> {
        // Rejects ids that are not valid store keys before touching the store.
        key.student_path(&student.student_id)?;

        let now = self.ctx.clock.now();
        let record = AttendanceRecord {
            student_id: student.student_id.clone(),
            student_name: student.student_name.clone(),
            matric_number: student.matric_number.clone(),
            email: student.email.clone(),
            status: AttendanceStatus::Present,
            check_in_time: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            timestamp: Some(now.timestamp_millis()),
            auto_marked: None,
            marked_at: None,
            manually_marked: None,
        };
        let student_id = student.student_id.clone();

        let result = self
            .ctx
            .store
            .transact(
                &key.path(),
                Box::new(move |current| {
                    let Some(Value::Object(mut node)) = current else {
                        return Transition::Abort;
                    };
                    if !is_unlocked(&node) {
                        return Transition::Abort;
                    }
                    let roster = node
                        .entry(fields::STUDENTS)
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !roster.is_object() {
                        *roster = Value::Object(Map::new());
                    }
                    if let Some(entries) = roster.as_object_mut() {
                        entries.insert(student_id, record.to_value());
                    }
                    Transition::Commit(Some(Value::Object(node)))
                }),
            )
            .await?;

        if !result.committed {
            tracing::info!(
                "Rejected sign-in of {} to locked session {key}",
                student.student_id
            );
            return Err(AttendanceError::SessionLocked);
        }
        tracing::info!("Student {} signed in to {key}", student.student_id);
        Ok(())
    }

    /// Instructor override. Written regardless of lock state and flagged
    /// `manuallyMarked`.
    ///
    /// The first mark on a session nobody ever unlocked also stamps
    /// `firstUnlockTime` and `startTime` and flags `manualMarkSession`, so the
    /// class counts as held. Returns `true` for that first mark. The session
    /// stays locked either way.
    pub async fn mark_student_attendance(
        &self,
        key: &SessionKey,
        student: &StudentIdentity,
        status: AttendanceStatus,
    ) -> Result<bool, AttendanceError> {
        key.student_path(&student.student_id)?;
        let now = self.ctx.clock.now();
        let now_ms = now.timestamp_millis();
        let record = AttendanceRecord {
            student_id: student.student_id.clone(),
            student_name: student.student_name.clone(),
            matric_number: student.matric_number.clone(),
            email: student.email.clone(),
            status,
            check_in_time: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            timestamp: Some(now_ms),
            auto_marked: None,
            marked_at: None,
            manually_marked: Some(true),
        };
        let student_id = student.student_id.clone();
        let first = Arc::new(AtomicBool::new(false));
        let seen_first = first.clone();

        self.ctx
            .store
            .transact(
                &key.path(),
                Box::new(move |current| {
                    let mut node = match current {
                        Some(Value::Object(node)) => node,
                        _ => Map::new(),
                    };
                    let is_first = !node.contains_key(fields::FIRST_UNLOCK_TIME);
                    seen_first.store(is_first, Ordering::SeqCst);
                    if is_first {
                        node.insert(fields::FIRST_UNLOCK_TIME.into(), json!(now_ms));
                        node.insert(fields::START_TIME.into(), json!(now_ms));
                        node.insert(fields::MANUAL_MARK_SESSION.into(), json!(true));
                    }
                    let roster = node
                        .entry(fields::STUDENTS)
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !roster.is_object() {
                        *roster = Value::Object(Map::new());
                    }
                    if let Some(entries) = roster.as_object_mut() {
                        entries.insert(student_id, record.to_value());
                    }
                    Transition::Commit(Some(Value::Object(node)))
                }),
            )
            .await?;

        let first_mark = first.load(Ordering::SeqCst);
        tracing::info!(
            "Marked {} as {status} in {key} (first mark: {first_mark})",
            student.student_id
        );
        Ok(first_mark)
    }

    /// Whether any record exists for the student, whatever its status.
    pub async fn has_student_signed_in(
        &self,
        key: &SessionKey,
        student_id: &str,
    ) -> Result<bool, AttendanceError> {
        Ok(self.ctx.store.exists(&key.student_path(student_id)?).await?)
    }

    /// One-shot read of the roster.
    pub async fn roster(&self, key: &SessionKey) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let node = self.ctx.store.get(&key.roster_path()).await?;
        Ok(parse_roster(node.as_ref()))
    }

    pub async fn summary(&self, key: &SessionKey) -> Result<SessionSummary, AttendanceError> {
        Ok(SessionSummary::from_roster(&self.roster(key).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_session::SessionLifecycle;
    use chrono::{TimeZone, Utc};
    use db::realtime::{MemoryStore, RealtimeStore};
    use serde_json::json;
    use std::sync::Arc;
    use util::clock::ManualClock;

    struct Fixture {
        lifecycle: SessionLifecycle,
        sign_in: SignInService,
        store: MemoryStore,
        clock: ManualClock,
    }

    fn setup() -> Fixture {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 9, 5, 0).unwrap());
        let ctx = ServiceContext::new(Arc::new(store.clone()), Arc::new(clock.clone()));
        Fixture {
            lifecycle: SessionLifecycle::new(ctx.clone()),
            sign_in: SignInService::new(ctx),
            store,
            clock,
        }
    }

    fn key() -> SessionKey {
        SessionKey::parse("cs101_1", "2025-01-15").unwrap()
    }

    #[tokio::test]
    async fn sign_in_writes_present_record_with_timestamps() {
        let f = setup();
        f.lifecycle.unlock(&key()).await.unwrap();

        let ada = StudentIdentity::new("s1", "Ada").with_email("ada@uni.edu");
        f.sign_in.sign_in(&key(), &ada).await.unwrap();

        let entry = f
            .store
            .get(&key().student_path("s1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry["status"], json!("PRESENT"));
        assert_eq!(entry["checkInTime"], json!("2025-01-15T09:05:00.000Z"));
        assert_eq!(
            entry["timestamp"],
            json!(Utc.with_ymd_and_hms(2025, 1, 15, 9, 5, 0).unwrap().timestamp_millis())
        );
        assert_eq!(entry["email"], json!("ada@uni.edu"));
        assert!(entry.get("matricNumber").is_none());
        assert!(f.sign_in.has_student_signed_in(&key(), "s1").await.unwrap());
    }

    #[tokio::test]
    async fn sign_in_fails_on_locked_or_missing_session() {
        let f = setup();
        let ada = StudentIdentity::new("s1", "Ada");

        assert_eq!(
            f.sign_in.sign_in(&key(), &ada).await,
            Err(AttendanceError::SessionLocked)
        );
        assert_eq!(f.store.get(&key().path()).await.unwrap(), None);

        f.lifecycle.unlock(&key()).await.unwrap();
        f.lifecycle.lock(&key()).await.unwrap();
        assert_eq!(
            f.sign_in.sign_in(&key(), &ada).await,
            Err(AttendanceError::SessionLocked)
        );
        assert!(!f.sign_in.has_student_signed_in(&key(), "s1").await.unwrap());
    }

    #[tokio::test]
    async fn repeated_sign_in_keeps_one_entry() {
        let f = setup();
        f.lifecycle.unlock(&key()).await.unwrap();
        let ada = StudentIdentity::new("s1", "Ada");
        f.sign_in.sign_in(&key(), &ada).await.unwrap();
        f.sign_in.sign_in(&key(), &ada).await.unwrap();

        assert_eq!(f.sign_in.roster(&key()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn manual_mark_ignores_lock_and_flags_entry() {
        let f = setup();
        let bo = StudentIdentity::new("s2", "Bo").with_matric_number("A123");
        let first = f
            .sign_in
            .mark_student_attendance(&key(), &bo, AttendanceStatus::Excused)
            .await
            .unwrap();
        assert!(first);

        let roster = f.sign_in.roster(&key()).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].status, AttendanceStatus::Excused);
        assert_eq!(roster[0].manually_marked, Some(true));
        assert_eq!(roster[0].matric_number.as_deref(), Some("A123"));
        // the session itself stays locked
        assert!(f.lifecycle.session(&key()).await.unwrap().unwrap().is_locked);
    }

    #[tokio::test]
    async fn first_manual_mark_opens_the_class_record() {
        let f = setup();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 15, 9, 5, 0).unwrap();
        let ada = StudentIdentity::new("s1", "Ada");
        assert!(
            f.sign_in
                .mark_student_attendance(&key(), &ada, AttendanceStatus::Present)
                .await
                .unwrap()
        );

        f.clock.advance(chrono::Duration::minutes(3));
        let bo = StudentIdentity::new("s2", "Bo");
        assert!(
            !f.sign_in
                .mark_student_attendance(&key(), &bo, AttendanceStatus::Late)
                .await
                .unwrap()
        );

        let session = f.lifecycle.session(&key()).await.unwrap().unwrap();
        assert_eq!(session.first_unlock_time, Some(t0));
        assert_eq!(session.start_time, Some(t0));
        assert!(session.manual_mark_session);
        assert!(session.is_locked);
        assert_eq!(session.unlock_count, 0);
        assert_eq!(session.roster.len(), 2);
    }

    #[tokio::test]
    async fn manual_mark_after_unlock_keeps_unlock_stamps() {
        let f = setup();
        f.lifecycle.unlock(&key()).await.unwrap();
        f.clock.advance(chrono::Duration::minutes(1));

        let ada = StudentIdentity::new("s1", "Ada");
        let first = f
            .sign_in
            .mark_student_attendance(&key(), &ada, AttendanceStatus::Late)
            .await
            .unwrap();
        assert!(!first);

        let session = f.lifecycle.session(&key()).await.unwrap().unwrap();
        assert!(!session.manual_mark_session);
        assert!(!session.is_locked);
        assert_eq!(
            session.start_time,
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 9, 5, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn manually_marked_class_gets_absences_and_expires() {
        let f = setup();
        let ada = StudentIdentity::new("s1", "Ada");
        f.sign_in
            .mark_student_attendance(&key(), &ada, AttendanceStatus::Present)
            .await
            .unwrap();

        let enrolled = [
            db::models::EnrolledStudent::new("s1", "Ada"),
            db::models::EnrolledStudent::new("s2", "Bo"),
        ];
        assert_eq!(f.lifecycle.lock_and_mark_absent(&key(), &enrolled).await.unwrap(), 1);
        let summary = f.sign_in.summary(&key()).await.unwrap();
        assert_eq!((summary.present, summary.absent), (1, 1));

        f.clock.advance(chrono::Duration::days(30));
        assert_eq!(f.lifecycle.cleanup_expired_sessions(7).await.unwrap(), 1);
        assert!(f.lifecycle.session(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_student_id_is_rejected_before_writing() {
        let f = setup();
        f.lifecycle.unlock(&key()).await.unwrap();
        let bad = StudentIdentity::new("a/b", "Eve");
        assert!(matches!(
            f.sign_in.sign_in(&key(), &bad).await,
            Err(AttendanceError::Store(_))
        ));
        assert!(f.sign_in.roster(&key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_counts_each_status() {
        let f = setup();
        f.lifecycle.unlock(&key()).await.unwrap();
        f.sign_in
            .sign_in(&key(), &StudentIdentity::new("s1", "Ada"))
            .await
            .unwrap();
        let bo = StudentIdentity::new("s2", "Bo");
        f.sign_in
            .mark_student_attendance(&key(), &bo, AttendanceStatus::Late)
            .await
            .unwrap();
        f.store
            .set(&key().student_path("s3").unwrap(), json!({"status": "weird"}))
            .await
            .unwrap();

        let summary = f.sign_in.summary(&key()).await.unwrap();
        assert_eq!(
            summary,
            SessionSummary {
                present: 1,
                absent: 1,
                late: 1,
                excused: 0,
                total: 3
            }
        );
    }
}
