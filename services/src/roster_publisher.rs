//! Live views over a session.
//!
//! Every stream yields its fallback value immediately, before the store
//! listener is even registered, then one item per change. If the listener is
//! cancelled (or cannot be registered) the stream yields the fallback once
//! more, then the error, then ends. Dropping a stream releases its listener.

use db::models::attendance_record::parse_roster;
use db::models::{AttendanceRecord, AttendanceStatus, EnrolledStudent, SessionKey};
use db::realtime::{ChangeEvent, RealtimeStore, StoreError, StorePath, Subscription};
use futures::Stream;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::AttendanceError;
use crate::service::ServiceContext;

type Decode<T> = Box<dyn Fn(Option<Value>) -> T + Send + Sync>;

enum Phase {
    /// Nothing emitted yet.
    Initial(BoxFuture<'static, Result<Subscription, StoreError>>),
    Connecting(BoxFuture<'static, Result<Subscription, StoreError>>),
    Live(Subscription),
    Failing(StoreError),
    Done,
}

/// A store listener decoded into `T`.
pub struct LiveStream<T> {
    phase: Phase,
    fallback: T,
    decode: Decode<T>,
}

pub type RosterStream = LiveStream<Vec<AttendanceRecord>>;
pub type LockStatusStream = LiveStream<bool>;

impl<T> LiveStream<T> {
    fn new(store: Arc<dyn RealtimeStore>, path: StorePath, fallback: T, decode: Decode<T>) -> Self {
        let connect: BoxFuture<'static, _> = Box::pin(async move { store.subscribe(&path).await });
        Self {
            phase: Phase::Initial(connect),
            fallback,
            decode,
        }
    }

    /// Stop listening. Same as dropping the stream.
    pub fn unsubscribe(self) {}
}

impl<T: Clone + Unpin> Stream for LiveStream<T> {
    type Item = Result<T, AttendanceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match std::mem::replace(&mut this.phase, Phase::Done) {
                Phase::Initial(connect) => {
                    this.phase = Phase::Connecting(connect);
                    return Poll::Ready(Some(Ok(this.fallback.clone())));
                }
                Phase::Connecting(mut connect) => match connect.as_mut().poll(cx) {
                    Poll::Pending => {
                        this.phase = Phase::Connecting(connect);
                        return Poll::Pending;
                    }
                    Poll::Ready(Ok(sub)) => this.phase = Phase::Live(sub),
                    Poll::Ready(Err(e)) => {
                        tracing::warn!("Could not start listener: {e}");
                        this.phase = Phase::Failing(e);
                        return Poll::Ready(Some(Ok(this.fallback.clone())));
                    }
                },
                Phase::Live(mut sub) => match sub.poll_recv(cx) {
                    Poll::Pending => {
                        this.phase = Phase::Live(sub);
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(ChangeEvent::Value(v))) => {
                        this.phase = Phase::Live(sub);
                        return Poll::Ready(Some(Ok((this.decode)(v))));
                    }
                    Poll::Ready(Some(ChangeEvent::Cancelled(e))) => {
                        tracing::warn!("Listener on {} cancelled: {e}", sub.path());
                        this.phase = Phase::Failing(e);
                        return Poll::Ready(Some(Ok(this.fallback.clone())));
                    }
                    Poll::Ready(None) => {
                        let e = StoreError::Disconnected(format!(
                            "listener on {} closed",
                            sub.path()
                        ));
                        this.phase = Phase::Failing(e);
                        return Poll::Ready(Some(Ok(this.fallback.clone())));
                    }
                },
                Phase::Failing(e) => return Poll::Ready(Some(Err(e.into()))),
                Phase::Done => return Poll::Ready(None),
            }
        }
    }
}

/// Every enrolled student in enrollment order, taking their roster entry
/// where one exists and an ABSENT placeholder otherwise. Students on the
/// roster but not enrolled are left out. With nobody enrolled the roster is
/// returned as is.
pub fn merge_with_enrollment(
    enrolled: &[EnrolledStudent],
    roster: Vec<AttendanceRecord>,
) -> Vec<AttendanceRecord> {
    if enrolled.is_empty() {
        return roster;
    }
    let mut by_id: HashMap<String, AttendanceRecord> = roster
        .into_iter()
        .map(|r| (r.student_id.clone(), r))
        .collect();
    enrolled
        .iter()
        .map(|s| {
            by_id.remove(&s.student_id).unwrap_or_else(|| AttendanceRecord {
                student_id: s.student_id.clone(),
                student_name: s.student_name.clone(),
                matric_number: None,
                email: None,
                status: AttendanceStatus::Absent,
                check_in_time: None,
                timestamp: None,
                auto_marked: None,
                marked_at: None,
                manually_marked: None,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct RosterPublisher {
    ctx: ServiceContext,
}

impl RosterPublisher {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Roster as it changes; `[]` first.
    pub fn roster_stream(&self, key: &SessionKey) -> RosterStream {
        LiveStream::new(
            self.ctx.store.clone(),
            key.roster_path(),
            Vec::new(),
            Box::new(|v| parse_roster(v.as_ref())),
        )
    }

    /// `isLocked` as it changes; `true` first. Missing or non-boolean reads
    /// as locked.
    pub fn lock_status_stream(&self, key: &SessionKey) -> LockStatusStream {
        LiveStream::new(
            self.ctx.store.clone(),
            key.lock_path(),
            true,
            Box::new(|v| v.and_then(|v| v.as_bool()).unwrap_or(true)),
        )
    }

    /// Roster merged with the course enrollment (see [`merge_with_enrollment`]).
    pub fn merged_roster_stream(
        &self,
        key: &SessionKey,
        enrolled: Vec<EnrolledStudent>,
    ) -> RosterStream {
        LiveStream::new(
            self.ctx.store.clone(),
            key.roster_path(),
            merge_with_enrollment(&enrolled, Vec::new()),
            Box::new(move |v| merge_with_enrollment(&enrolled, parse_roster(v.as_ref()))),
        )
    }
}
