//! Listener registry shared by the store implementations.
//!
//! Each listener watches one path and remembers the last value it was sent, so
//! a write only reaches listeners whose subtree actually changed. Listeners
//! are removed when their [`Subscription`] is dropped.

use futures::Stream;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::{StoreError, StorePath};

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Current value at the watched path (`None` when absent).
    Value(Option<Value>),
    /// The listener was torn down by the store; no further events follow.
    Cancelled(StoreError),
}

struct Listener {
    path: StorePath,
    last: Option<Value>,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
}

#[derive(Clone, Default)]
pub struct ChangeHub {
    inner: Arc<Mutex<HubInner>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a listener on `path`; `current` is delivered immediately.
    ///
    /// Callers must hold whatever guard orders their writes so no write can
    /// slip between reading `current` and registering.
    pub fn register(&self, path: StorePath, current: Option<Value>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ChangeEvent::Value(current.clone()));

        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(
            id,
            Listener {
                path: path.clone(),
                last: current,
                tx,
            },
        );
        tracing::debug!("Registered listener {id} on {path}");

        Subscription {
            id,
            path,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Distinct listener paths a write to any of `changed` may affect.
    pub fn affected(&self, changed: &[StorePath]) -> Vec<StorePath> {
        let inner = self.lock();
        let mut seen = HashSet::new();
        inner
            .listeners
            .values()
            .filter(|l| changed.iter().any(|c| c.overlaps(&l.path)))
            .filter(|l| seen.insert(l.path.clone()))
            .map(|l| l.path.clone())
            .collect()
    }

    /// Push fresh values to every listener whose watched value differs from
    /// the one it last saw. Listeners whose receiver is gone are dropped.
    pub fn deliver(&self, values: &HashMap<StorePath, Option<Value>>) {
        let mut inner = self.lock();
        let mut dead = Vec::new();
        for (id, listener) in inner.listeners.iter_mut() {
            let Some(now) = values.get(&listener.path) else {
                continue;
            };
            if *now == listener.last {
                continue;
            }
            listener.last = now.clone();
            if listener.tx.send(ChangeEvent::Value(now.clone())).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            inner.listeners.remove(&id);
        }
    }

    /// Tear down every listener with `err`. Used when the connection drops.
    pub fn cancel_all(&self, err: StoreError) {
        let mut inner = self.lock();
        let count = inner.listeners.len();
        for (_, listener) in inner.listeners.drain() {
            let _ = listener.tx.send(ChangeEvent::Cancelled(err.clone()));
        }
        if count > 0 {
            tracing::warn!("Cancelled {count} listener(s): {err}");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

/// A live value listener. Dropping it unregisters the listener.
pub struct Subscription {
    id: u64,
    path: StorePath,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<ChangeEvent>> {
        self.rx.poll_recv(cx)
    }

    /// Explicit form of dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.listeners.remove(&self.id).is_some() {
                tracing::debug!("Released listener {} on {}", self.id, self.path);
            }
        }
    }
}
