//! Fan-out of computed views to connected observers.
//!
//! Each observer owns a bounded queue drained by its own connection task.
//! Pushing never waits on an observer: a full queue drops that message for
//! that observer only, a closed queue is skipped. Observers are removed
//! only by [`Broadcaster::unregister`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{error, warn};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};

/// Messages buffered per observer before new ones are dropped for it
const OBSERVER_QUEUE_CAPACITY: usize = 16;

pub type ObserverId = u64;

/// Receiving side handed to a newly registered observer.
pub struct Subscription {
    pub id: ObserverId,
    pub messages: mpsc::Receiver<Arc<str>>,
}

/// Outcome of one [`Broadcaster::push`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    pub delivered: usize,
    /// Observer no longer open
    pub closed: usize,
    /// Observer queue full, message dropped for it
    pub lagging: usize,
}

#[derive(Default)]
struct Observers {
    senders: RwLock<FxHashMap<ObserverId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
}

/// Registry of open observer connections.
#[derive(Clone, Default)]
pub struct Broadcaster {
    observers: Arc<Observers>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self) -> Subscription {
        let id = self.observers.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(OBSERVER_QUEUE_CAPACITY);
        self.observers.senders.write().await.insert(id, tx);

        Subscription { id, messages: rx }
    }

    pub async fn unregister(&self, id: ObserverId) {
        self.observers.senders.write().await.remove(&id);
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.senders.read().await.len()
    }

    /// Serializes `message` once and offers it to every observer registered
    /// at the moment of the call.
    ///
    /// The registry lock is released before sending, so connects and
    /// disconnects during a push only affect the next one.
    pub async fn push<T: Serialize + ?Sized>(&self, message: &T) -> PushReport {
        let payload: Arc<str> = match serde_json::to_string(message) {
            Ok(p) => p.into(),
            Err(e) => {
                error!("Failed to serialize broadcast: {}", e);
                return PushReport::default();
            },
        };

        let targets: Vec<(ObserverId, mpsc::Sender<Arc<str>>)> = self
            .observers
            .senders
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut report = PushReport::default();
        for (id, tx) in targets {
            match tx.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(mpsc::error::TrySendError::Closed(_)) => report.closed += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Observer {} is not keeping up, dropping broadcast", id);
                    report.lagging += 1;
                },
            }
        }

        report
    }
}
