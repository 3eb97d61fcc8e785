use crate::jobs::ProgressEvent;
use crate::observability::Metrics;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type SubscriberId = u64;

struct Registry {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<ProgressEvent>>>,
    next_id: AtomicU64,
    buffer: usize,
    metrics: Arc<Metrics>,
}

/// Fan-out of progress events to every connected subscriber
///
/// Each subscriber owns a bounded channel registered here. Publishing walks
/// the registry and forwards with `try_send`, so a slow subscriber only ever
/// loses its own events and never stalls the workers.
#[derive(Clone)]
pub struct ProgressHub {
    inner: Arc<Registry>,
}

impl ProgressHub {
    /// # Panics
    ///
    /// Panics if `buffer` is zero; configuration validation rejects that.
    pub fn new(buffer: usize, metrics: Arc<Metrics>) -> Self {
        assert!(buffer > 0, "subscriber buffer must be positive");
        Self {
            inner: Arc::new(Registry {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                buffer,
                metrics,
            }),
        }
    }

    /// Register a new subscriber; it sees every event published from now on
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.buffer);

        let count = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.insert(id, tx);
            subscribers.len()
        };
        debug!(subscriber_id = id, subscribers = count, "Progress subscriber registered");

        Subscription {
            id,
            receiver: rx,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Deliver `event` to every registered subscriber without blocking
    ///
    /// Returns how many subscribers accepted the event.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.inner.subscribers.lock();

        subscribers.retain(|&id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber_id = id, job_id = %event.id, "Subscriber lagging, event dropped");
                self.inner.metrics.event_dropped();
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber_id = id, "Pruning closed subscriber");
                false
            }
        });
        drop(subscribers);

        self.inner.metrics.event_published();
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// One subscriber's view of the hub
///
/// Dropping it removes the registry entry.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<ProgressEvent>,
    registry: Arc<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, or `None` if the hub dropped this subscriber
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    /// Turn the subscription into a stream that ends when `cancel` fires
    pub fn into_stream(self, cancel: CancellationToken) -> impl Stream<Item = ProgressEvent> + Send {
        futures::stream::unfold((self, cancel), |(mut subscription, cancel)| async move {
            let event = tokio::select! {
                _ = cancel.cancelled() => None,
                event = subscription.recv() => event,
            }?;
            Some((event, (subscription, cancel)))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let remaining = {
            let mut subscribers = self.registry.subscribers.lock();
            subscribers.remove(&self.id);
            subscribers.len()
        };
        debug!(subscriber_id = self.id, subscribers = remaining, "Progress subscriber removed");
    }
}
