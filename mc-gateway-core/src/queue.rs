use async_trait::async_trait;
use mc_gateway_error::{MCError, MCResult};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Work handler run by the queue workers, one item at a time per worker
#[async_trait]
pub trait QueueConsumer<T>: Send + Sync + 'static {
    async fn consume(&self, item: T);
}

/// Bounded FIFO work queue with a fixed worker pool.
///
/// `produce` never waits: an item is refused while `capacity` items are
/// in flight (queued or being consumed). With a single worker items are
/// consumed in submission order.
pub struct BoundedQueue<T> {
    name: String,
    capacity: usize,
    tx: Mutex<Option<mpsc::Sender<T>>>,
    pending: Arc<AtomicUsize>,
    tracker: TaskTracker,
}

impl<T: Send + 'static> BoundedQueue<T> {
    pub fn start<C>(name: impl Into<String>, capacity: usize, workers: usize, consumer: C) -> Self
    where
        C: QueueConsumer<T>,
    {
        let name = name.into();
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel::<T>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let consumer = Arc::new(consumer);
        let pending = Arc::new(AtomicUsize::new(0));
        let tracker = TaskTracker::new();

        for worker in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let consumer = Arc::clone(&consumer);
            let pending = Arc::clone(&pending);
            let queue = name.clone();
            tracker.spawn(async move {
                loop {
                    // Release the receiver before consuming so other workers can pull.
                    let item = rx.lock().await.recv().await;
                    let Some(item) = item else {
                        break;
                    };
                    consumer.consume(item).await;
                    pending.fetch_sub(1, Ordering::AcqRel);
                }
                debug!(queue = %queue, worker, "Queue worker stopped");
            });
        }
        tracker.close();

        Self {
            name,
            capacity,
            tx: Mutex::new(Some(tx)),
            pending,
            tracker,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items queued or currently being consumed
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Enqueue without waiting; fails when saturated or closed
    pub fn produce(&self, item: T) -> MCResult<()> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(MCError::InvalidStateError(format!(
                "queue '{}' is closed",
                self.name
            )));
        };

        if self.pending.fetch_add(1, Ordering::AcqRel) >= self.capacity {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(MCError::QueueFull(self.name.clone()));
        }

        match tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                Err(MCError::QueueFull(self.name.clone()))
            }
            Err(TrySendError::Closed(_)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                warn!(queue = %self.name, "Queue workers are gone");
                Err(MCError::InvalidStateError(format!(
                    "queue '{}' is closed",
                    self.name
                )))
            }
        }
    }

    /// Stop accepting items, let the workers drain what is queued and wait
    /// for them to finish. Calling it again is a no-op.
    pub async fn close(&self) {
        let tx = self.tx.lock().take();
        if tx.is_none() {
            return;
        }
        drop(tx);
        self.tracker.wait().await;
        debug!(queue = %self.name, "Queue closed");
    }
}
