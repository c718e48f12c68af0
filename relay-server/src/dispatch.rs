//! Lead dispatch module.
//!
//! Qualifying events are handed from the request path to a bounded work
//! queue consumed by a fixed pool of publisher workers. Submission never
//! blocks, so the HTTP response is independent of publish latency, and the
//! pool bounds how many publishes can be in flight at once.
//!
//! ```text
//! Handler → try_dispatch → bounded queue → worker → Publish → broker
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::queue::{InboundEvent, Publish, PublishTarget};

/// Submission errors. Both are logged and absorbed by the caller; neither
/// ever reaches the webhook response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch queue is full")]
    QueueFull,

    #[error("dispatch queue is closed")]
    Closed,
}

/// Handle for submitting events to the publisher workers.
///
/// Cloneable; the worker pool shuts down once every handle has dropped.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<InboundEvent>,
}

impl Dispatcher {
    /// Create the bounded dispatch channel without starting workers.
    ///
    /// Used by [`spawn`] and by tests that want to observe submissions
    /// directly on the receiver.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<InboundEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Submit an event snapshot for publishing, without waiting.
    pub fn try_dispatch(&self, event: InboundEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// Running publisher workers, joined at shutdown.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Wait for the workers to finish the queued backlog and exit.
    ///
    /// Workers exit once every [`Dispatcher`] handle has dropped and the
    /// queue is empty. Waits at most `timeout`, then gives up with a
    /// warning; anything still in flight at that point is lost.
    pub async fn drain(self, timeout: Duration) {
        let join_all = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "dispatch_worker_join_error");
                }
            }
        };

        if tokio::time::timeout(timeout, join_all).await.is_err() {
            warn!(
                timeout_secs = timeout.as_secs(),
                "dispatch_drain_timeout"
            );
        } else {
            info!("dispatch_drained");
        }
    }
}

/// Start the dispatch queue and its worker pool.
pub fn spawn(
    publisher: Arc<dyn Publish>,
    target: PublishTarget,
    workers: usize,
    capacity: usize,
) -> (Dispatcher, WorkerPool) {
    let (dispatcher, rx) = Dispatcher::bounded(capacity);
    let rx = Arc::new(Mutex::new(rx));

    let handles = (0..workers.max(1))
        .map(|id| {
            let rx = Arc::clone(&rx);
            let publisher = Arc::clone(&publisher);
            let target = target.clone();
            tokio::spawn(run_worker(id, rx, publisher, target))
        })
        .collect();

    info!(
        workers = workers.max(1),
        capacity = capacity,
        topic = %target.topic_path(),
        "dispatch_pool_started"
    );

    (dispatcher, WorkerPool { handles })
}

/// One publisher worker: receive, serialize, publish, repeat.
///
/// Every failure is terminal here. Serialization and publish errors are
/// logged and the worker moves on to the next event.
async fn run_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<InboundEvent>>>,
    publisher: Arc<dyn Publish>,
    target: PublishTarget,
) {
    info!(worker = id, "dispatch_worker_started");

    loop {
        // Hold the lock only for the receive, so the other workers keep
        // pulling while this one publishes.
        let event = { rx.lock().await.recv().await };
        let Some(event) = event else { break };

        let body = match serde_json::to_vec(&event) {
            Ok(body) => body,
            Err(e) => {
                error!(worker = id, error = %e, "event_serialize_failed");
                continue;
            }
        };

        match publisher.publish(&target, &body).await {
            Ok(()) => {
                info!(
                    worker = id,
                    event_type = ?event.event_type,
                    body_length = body.len(),
                    "event_forwarded"
                );
            }
            Err(e) => {
                error!(
                    worker = id,
                    event_type = ?event.event_type,
                    error = %e,
                    "event_publish_failed"
                );
            }
        }
    }

    info!(worker = id, "dispatch_worker_stopped");
}
