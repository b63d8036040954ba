//! The dispatcher handle: fire-and-forget enqueueing into the single
//! scheduling task.
//!
//! Producers (publish actions, possibly many at once) push
//! [`EnqueueRequest`]s over an unbounded channel; one dedicated task owns
//! the pacing cursor and the job heap, so cursor reads and writes never
//! interleave and arrival order fixes scheduling order. `enqueue` returns as
//! soon as the request is handed over; actual transport sends happen later,
//! when jobs fall due.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::transport::Transport;
use crate::types::{Payload, SubscriberId};

use super::pacing::{DispatchConfig, EnqueueRequest};
use super::worker::run_scheduler;

/// Handle to the running dispatch scheduler.
///
/// Cheap to share behind the service facade; dropping the handle without
/// calling [`Dispatcher::shutdown`] leaves the task running until the
/// channel closes.
#[derive(Debug)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<EnqueueRequest>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Dispatcher {
    /// Spawns the scheduling task and returns its handle.
    pub fn spawn<T: Transport>(config: DispatchConfig, transport: Arc<T>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_scheduler(config, transport, rx, cancel.clone()));
        debug!("dispatch scheduler started");
        Dispatcher { tx, cancel, task }
    }

    /// Queues a paced delivery of `payload` to `recipients`.
    ///
    /// Fire-and-forget: returns immediately, never blocks, and never fails
    /// loudly. An empty recipient list is a no-op; a closed scheduler (only
    /// possible after shutdown) is logged and the request dropped.
    pub fn enqueue(
        &self,
        recipients: Vec<SubscriberId>,
        payload: Payload,
        failure_notify: Option<SubscriberId>,
    ) {
        if recipients.is_empty() {
            return;
        }
        let count = recipients.len();
        let request = EnqueueRequest {
            recipients,
            payload,
            failure_notify,
        };
        if self.tx.send(request).is_err() {
            warn!(recipients = count, "dispatch scheduler is gone; dropping notification");
        }
    }

    /// Stops the scheduling task.
    ///
    /// Jobs still waiting for their scheduled time are dropped; jobs already
    /// executing run to completion on their own tasks.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if self.task.await.is_err() {
            warn!("dispatch scheduler task panicked during shutdown");
        }
    }
}
