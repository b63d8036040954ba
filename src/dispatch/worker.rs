//! The scheduling loop and per-job delivery execution.
//!
//! One task owns the cursor and the job heap. The loop waits on whichever
//! comes first: a new enqueue request, the earliest job falling due, or
//! cancellation. Due jobs are spawned onto their own tasks so one slow
//! recipient can never stall the loop or the pacing of later jobs.
//!
//! # Failure policy
//!
//! Attempt once, isolate the failure. A send error or timeout is terminal
//! for that recipient: it is logged, relayed once to the job's
//! `failure_notify` target when one is set, and never aborts the job's
//! remaining recipients or any later job. The relay itself is fire-and-
//! forget; if it fails too, that is only logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::transport::Transport;
use crate::types::{Payload, SubscriberId};

use super::pacing::{DispatchConfig, EnqueueRequest, plan_jobs};
use super::queue::{DeliveryJob, JobQueue};

/// Runs the scheduling loop until cancellation or channel close.
pub(crate) async fn run_scheduler<T: Transport>(
    config: DispatchConfig,
    transport: Arc<T>,
    mut rx: mpsc::UnboundedReceiver<EnqueueRequest>,
    cancel: CancellationToken,
) {
    let mut queue = JobQueue::new();
    let mut next_available = Instant::now();

    loop {
        let deadline = queue.next_deadline();
        tokio::select! {
            _ = cancel.cancelled() => break,

            request = rx.recv() => {
                let Some(request) = request else { break };
                let now = Instant::now();
                for job in plan_jobs(&mut next_available, now, request, &config) {
                    trace!(
                        recipients = job.recipients.len(),
                        delay_ms = job.scheduled_at.saturating_duration_since(now).as_millis() as u64,
                        "delivery job scheduled"
                    );
                    queue.push(job);
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let now = Instant::now();
                while let Some(job) = queue.pop_due(now) {
                    tokio::spawn(execute_job(job, Arc::clone(&transport), config.send_timeout));
                }
            }
        }
    }

    debug!(pending = queue.len(), "dispatch scheduler stopped");
}

/// Executes one due job: sends to each recipient in order, isolating
/// per-recipient failures.
pub(crate) async fn execute_job<T: Transport>(
    job: DeliveryJob,
    transport: Arc<T>,
    send_timeout: Duration,
) {
    for recipient in &job.recipients {
        match timeout(send_timeout, transport.send(*recipient, &job.payload)).await {
            Ok(Ok(())) => trace!(recipient = %recipient, "notification delivered"),
            Ok(Err(err)) => {
                warn!(recipient = %recipient, error = %err, "notification delivery failed");
                relay_failure(transport.as_ref(), job.failure_notify, *recipient, send_timeout)
                    .await;
            }
            Err(_) => {
                warn!(
                    recipient = %recipient,
                    timeout_ms = send_timeout.as_millis() as u64,
                    "notification delivery timed out"
                );
                relay_failure(transport.as_ref(), job.failure_notify, *recipient, send_timeout)
                    .await;
            }
        }
    }
}

/// Best-effort secondary notification about an unreachable recipient.
async fn relay_failure<T: Transport>(
    transport: &T,
    target: Option<SubscriberId>,
    failed: SubscriberId,
    send_timeout: Duration,
) {
    let Some(target) = target else { return };
    let notice = Payload::new(format!(
        "Could not deliver a notification to {failed}. You may want to contact them directly."
    ));
    match timeout(send_timeout, transport.send(target, &notice)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(target = %target, failed = %failed, error = %err, "failure relay not delivered");
        }
        Err(_) => {
            warn!(target = %target, failed = %failed, "failure relay timed out");
        }
    }
}
