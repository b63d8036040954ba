//! Flood-control pacing: configuration and the cursor math.
//!
//! The chat platform tolerates at most `max_per_window` sends per `window`.
//! Every enqueue request is split into chunks of that size, each chunk
//! stamped at `max(now, cursor)`, and the cursor advanced by the window
//! share the chunk consumes (`chunk_len * window / max_per_window`). The
//! cursor is owned by the single scheduling task, so the guarantee holds
//! across all callers, not per caller.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::{Payload, SubscriberId};

use super::queue::DeliveryJob;

/// Default flood-control limit: 30 sends per second.
const DEFAULT_MAX_PER_WINDOW: usize = 30;

/// Default flood-control window.
const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Default bound on a single transport send (10 seconds).
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the dispatch scheduler.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum sends allowed inside one rate window.
    pub max_per_window: usize,

    /// Length of the rate window.
    pub window: Duration,

    /// Upper bound on one transport send; a recipient slower than this is
    /// treated as failed so it cannot starve the rest of a job.
    pub send_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchConfig {
    /// Creates a config with the default limits.
    pub fn new() -> Self {
        DispatchConfig {
            max_per_window: DEFAULT_MAX_PER_WINDOW,
            window: DEFAULT_WINDOW,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Sets the flood-control limit. `max_per_window` is clamped to at
    /// least 1.
    pub fn with_rate_limit(mut self, max_per_window: usize, window: Duration) -> Self {
        self.max_per_window = max_per_window.max(1);
        self.window = window;
        self
    }

    /// Sets the per-send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

/// An accepted enqueue request, before batching.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    /// Recipients, attempted in order across the resulting jobs.
    pub recipients: Vec<SubscriberId>,

    /// The message body delivered to every recipient.
    pub payload: Payload,

    /// Who to tell, best-effort, when a recipient cannot be reached.
    pub failure_notify: Option<SubscriberId>,
}

/// Splits a request into rate-paced jobs and advances the shared cursor.
///
/// Each chunk of at most `max_per_window` recipients becomes one job,
/// scheduled no earlier than the cursor and no earlier than `now`; the
/// cursor then moves forward by the chunk's share of the window. Scheduled
/// times are therefore non-decreasing across consecutive calls with a
/// monotone `now`, and no window-length interval ever holds more than
/// `max_per_window` sends.
pub(crate) fn plan_jobs(
    next_available: &mut Instant,
    now: Instant,
    request: EnqueueRequest,
    config: &DispatchConfig,
) -> Vec<DeliveryJob> {
    let per_window = config.max_per_window.max(1);
    let mut jobs = Vec::with_capacity(request.recipients.len().div_ceil(per_window));
    for chunk in request.recipients.chunks(per_window) {
        let scheduled_at = (*next_available).max(now);
        jobs.push(DeliveryJob {
            recipients: chunk.to_vec(),
            payload: request.payload.clone(),
            scheduled_at,
            failure_notify: request.failure_notify,
        });
        // chunk_len * (window / max_per_window), computed multiply-first so
        // a full chunk advances by exactly one window.
        let advance = config.window * chunk.len() as u32 / per_window as u32;
        *next_available = scheduled_at + advance;
    }
    jobs
}
