//! Time-ordered queue of pending delivery jobs.
//!
//! Jobs are ordered by scheduled instant (earliest first), then by sequence
//! number (FIFO among jobs scheduled for the same instant). Recipients
//! inside one job are attempted in list order; no ordering is promised
//! across recipients of different jobs due at the same instant.

use std::collections::BinaryHeap;

use tokio::time::Instant;

use crate::types::{Payload, SubscriberId};

/// A scheduled, time-stamped unit of delivery work.
///
/// Created by the scheduler, executed exactly once, then discarded. Jobs
/// own no durable identity and are never persisted.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    /// Recipients, attempted in order.
    pub recipients: Vec<SubscriberId>,

    /// The message body handed to the transport for every recipient.
    pub payload: Payload,

    /// When the job becomes due.
    pub scheduled_at: Instant,

    /// Who to tell, best-effort, when a recipient cannot be reached.
    pub failure_notify: Option<SubscriberId>,
}

/// An entry in the job queue.
#[derive(Debug)]
struct QueuedJob {
    job: DeliveryJob,
    /// FIFO tie-breaker for jobs due at the same instant.
    sequence: u64,
}

// BinaryHeap is a max-heap; reverse the ordering so the earliest deadline
// (and, within it, the lowest sequence number) surfaces first.
impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.job.scheduled_at == other.job.scheduled_at && self.sequence == other.sequence
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .job
            .scheduled_at
            .cmp(&self.job.scheduled_at)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Min-heap of delivery jobs keyed by scheduled instant.
#[derive(Debug, Default)]
pub struct JobQueue {
    heap: BinaryHeap<QueuedJob>,
    next_sequence: u64,
}

impl JobQueue {
    pub fn new() -> Self {
        JobQueue::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pushes a job, assigning it the next sequence number.
    pub fn push(&mut self, job: DeliveryJob) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(QueuedJob { job, sequence });
    }

    /// The instant the earliest job becomes due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|entry| entry.job.scheduled_at)
    }

    /// Pops the earliest job if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<DeliveryJob> {
        if self.heap.peek()?.job.scheduled_at > now {
            return None;
        }
        self.heap.pop().map(|entry| entry.job)
    }

    /// Pops the earliest job regardless of deadline.
    pub fn pop(&mut self) -> Option<DeliveryJob> {
        self.heap.pop().map(|entry| entry.job)
    }
}
