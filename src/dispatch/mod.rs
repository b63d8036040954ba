//! Rate-paced notification dispatch.
//!
//! # Module Structure
//!
//! - [`pacing`]: flood-control configuration and the cursor math
//! - [`queue`]: the time-ordered job heap
//! - [`scheduler`]: the `Dispatcher` handle (spawn, enqueue, shutdown)
//! - [`worker`]: the single scheduling loop and job execution with
//!   per-recipient failure isolation
//!
//! A delivery job moves through Scheduled, Executing, Completed. There is
//! no retrying state and no cancellation of already-scheduled jobs.

pub mod pacing;
pub mod queue;
pub mod scheduler;
mod worker;

#[cfg(test)]
mod tests;

pub use pacing::{DispatchConfig, EnqueueRequest};
pub use queue::{DeliveryJob, JobQueue};
pub use scheduler::Dispatcher;
