//! The outbound message transport, as a collaborator trait.
//!
//! The crate never talks to the chat platform directly; the delivery worker
//! hands fully rendered payloads to an implementation of this trait. Any
//! error is treated as a permanent, per-recipient failure: no retry, no
//! backoff.
//!
//! # Example (mock for testing)
//!
//! ```ignore
//! struct FailingTransport;
//!
//! impl Transport for FailingTransport {
//!     type Error = std::io::Error;
//!
//!     async fn send(&self, _: SubscriberId, _: &Payload) -> Result<(), Self::Error> {
//!         Err(std::io::Error::other("recipient unreachable"))
//!     }
//! }
//! ```

use std::future::Future;

use crate::types::{Payload, SubscriberId};

/// Sends one payload to one recipient.
pub trait Transport: Send + Sync + 'static {
    /// The error type returned by this transport.
    type Error: std::fmt::Display + Send;

    /// Delivers `payload` to `recipient`.
    ///
    /// The caller bounds this with a timeout; implementations need not
    /// enforce one themselves.
    fn send(
        &self,
        recipient: SubscriberId,
        payload: &Payload,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
