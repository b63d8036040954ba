//! Notification kinds and the opaque message payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of publication a subscription listens for.
///
/// Offer alerts (new trips, watched by would-be passengers) and request
/// alerts (new ride requests, watched by drivers) are independent
/// populations: a subscriber's offer scopes never match a request event and
/// vice versa. Only offer scopes may carry an hour range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A published ride offer.
    Offer,
    /// A published ride request.
    Request,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeKind::Offer => write!(f, "offer"),
            NoticeKind::Request => write!(f, "request"),
        }
    }
}

/// An opaque, pre-rendered message body.
///
/// Formatting (markdown escaping, keyboards, localization) happens in the
/// dialog layer before the payload reaches this crate; delivery treats it as
/// an immutable blob handed to the transport as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    pub fn new(text: impl Into<String>) -> Self {
        Payload(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload(s)
    }
}
