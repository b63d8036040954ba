//! Newtype wrappers for domain identifiers.
//!
//! A subscriber is identified by the chat id of their account. Wrapping it
//! prevents accidental mixing with other integer values (hour buckets, batch
//! sizes) and makes signatures self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The chat id of a subscriber's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub i64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(n: i64) -> Self {
        SubscriberId(n)
    }
}
