//! Commute Notify - subscription matching and rate-paced delivery for a
//! commuter ride-share notification system.
//!
//! This library provides the reverse subscription index, the recipient
//! resolution rules, and the paced dispatch queue. Chat-platform I/O and
//! persistence stay behind the [`transport::Transport`] and
//! [`subscription::SubscriptionStore`] traits.

pub mod dispatch;
pub mod service;
pub mod subscription;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
