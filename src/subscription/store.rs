//! The durable per-subscriber scope store, as a collaborator trait.
//!
//! The crate never talks to a database directly; the dialog layer supplies
//! an implementation backed by whatever document store it uses. The trait
//! is written in the same shape as the crate's other collaborator seam
//! ([`crate::transport::Transport`]): associated error type, `Send` futures,
//! so mock implementations for tests are plain structs.
//!
//! Every index mutation calls the store synchronously inside the index's
//! write critical section; see [`crate::subscription::SubscriptionIndex`].

use std::future::Future;

use crate::types::{Direction, NoticeKind, SubscriberId, WeekdaySelector};

use super::scope::Scope;

/// Durable storage for subscription scopes, keyed per subscriber.
///
/// `save` must overwrite any record with the same
/// `(subscriber, kind, direction, selector)` slot; `delete` with
/// `selector: None` must remove every record for the
/// `(subscriber, kind, direction)` pair. Both are expected to be atomic per
/// call. The index holds its write lock across these calls, so
/// implementations need not serialize against concurrent index mutations
/// themselves.
pub trait SubscriptionStore: Send + Sync + 'static {
    /// The error type returned by this store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Loads every persisted scope, across all subscribers.
    ///
    /// Used once at cold start to rebuild the reverse index.
    fn load_all(&self) -> impl Future<Output = Result<Vec<Scope>, Self::Error>> + Send;

    /// Loads all scopes held by one subscriber.
    fn load(
        &self,
        subscriber: SubscriberId,
    ) -> impl Future<Output = Result<Vec<Scope>, Self::Error>> + Send;

    /// Persists a scope, replacing any record in the same slot.
    fn save(&self, scope: &Scope) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Deletes one selector's scope, or every scope for the pair when
    /// `selector` is `None`. Deleting something absent is not an error.
    fn delete(
        &self,
        subscriber: SubscriberId,
        kind: NoticeKind,
        direction: Direction,
        selector: Option<WeekdaySelector>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
