//! The notification service facade.
//!
//! [`NotificationService`] ties the subscription index to the paced
//! dispatcher: subscription management goes through the write-through index,
//! publish events resolve a recipient set and hand it to the dispatcher as a
//! single fire-and-forget enqueue. Resolution and enqueueing are the only
//! coupling between the two halves; everything else stays behind the
//! [`SubscriptionStore`] and [`Transport`] traits.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveTime, Weekday};
use tracing::{debug, instrument};

use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::subscription::{IndexError, Scope, SubscriptionIndex, SubscriptionStore};
use crate::transport::Transport;
use crate::types::{Direction, HourRange, NoticeKind, Payload, SubscriberId, WeekdaySelector};

/// Facade over the subscription index and the paced dispatcher.
///
/// Cheap to share: clones of the inner index handle are not needed because
/// all methods take `&self`, so the service itself can live in an `Arc`.
#[derive(Debug)]
pub struct NotificationService<S> {
    index: SubscriptionIndex<S>,
    dispatcher: Dispatcher,
}

impl<S: SubscriptionStore> NotificationService<S> {
    /// Rebuilds the index from the store and spawns the dispatch scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if the persisted scopes cannot be read.
    pub async fn new<T: Transport>(
        store: S,
        transport: T,
        config: DispatchConfig,
    ) -> Result<Self, IndexError<S::Error>> {
        let index = SubscriptionIndex::load(store).await?;
        let dispatcher = Dispatcher::spawn(config, Arc::new(transport));
        Ok(NotificationService { index, dispatcher })
    }

    // ─── subscription management ───

    /// Subscribes to published offers for `direction` on the days `selector`
    /// covers, optionally narrowed to departure hours in `hours`.
    ///
    /// Writing `EveryDay` replaces any specific-day scopes for the pair and
    /// vice versa. Returns `false` when an identical subscription already
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if persisting fails; no state changes.
    #[instrument(skip(self), level = "debug")]
    pub async fn subscribe_offers(
        &self,
        subscriber: SubscriberId,
        direction: Direction,
        selector: WeekdaySelector,
        hours: Option<HourRange>,
    ) -> Result<bool, IndexError<S::Error>> {
        self.index
            .upsert(Scope::offer(subscriber, direction, selector, hours))
            .await
    }

    /// Subscribes to published requests for `direction` on the days
    /// `selector` covers. Request scopes carry no hour granularity.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if persisting fails; no state changes.
    #[instrument(skip(self), level = "debug")]
    pub async fn subscribe_requests(
        &self,
        subscriber: SubscriberId,
        direction: Direction,
        selector: WeekdaySelector,
    ) -> Result<bool, IndexError<S::Error>> {
        self.index
            .upsert(Scope::request(subscriber, direction, selector))
            .await
    }

    /// Drops one selector's subscription, or every subscription for the
    /// `(subscriber, kind, direction)` pair when `selector` is `None`.
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if the store delete fails; no state
    /// changes.
    #[instrument(skip(self), level = "debug")]
    pub async fn unsubscribe(
        &self,
        subscriber: SubscriberId,
        kind: NoticeKind,
        direction: Direction,
        selector: Option<WeekdaySelector>,
    ) -> Result<bool, IndexError<S::Error>> {
        self.index.remove(subscriber, kind, direction, selector).await
    }

    /// Drops everything a subscriber holds, across kinds and directions.
    /// For account deletion or a role change that ends all notifications.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if any store delete fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove_subscriber(
        &self,
        subscriber: SubscriberId,
    ) -> Result<bool, IndexError<S::Error>> {
        self.index.remove_subscriber(subscriber).await
    }

    // ─── publish events ───

    /// Fans a published offer out to every matching offer subscriber.
    ///
    /// Resolution unions the direction's day/hour buckets for `weekday` and
    /// `time` (including the previous hour's buckets exactly at the top of
    /// an hour), dedupes, drops `exclude` (typically the originator), and
    /// hands the set to the paced dispatcher. Fire-and-forget: an empty
    /// match is a silent no-op.
    #[instrument(skip(self, payload, exclude), level = "debug")]
    pub async fn notify_offer_published(
        &self,
        direction: Direction,
        weekday: Weekday,
        time: NaiveTime,
        payload: Payload,
        exclude: Option<&HashSet<SubscriberId>>,
    ) {
        let recipients = self
            .index
            .resolve_offer_subscribers(direction, weekday, time, exclude)
            .await;
        debug!(matched = recipients.len(), "offer published");
        self.dispatcher.enqueue(ordered(recipients), payload, None);
    }

    /// Fans a published request out to every matching request subscriber.
    /// Day-keyed only; request scopes have no hour granularity.
    #[instrument(skip(self, payload, exclude), level = "debug")]
    pub async fn notify_request_published(
        &self,
        direction: Direction,
        weekday: Weekday,
        payload: Payload,
        exclude: Option<&HashSet<SubscriberId>>,
    ) {
        let recipients = self
            .index
            .resolve_request_subscribers(direction, weekday, exclude)
            .await;
        debug!(matched = recipients.len(), "request published");
        self.dispatcher.enqueue(ordered(recipients), payload, None);
    }

    /// Pushes an ad-hoc message to an explicit recipient list through the
    /// same paced queue, with the same optional failure relay. Used for
    /// sends whose audience is not subscription-derived, such as trip
    /// cancellations to accepted passengers.
    pub fn notify_direct(
        &self,
        recipients: Vec<SubscriberId>,
        payload: Payload,
        failure_notify: Option<SubscriberId>,
    ) {
        self.dispatcher.enqueue(recipients, payload, failure_notify);
    }

    /// Stops the dispatch scheduler. Jobs still waiting for their scheduled
    /// time are dropped.
    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }
}

/// Deterministic delivery order for a resolved set.
fn ordered(recipients: HashSet<SubscriberId>) -> Vec<SubscriberId> {
    let mut out: Vec<SubscriberId> = recipients.into_iter().collect();
    out.sort();
    out
}
