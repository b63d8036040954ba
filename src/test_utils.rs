//! Shared test fakes and arbitrary generators for property-based testing.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use tokio::time::Instant;

use crate::subscription::{Scope, SubscriptionStore};
use crate::transport::Transport;
use crate::types::{Direction, HourRange, NoticeKind, Payload, SubscriberId, WeekdaySelector};

use chrono::Weekday;

// ─── MemoryStore ───

/// In-memory [`SubscriptionStore`] keyed like a real per-subscriber
/// document store. Cloning shares the underlying records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<SubscriberId, Vec<Scope>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Total persisted scopes across all subscribers.
    pub fn scope_count(&self) -> usize {
        self.records.lock().unwrap().values().map(Vec::len).sum()
    }

    /// Persisted scopes for one subscriber.
    pub fn scopes_for(&self, subscriber: SubscriberId) -> Vec<Scope> {
        self.records
            .lock()
            .unwrap()
            .get(&subscriber)
            .cloned()
            .unwrap_or_default()
    }
}

impl SubscriptionStore for MemoryStore {
    type Error = Infallible;

    async fn load_all(&self) -> Result<Vec<Scope>, Self::Error> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .flatten()
            .cloned()
            .collect())
    }

    async fn load(&self, subscriber: SubscriberId) -> Result<Vec<Scope>, Self::Error> {
        Ok(self.scopes_for(subscriber))
    }

    async fn save(&self, scope: &Scope) -> Result<(), Self::Error> {
        let mut records = self.records.lock().unwrap();
        let entry = records.entry(scope.subscriber).or_default();
        entry.retain(|existing| !existing.same_slot(scope));
        entry.push(scope.clone());
        Ok(())
    }

    async fn delete(
        &self,
        subscriber: SubscriberId,
        kind: NoticeKind,
        direction: Direction,
        selector: Option<WeekdaySelector>,
    ) -> Result<(), Self::Error> {
        let mut records = self.records.lock().unwrap();
        if let Some(entry) = records.get_mut(&subscriber) {
            entry.retain(|scope| {
                !(scope.kind == kind
                    && scope.direction == direction
                    && selector.is_none_or(|sel| scope.selector == sel))
            });
            if entry.is_empty() {
                records.remove(&subscriber);
            }
        }
        Ok(())
    }
}

// ─── RecordingTransport ───

/// A send captured by [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: SubscriberId,
    pub payload: Payload,
    pub at: Instant,
}

/// Error returned for recipients scripted to fail.
#[derive(Debug)]
pub struct Unreachable(pub SubscriberId);

impl fmt::Display for Unreachable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recipient {} unreachable", self.0)
    }
}

/// [`Transport`] fake that records every send and fails on request.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<Mutex<HashSet<SubscriberId>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        RecordingTransport::default()
    }

    /// Scripts every future send to `recipient` to fail.
    pub fn fail_for(&self, recipient: SubscriberId) {
        self.failing.lock().unwrap().insert(recipient);
    }

    /// Every send attempted so far, successful or not, in attempt order.
    pub fn attempts(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Recipients of every attempted send, in attempt order.
    pub fn attempted_recipients(&self) -> Vec<SubscriberId> {
        self.attempts().iter().map(|msg| msg.recipient).collect()
    }

    /// Number of attempts made towards one recipient.
    pub fn attempts_to(&self, recipient: SubscriberId) -> usize {
        self.attempts()
            .iter()
            .filter(|msg| msg.recipient == recipient)
            .count()
    }
}

impl Transport for RecordingTransport {
    type Error = Unreachable;

    async fn send(&self, recipient: SubscriberId, payload: &Payload) -> Result<(), Self::Error> {
        self.sent.lock().unwrap().push(SentMessage {
            recipient,
            payload: payload.clone(),
            at: Instant::now(),
        });
        if self.failing.lock().unwrap().contains(&recipient) {
            return Err(Unreachable(recipient));
        }
        Ok(())
    }
}

// ─── Arbitrary generators ───

pub fn arb_subscriber() -> impl Strategy<Value = SubscriberId> {
    // A small id space so generated scopes overlap and collide.
    (1i64..20).prop_map(SubscriberId)
}

pub fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::ToCampus), Just(Direction::FromCampus)]
}

pub fn arb_weekday() -> impl Strategy<Value = Weekday> {
    prop_oneof![
        Just(Weekday::Mon),
        Just(Weekday::Tue),
        Just(Weekday::Wed),
        Just(Weekday::Thu),
        Just(Weekday::Fri),
        Just(Weekday::Sat),
        Just(Weekday::Sun),
    ]
}

pub fn arb_selector() -> impl Strategy<Value = WeekdaySelector> {
    prop_oneof![
        Just(WeekdaySelector::EveryDay),
        arb_weekday().prop_map(WeekdaySelector::On),
    ]
}

pub fn arb_hour_range() -> impl Strategy<Value = HourRange> {
    (0u8..24)
        .prop_flat_map(|start| (Just(start), (start + 1)..=24))
        .prop_map(|(start, end)| HourRange::new(start, end).unwrap())
}

pub fn arb_scope() -> impl Strategy<Value = Scope> {
    (
        arb_subscriber(),
        arb_direction(),
        arb_selector(),
        prop::option::of(arb_hour_range()),
        prop::bool::ANY,
    )
        .prop_map(|(subscriber, direction, selector, hours, is_offer)| {
            if is_offer {
                Scope::offer(subscriber, direction, selector, hours)
            } else {
                Scope::request(subscriber, direction, selector)
            }
        })
}
