//! Subscription scopes and the reverse-index bucket keys they expand into.
//!
//! A [`Scope`] is the durable unit of subscription: one subscriber's interest
//! in one kind of publication, in one direction, on some days, optionally
//! restricted to a band of hours. The reverse index stores the same
//! information inside-out, as flat buckets keyed by
//! `(kind, direction, day, hour)`; [`Scope::bucket_keys`] is the expansion
//! from the former to the latter.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Direction, HourRange, NoticeKind, SubscriberId, WeekdaySelector};

use chrono::Weekday;

/// The weekday component of a bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKey {
    /// The sentinel bucket for `EveryDay` scopes.
    Any,
    /// The bucket for one specific weekday.
    On(Weekday),
}

impl From<WeekdaySelector> for DayKey {
    fn from(selector: WeekdaySelector) -> Self {
        match selector {
            WeekdaySelector::EveryDay => DayKey::Any,
            WeekdaySelector::On(day) => DayKey::On(day),
        }
    }
}

/// The hour component of a bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourKey {
    /// The sentinel bucket for scopes without an hour range.
    Any,
    /// The bucket for one hour of the day (0-23).
    At(u8),
}

/// Composite key of one reverse-index bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub kind: NoticeKind,
    pub direction: Direction,
    pub day: DayKey,
    pub hour: HourKey,
}

impl BucketKey {
    pub fn new(kind: NoticeKind, direction: Direction, day: DayKey, hour: HourKey) -> Self {
        BucketKey {
            kind,
            direction,
            day,
            hour,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/", self.kind, self.direction)?;
        match self.day {
            DayKey::Any => write!(f, "any")?,
            DayKey::On(day) => write!(f, "{day}")?,
        }
        match self.hour {
            HourKey::Any => write!(f, "/any"),
            HourKey::At(hour) => write!(f, "/{hour:02}"),
        }
    }
}

/// One subscriber's notification preference.
///
/// At most one scope exists per `(subscriber, kind, direction, selector)`,
/// where `EveryDay` and the specific weekdays are mutually exclusive per the
/// first three components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub subscriber: SubscriberId,
    pub kind: NoticeKind,
    pub direction: Direction,
    pub selector: WeekdaySelector,
    /// Hour restriction; only offer scopes carry one.
    pub hours: Option<HourRange>,
}

impl Scope {
    /// An offer-alert scope, optionally restricted to an hour range.
    pub fn offer(
        subscriber: SubscriberId,
        direction: Direction,
        selector: WeekdaySelector,
        hours: Option<HourRange>,
    ) -> Self {
        Scope {
            subscriber,
            kind: NoticeKind::Offer,
            direction,
            selector,
            hours,
        }
    }

    /// A request-alert scope. Request scopes never carry an hour range,
    /// which this constructor makes unrepresentable.
    pub fn request(
        subscriber: SubscriberId,
        direction: Direction,
        selector: WeekdaySelector,
    ) -> Self {
        Scope {
            subscriber,
            kind: NoticeKind::Request,
            direction,
            selector,
            hours: None,
        }
    }

    /// The day-bucket component this scope registers under.
    pub fn day_key(&self) -> DayKey {
        self.selector.into()
    }

    /// Whether another scope occupies the same `(subscriber, kind,
    /// direction, selector)` slot as this one.
    pub fn same_slot(&self, other: &Scope) -> bool {
        self.subscriber == other.subscriber
            && self.kind == other.kind
            && self.direction == other.direction
            && self.selector == other.selector
    }

    /// Whether this scope's selector conflicts with `selector` under the
    /// mutual-exclusion invariant: `EveryDay` conflicts with every specific
    /// day and vice versa. A selector never conflicts with itself (that is a
    /// replacement, not an eviction).
    pub fn selector_conflicts_with(&self, selector: WeekdaySelector) -> bool {
        match (self.selector, selector) {
            (WeekdaySelector::EveryDay, WeekdaySelector::On(_)) => true,
            (WeekdaySelector::On(_), WeekdaySelector::EveryDay) => true,
            _ => false,
        }
    }

    /// Expands the scope into every reverse-index bucket it belongs to: one
    /// bucket per hour of its range, or the `HourKey::Any` sentinel bucket
    /// when it has no range.
    pub fn bucket_keys(&self) -> Vec<BucketKey> {
        let day = self.day_key();
        match &self.hours {
            None => vec![BucketKey::new(self.kind, self.direction, day, HourKey::Any)],
            Some(range) => range
                .hours()
                .map(|hour| BucketKey::new(self.kind, self.direction, day, HourKey::At(hour)))
                .collect(),
        }
    }
}
