//! Recipient resolution for published offers and requests.
//!
//! Pure functions over a [`ScopeTable`]; the locking wrappers live on
//! [`crate::subscription::SubscriptionIndex`] so one resolution always sees
//! a single index generation.
//!
//! An offer event unions four buckets: every-day/all-hours,
//! event-weekday/all-hours, every-day/event-hour, event-weekday/event-hour.
//! A request event unions the two day buckets only. Both subtract the
//! caller's exclude set (the event's originator must not hear about their
//! own publication) and deduplicate by construction (set union).

use std::collections::HashSet;

use chrono::{NaiveTime, Timelike, Weekday};

use crate::types::{Direction, NoticeKind, SubscriberId};

use super::index::ScopeTable;
use super::scope::{BucketKey, DayKey, HourKey};

/// The buckets consulted for an offer published at `time` on `weekday`.
///
/// When the event falls exactly on the top of an hour, the previous hour's
/// buckets are consulted as well: a scope covering `[.., h)` still hears
/// about a departure at `h:00` sharp, because "until 9" includes a 9:00
/// departure to the person who wrote it. The rule is asymmetric on purpose:
/// it only fires at minute zero, only looks one hour backward, and is
/// skipped at midnight where there is no previous bucket.
pub fn offer_bucket_keys(direction: Direction, weekday: Weekday, time: NaiveTime) -> Vec<BucketKey> {
    let hour = time.hour() as u8;
    let mut keys = vec![
        BucketKey::new(NoticeKind::Offer, direction, DayKey::Any, HourKey::Any),
        BucketKey::new(NoticeKind::Offer, direction, DayKey::On(weekday), HourKey::Any),
        BucketKey::new(NoticeKind::Offer, direction, DayKey::Any, HourKey::At(hour)),
        BucketKey::new(
            NoticeKind::Offer,
            direction,
            DayKey::On(weekday),
            HourKey::At(hour),
        ),
    ];
    if time.minute() == 0 {
        if let Some(previous) = hour.checked_sub(1) {
            keys.push(BucketKey::new(
                NoticeKind::Offer,
                direction,
                DayKey::Any,
                HourKey::At(previous),
            ));
            keys.push(BucketKey::new(
                NoticeKind::Offer,
                direction,
                DayKey::On(weekday),
                HourKey::At(previous),
            ));
        }
    }
    keys
}

/// The buckets consulted for a request published on `weekday`.
pub fn request_bucket_keys(direction: Direction, weekday: Weekday) -> [BucketKey; 2] {
    [
        BucketKey::new(NoticeKind::Request, direction, DayKey::Any, HourKey::Any),
        BucketKey::new(
            NoticeKind::Request,
            direction,
            DayKey::On(weekday),
            HourKey::Any,
        ),
    ]
}

/// Resolves the deduplicated recipients of an offer event.
pub fn resolve_offers(
    table: &ScopeTable,
    direction: Direction,
    weekday: Weekday,
    time: NaiveTime,
    exclude: Option<&HashSet<SubscriberId>>,
) -> HashSet<SubscriberId> {
    let mut recipients = HashSet::new();
    for key in offer_bucket_keys(direction, weekday, time) {
        table.extend_recipients(&key, &mut recipients);
    }
    subtract_excluded(&mut recipients, exclude);
    recipients
}

/// Resolves the deduplicated recipients of a request event.
pub fn resolve_requests(
    table: &ScopeTable,
    direction: Direction,
    weekday: Weekday,
    exclude: Option<&HashSet<SubscriberId>>,
) -> HashSet<SubscriberId> {
    let mut recipients = HashSet::new();
    for key in request_bucket_keys(direction, weekday) {
        table.extend_recipients(&key, &mut recipients);
    }
    subtract_excluded(&mut recipients, exclude);
    recipients
}

fn subtract_excluded(
    recipients: &mut HashSet<SubscriberId>,
    exclude: Option<&HashSet<SubscriberId>>,
) {
    if let Some(exclude) = exclude {
        for id in exclude {
            recipients.remove(id);
        }
    }
}
