//! The in-process reverse index over subscription scopes.
//!
//! [`ScopeTable`] is the pure data structure: flat buckets keyed by
//! `(kind, direction, day, hour)` mapping to subscriber sets, plus the
//! per-subscriber scope list the buckets are derived from. It has no locking
//! and no I/O, which keeps the invariant logic directly testable.
//!
//! [`SubscriptionIndex`] wraps the table in a `tokio::sync::RwLock` and
//! pairs every mutation with the corresponding [`SubscriptionStore`] write
//! inside the same critical section. The table is never authoritative on its
//! own: it must always be the exact dual of the persisted scopes, and is
//! rebuilt from them at cold start via [`SubscriptionIndex::load`].
//!
//! # Write ordering
//!
//! Mutations compute a plan from the table, perform the store writes, and
//! only then edit the table. A store failure therefore leaves the table
//! untouched and the two sides consistent; divergence would be a programming
//! bug, not a runtime condition to recover from.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveTime, Weekday};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{Direction, NoticeKind, SubscriberId, WeekdaySelector};

use super::matcher;
use super::scope::{BucketKey, Scope};
use super::store::SubscriptionStore;

/// Errors from index mutations.
#[derive(Debug, Error)]
pub enum IndexError<E: std::error::Error> {
    /// The backing scope store failed; the in-memory table was left
    /// unchanged.
    #[error("subscription store error: {0}")]
    Store(#[source] E),
}

/// Result of planning an upsert against the current table.
#[derive(Debug, Default)]
pub struct UpsertPlan {
    /// Whether applying the upsert changes any state. `false` means an
    /// identical scope is already present.
    changed: bool,
    /// Scopes in other selector slots that the mutual-exclusion invariant
    /// evicts, and whose store records must be deleted.
    evicted: Vec<Scope>,
}

impl UpsertPlan {
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn evicted(&self) -> &[Scope] {
        &self.evicted
    }
}

/// The reverse lookup table: bucket key to subscriber set.
///
/// Kept strictly as the dual of the scope list; all edits go through
/// [`ScopeTable::apply_upsert`] / [`ScopeTable::remove`] so buckets and
/// scopes cannot drift apart.
#[derive(Debug, Default)]
pub struct ScopeTable {
    buckets: HashMap<BucketKey, HashSet<SubscriberId>>,
    scopes: HashMap<SubscriberId, Vec<Scope>>,
}

impl ScopeTable {
    pub fn new() -> Self {
        ScopeTable::default()
    }

    /// Builds a table from persisted scopes (cold-start rebuild).
    pub fn from_scopes(scopes: impl IntoIterator<Item = Scope>) -> Self {
        let mut table = ScopeTable::new();
        for scope in scopes {
            let plan = table.plan_upsert(&scope);
            table.apply_upsert(scope, &plan);
        }
        table
    }

    /// Total number of scopes in the table.
    pub fn len(&self) -> usize {
        self.scopes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// O(1) bucket retrieval. Returns an empty set for unknown keys.
    pub fn lookup(&self, key: &BucketKey) -> HashSet<SubscriberId> {
        self.buckets.get(key).cloned().unwrap_or_default()
    }

    /// Unions one bucket into `out` without cloning the whole set.
    pub(crate) fn extend_recipients(&self, key: &BucketKey, out: &mut HashSet<SubscriberId>) {
        if let Some(bucket) = self.buckets.get(key) {
            out.extend(bucket.iter().copied());
        }
    }

    /// All scopes currently held by one subscriber.
    pub fn scopes_of(&self, subscriber: SubscriberId) -> &[Scope] {
        self.scopes
            .get(&subscriber)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any scope matches the given coordinates (`selector: None`
    /// matches any selector).
    pub fn has_scope(
        &self,
        subscriber: SubscriberId,
        kind: NoticeKind,
        direction: Direction,
        selector: Option<WeekdaySelector>,
    ) -> bool {
        self.scopes_of(subscriber).iter().any(|scope| {
            scope.kind == kind
                && scope.direction == direction
                && selector.is_none_or(|sel| scope.selector == sel)
        })
    }

    /// Plans an upsert without mutating anything.
    ///
    /// The plan records whether state changes at all and which scopes the
    /// mutual-exclusion invariant evicts: writing `EveryDay` evicts every
    /// specific-day scope for the `(subscriber, kind, direction)` pair, and
    /// writing a specific day evicts the `EveryDay` scope.
    pub fn plan_upsert(&self, scope: &Scope) -> UpsertPlan {
        let mut evicted = Vec::new();
        let mut identical = false;
        for existing in self.scopes_of(scope.subscriber) {
            if existing.kind != scope.kind || existing.direction != scope.direction {
                continue;
            }
            if existing.selector_conflicts_with(scope.selector) {
                evicted.push(existing.clone());
            } else if existing.same_slot(scope) && existing == scope {
                identical = true;
            }
        }
        UpsertPlan {
            changed: !identical,
            evicted,
        }
    }

    /// Applies a previously planned upsert: drops the evicted scopes and any
    /// same-slot predecessor, then registers the new scope.
    pub fn apply_upsert(&mut self, scope: Scope, plan: &UpsertPlan) {
        if !plan.changed {
            return;
        }
        for evicted in &plan.evicted {
            self.unregister(evicted);
        }
        let entry = self.scopes.entry(scope.subscriber).or_default();
        if let Some(pos) = entry.iter().position(|s| s.same_slot(&scope)) {
            let old = entry.remove(pos);
            Self::unregister_buckets(&mut self.buckets, &old);
        }
        for key in scope.bucket_keys() {
            self.buckets.entry(key).or_default().insert(scope.subscriber);
        }
        self.scopes.entry(scope.subscriber).or_default().push(scope);
    }

    /// Removes one selector's scope, or every scope for the pair when
    /// `selector` is `None`. Returns the removed scopes.
    pub fn remove(
        &mut self,
        subscriber: SubscriberId,
        kind: NoticeKind,
        direction: Direction,
        selector: Option<WeekdaySelector>,
    ) -> Vec<Scope> {
        let Some(entry) = self.scopes.get_mut(&subscriber) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        entry.retain(|scope| {
            let matches = scope.kind == kind
                && scope.direction == direction
                && selector.is_none_or(|sel| scope.selector == sel);
            if matches {
                removed.push(scope.clone());
            }
            !matches
        });
        if entry.is_empty() {
            self.scopes.remove(&subscriber);
        }
        for scope in &removed {
            Self::unregister_buckets(&mut self.buckets, scope);
        }
        removed
    }

    /// Removes every scope a subscriber holds, across kinds and directions.
    pub fn remove_subscriber(&mut self, subscriber: SubscriberId) -> Vec<Scope> {
        let removed = self.scopes.remove(&subscriber).unwrap_or_default();
        for scope in &removed {
            Self::unregister_buckets(&mut self.buckets, scope);
        }
        removed
    }

    fn unregister(&mut self, scope: &Scope) {
        if let Some(entry) = self.scopes.get_mut(&scope.subscriber) {
            entry.retain(|s| !s.same_slot(scope));
            if entry.is_empty() {
                self.scopes.remove(&scope.subscriber);
            }
        }
        Self::unregister_buckets(&mut self.buckets, scope);
    }

    fn unregister_buckets(buckets: &mut HashMap<BucketKey, HashSet<SubscriberId>>, scope: &Scope) {
        for key in scope.bucket_keys() {
            if let Some(bucket) = buckets.get_mut(&key) {
                bucket.remove(&scope.subscriber);
                if bucket.is_empty() {
                    buckets.remove(&key);
                }
            }
        }
    }
}

/// Thread-safe reverse index with write-through persistence.
///
/// Readers (`lookup`, `resolve_*`) take the read lock and observe one
/// consistent table generation; writers hold the write lock across both the
/// store call and the table edit.
#[derive(Debug)]
pub struct SubscriptionIndex<S> {
    table: RwLock<ScopeTable>,
    store: S,
}

impl<S: SubscriptionStore> SubscriptionIndex<S> {
    /// Creates an empty index over a store with no persisted scopes.
    pub fn new(store: S) -> Self {
        SubscriptionIndex {
            table: RwLock::new(ScopeTable::new()),
            store,
        }
    }

    /// Rebuilds the index from every persisted scope.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if the store cannot be read.
    pub async fn load(store: S) -> Result<Self, IndexError<S::Error>> {
        let scopes = store.load_all().await.map_err(IndexError::Store)?;
        let table = ScopeTable::from_scopes(scopes);
        debug!(scopes = table.len(), "rebuilt subscription index from store");
        Ok(SubscriptionIndex {
            table: RwLock::new(table),
            store,
        })
    }

    /// Inserts or replaces a scope, enforcing the mutual-exclusion
    /// invariant, and persists the change. Returns whether any state
    /// changed, so repeated identical subscriptions are detectable as
    /// no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if persisting fails; the in-memory
    /// table is left unchanged in that case.
    pub async fn upsert(&self, scope: Scope) -> Result<bool, IndexError<S::Error>> {
        let mut table = self.table.write().await;
        let plan = table.plan_upsert(&scope);
        if !plan.changed() {
            return Ok(false);
        }
        for evicted in plan.evicted() {
            self.store
                .delete(
                    evicted.subscriber,
                    evicted.kind,
                    evicted.direction,
                    Some(evicted.selector),
                )
                .await
                .map_err(IndexError::Store)?;
        }
        self.store.save(&scope).await.map_err(IndexError::Store)?;
        debug!(
            subscriber = %scope.subscriber,
            kind = %scope.kind,
            direction = %scope.direction,
            selector = %scope.selector,
            evicted = plan.evicted().len(),
            "scope upserted"
        );
        table.apply_upsert(scope, &plan);
        Ok(true)
    }

    /// Removes one selector's scope, or every scope for the
    /// `(subscriber, kind, direction)` pair when `selector` is `None`.
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if the store delete fails; the
    /// in-memory table is left unchanged in that case.
    pub async fn remove(
        &self,
        subscriber: SubscriberId,
        kind: NoticeKind,
        direction: Direction,
        selector: Option<WeekdaySelector>,
    ) -> Result<bool, IndexError<S::Error>> {
        let mut table = self.table.write().await;
        if !table.has_scope(subscriber, kind, direction, selector) {
            return Ok(false);
        }
        self.store
            .delete(subscriber, kind, direction, selector)
            .await
            .map_err(IndexError::Store)?;
        let removed = table.remove(subscriber, kind, direction, selector);
        debug!(
            subscriber = %subscriber,
            kind = %kind,
            direction = %direction,
            removed = removed.len(),
            "scopes removed"
        );
        Ok(!removed.is_empty())
    }

    /// Removes everything a subscriber holds (account deletion, role
    /// change). Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Store`] if any store delete fails.
    pub async fn remove_subscriber(
        &self,
        subscriber: SubscriberId,
    ) -> Result<bool, IndexError<S::Error>> {
        let mut table = self.table.write().await;
        let pairs: HashSet<(NoticeKind, Direction)> = table
            .scopes_of(subscriber)
            .iter()
            .map(|scope| (scope.kind, scope.direction))
            .collect();
        if pairs.is_empty() {
            return Ok(false);
        }
        for (kind, direction) in pairs {
            self.store
                .delete(subscriber, kind, direction, None)
                .await
                .map_err(IndexError::Store)?;
        }
        let removed = table.remove_subscriber(subscriber);
        debug!(subscriber = %subscriber, removed = removed.len(), "subscriber purged");
        Ok(true)
    }

    /// O(1) set retrieval for a single bucket. Returns an empty set for
    /// unknown keys, never an absent value.
    pub async fn lookup(&self, key: &BucketKey) -> HashSet<SubscriberId> {
        self.table.read().await.lookup(key)
    }

    /// Resolves the deduplicated recipient set for a published offer.
    ///
    /// All bucket lookups happen under a single read guard, so the result
    /// reflects one consistent index generation. See
    /// [`matcher::resolve_offers`] for the union and top-of-hour rules.
    pub async fn resolve_offer_subscribers(
        &self,
        direction: Direction,
        weekday: Weekday,
        time: NaiveTime,
        exclude: Option<&HashSet<SubscriberId>>,
    ) -> HashSet<SubscriberId> {
        let table = self.table.read().await;
        matcher::resolve_offers(&table, direction, weekday, time, exclude)
    }

    /// Resolves the deduplicated recipient set for a published request.
    /// No hour granularity: request scopes are day-keyed only.
    pub async fn resolve_request_subscribers(
        &self,
        direction: Direction,
        weekday: Weekday,
        exclude: Option<&HashSet<SubscriberId>>,
    ) -> HashSet<SubscriberId> {
        let table = self.table.read().await;
        matcher::resolve_requests(&table, direction, weekday, exclude)
    }
}
