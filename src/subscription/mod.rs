//! Subscription scopes, the durable store seam, the reverse index, and
//! recipient resolution.
//!
//! # Module Structure
//!
//! - [`scope`]: the `Scope` value type and reverse-index bucket keys
//! - [`store`]: the `SubscriptionStore` collaborator trait
//! - [`index`]: the pure `ScopeTable` and the locked, write-through
//!   `SubscriptionIndex`
//! - [`matcher`]: the bucket-union rules that turn a published event into a
//!   recipient set

pub mod index;
pub mod matcher;
pub mod scope;
pub mod store;

pub use index::{IndexError, ScopeTable, SubscriptionIndex, UpsertPlan};
pub use scope::{BucketKey, DayKey, HourKey, Scope};
pub use store::SubscriptionStore;
