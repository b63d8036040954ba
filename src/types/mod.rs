//! Core domain types shared across the crate.

mod direction;
mod ids;
mod notice;
mod schedule;

pub use direction::Direction;
pub use ids::SubscriberId;
pub use notice::{NoticeKind, Payload};
pub use schedule::{HourRange, ScheduleError, WeekdaySelector};
