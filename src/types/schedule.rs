//! Weekday selectors and hour ranges for subscription scopes.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from validating schedule values at the subscription edge.
///
/// These are rejected synchronously when a scope is configured; invalid
/// values never reach the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Hour range bounds must satisfy `0 <= start < end <= 24`.
    #[error("invalid hour range [{start}, {end}): bounds must satisfy 0 <= start < end <= 24")]
    InvalidHourRange { start: u8, end: u8 },
}

/// Which days of the week a scope covers.
///
/// `EveryDay` and specific weekdays are mutually exclusive per
/// (subscriber, kind, direction): configuring `EveryDay` replaces any
/// specific-day scopes and configuring a specific day replaces an `EveryDay`
/// scope. The index enforces this at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekdaySelector {
    /// All seven weekdays.
    EveryDay,
    /// Exactly one weekday.
    On(Weekday),
}

impl fmt::Display for WeekdaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekdaySelector::EveryDay => write!(f, "every day"),
            WeekdaySelector::On(day) => write!(f, "{day}"),
        }
    }
}

/// A half-open range of hour buckets, `[start, end)`.
///
/// `end` may be 24 so a range can cover the last hour of the day. A scope
/// without an hour range covers all hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HourRange {
    start: u8,
    end: u8,
}

impl HourRange {
    /// Creates a validated hour range.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidHourRange`] unless
    /// `0 <= start < end <= 24`.
    pub fn new(start: u8, end: u8) -> Result<Self, ScheduleError> {
        if start >= end || end > 24 {
            return Err(ScheduleError::InvalidHourRange { start, end });
        }
        Ok(HourRange { start, end })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    /// The hour buckets this range registers into, i.e. `start..end`.
    pub fn hours(&self) -> impl Iterator<Item = u8> + use<> {
        self.start..self.end
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
