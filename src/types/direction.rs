//! The two travel directions of the commute route.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two fixed directions on the modeled commute route.
///
/// The route has exactly two endpoints; every trip, request, and notification
/// scope is tied to one direction of travel between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards the campus endpoint.
    ToCampus,
    /// Away from the campus endpoint.
    FromCampus,
}

impl Direction {
    /// All directions, in a fixed order. Useful for iterating per-direction
    /// state (e.g. when removing every scope a subscriber holds).
    pub const ALL: [Direction; 2] = [Direction::ToCampus, Direction::FromCampus];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToCampus => write!(f, "to campus"),
            Direction::FromCampus => write!(f, "from campus"),
        }
    }
}
