//! Meetings: one required occurrence of an activity for a cohort.

use super::{ActivityId, CohortId};
use serde::{Deserialize, Serialize};

/// Identity of a single required meeting. Generated 1:1 from the activity
/// requirement counts, immutable for the rest of the run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeetingId {
    pub cohort: CohortId,
    pub activity: ActivityId,
    /// Zero-based index within the activity's meeting sequence.
    pub index: u32,
}

impl MeetingId {
    pub fn new(cohort: CohortId, activity: ActivityId, index: u32) -> Self {
        Self { cohort, activity, index }
    }
}

impl std::fmt::Display for MeetingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}/a{}#{}", self.cohort, self.activity, self.index)
    }
}

/// A required meeting with its static payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    /// Delivery hours charged against the trainer budget.
    pub hours: u32,
    /// True when the date is pinned by configuration; pinned meetings keep
    /// singleton domains and stay out of search.
    pub pinned: bool,
}

