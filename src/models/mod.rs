//! Core domain models for cohort training schedules.
//!
//! Typed entities shared by every pipeline stage: the calendar grid,
//! meetings, slot domains, trainers, and the derived pairing records.

pub mod calendar;
pub mod domain;
pub mod macros;
pub mod meeting;
pub mod trainer;


pub use calendar::{Calendar, CalendarRules, CalendarSlot, Timeslot, Weekday};
pub use domain::SlotDomain;
pub use meeting::{Meeting, MeetingId};
pub use trainer::{Trainer, TrainerAvailability};

crate::define_id_type!(u32, CohortId);
crate::define_id_type!(u32, ActivityId);
crate::define_id_type!(u32, TrainerId);
crate::define_id_type!(u32, SiteId);

use serde::{Deserialize, Serialize};

/// A pair of cohorts that could share one meeting of a shared activity.
///
/// Created only when the intersection of the two cohorts' effective domains
/// is non-empty. The lexicographically smaller cohort id is the primary
/// side; the other cohort's meeting is merged into it when the grouping is
/// active, and its hours are excluded from trainer-budget accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingCandidate {
    pub cohort_a: CohortId,
    pub cohort_b: CohortId,
    pub activity: ActivityId,
    /// `|domain_a ∩ domain_b| / min(|domain_a|, |domain_b|)`, in (0, 1].
    pub compatibility_score: f64,
    /// Triple count of the intersection, kept for diagnostics.
    pub intersection_size: usize,
}

/// Two meetings that could end up on the same trainer in overlapping
/// wall-clock time. Derived each run by the conflict pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictPair {
    pub a: MeetingId,
    pub b: MeetingId,
}
