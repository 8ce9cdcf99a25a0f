//! Solution extraction and independent verification.
//!
//! [`extractor::extract`] resolves a solver assignment into concrete dated
//! meetings, merged schedule rows, trainer hour tallies, and the set of
//! groupings the solver activated. [`verifier::verify`] then re-derives
//! every hard-constraint class directly from the schedule and the
//! configuration, without trusting the model encoding; a non-empty
//! violation list means the model under-encodes some rule.

use crate::models::calendar::{Timeslot, Weekday};
use crate::models::{ActivityId, CohortId, GroupingCandidate, MeetingId, TrainerId};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub mod extractor;
pub mod verifier;

pub use extractor::extract;
pub use verifier::verify;

/// A meeting's position in a grouping, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeetingRole {
    Solo,
    /// Grouped; this cohort hosts and its trainer hours count.
    Primary { partner: CohortId },
    /// Grouped; delivery is shared with the partner's meeting and the
    /// trainer hours are charged there.
    Secondary { partner: CohortId },
}

/// One meeting, fully resolved.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingAssignment {
    pub meeting: MeetingId,
    pub week: u32,
    pub weekday: Weekday,
    pub timeslot: Timeslot,
    pub date: NaiveDate,
    pub trainer: TrainerId,
    pub role: MeetingRole,
}

/// One delivery on the calendar. Grouped meetings collapse into a single
/// row listing both cohorts.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRow {
    pub date: NaiveDate,
    pub week: u32,
    pub weekday: Weekday,
    pub timeslot: Timeslot,
    pub activity: ActivityId,
    pub meeting_index: u32,
    pub trainer: TrainerId,
    /// Attending cohorts, primary first.
    pub cohorts: Vec<CohortId>,
}

/// The extracted schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResult {
    pub rows: Vec<ScheduleRow>,
    /// Keyed by meeting id; rendered as a sequence in JSON (composite
    /// keys are not valid JSON object keys).
    #[serde(serialize_with = "meetings_as_seq")]
    pub meetings: BTreeMap<MeetingId, MeetingAssignment>,
    /// Budget-relevant hours per trainer (active-grouping secondaries
    /// excluded).
    pub trainer_hours: BTreeMap<TrainerId, u32>,
    pub active_groupings: Vec<GroupingCandidate>,
    pub objective_value: i64,
}

impl ScheduleResult {
    /// JSON rendering for downstream report and export tooling.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn meetings_as_seq<S>(
    meetings: &BTreeMap<MeetingId, MeetingAssignment>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(meetings.values())
}

/// Rule classes the verifier re-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    DomainMembership,
    WeeklyCap,
    MeetingOrder,
    Sequencing,
    GroupingSync,
    MultipleGroupings,
    TrainerOverlap,
    TrainerAvailability,
    TrainerBudget,
    SaturdayRule,
    PinnedDate,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::DomainMembership => "domain membership",
            ViolationKind::WeeklyCap => "weekly cap",
            ViolationKind::MeetingOrder => "meeting order",
            ViolationKind::Sequencing => "sequencing",
            ViolationKind::GroupingSync => "grouping sync",
            ViolationKind::MultipleGroupings => "multiple groupings",
            ViolationKind::TrainerOverlap => "trainer overlap",
            ViolationKind::TrainerAvailability => "trainer availability",
            ViolationKind::TrainerBudget => "trainer budget",
            ViolationKind::SaturdayRule => "saturday rule",
            ViolationKind::PinnedDate => "pinned date",
        };
        f.write_str(name)
    }
}

/// One broken rule, with enough context to debug the encoding.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
