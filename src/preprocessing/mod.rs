//! Pre-solve stages: domain reduction, grouping compatibility, and the
//! conflict pre-filter.
//!
//! Every stage is a pure function over the immutable configuration and the
//! previous stage's output; each unit of work (cohort, candidate pair)
//! writes to a disjoint output slot, so the stages are parallelizable by
//! construction even though they run sequentially.

pub mod conflicts;
pub mod domains;
pub mod grouping;


pub use conflicts::compute_conflict_pairs;
pub use domains::{compute_domains, DomainComputation, DomainExhaustion, ExhaustionCause};
pub use grouping::compute_grouping_candidates;

use crate::models::{GroupingCandidate, Meeting, MeetingId};
use std::collections::BTreeSet;

/// Meetings that are always the secondary side of some grouping candidate:
/// their cohort is the secondary (`cohort_b`) party for that activity in at
/// least one candidate and the primary party in none. Their slot and
/// trainer are derived from the primary when grouped, so the conflict
/// pre-filter skips them.
pub fn always_secondary_meetings(
    meetings: &[Meeting],
    candidates: &[GroupingCandidate],
) -> BTreeSet<MeetingId> {
    let mut secondary: BTreeSet<(crate::models::CohortId, crate::models::ActivityId)> =
        BTreeSet::new();
    let mut primary: BTreeSet<(crate::models::CohortId, crate::models::ActivityId)> =
        BTreeSet::new();
    for candidate in candidates {
        secondary.insert((candidate.cohort_b, candidate.activity));
        primary.insert((candidate.cohort_a, candidate.activity));
    }
    meetings
        .iter()
        .filter(|m| {
            let key = (m.id.cohort, m.id.activity);
            secondary.contains(&key) && !primary.contains(&key)
        })
        .map(|m| m.id)
        .collect()
}
