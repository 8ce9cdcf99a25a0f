//! Conflict pre-filter.
//!
//! A naive model adds a trainer-overlap constraint for every meeting pair,
//! which is quadratic and mostly redundant: two meetings whose domains
//! never share a reachable calendar cell can never collide. This pass
//! buckets meetings by every (week, weekday) cell their domain permits and
//! emits a [`ConflictPair`] only for cross pairs whose timeslot sets can
//! overlap in wall-clock time. Work is bounded by the total domain size.

use crate::models::{ConflictPair, Meeting, MeetingId, SlotDomain, Timeslot, Weekday};
use log::info;
use std::collections::{BTreeMap, BTreeSet};

/// Emits the minimal set of potentially-overlapping meeting pairs.
///
/// `excluded_secondary` holds meetings that are always the secondary side
/// of some grouping: their slot and trainer are derived from the primary,
/// so the primary's pairs already cover them.
pub fn compute_conflict_pairs(
    meetings: &[Meeting],
    domains: &BTreeMap<MeetingId, SlotDomain>,
    excluded_secondary: &BTreeSet<MeetingId>,
) -> Vec<ConflictPair> {
    // (week, weekday) cell -> meetings reaching it, with the timeslots
    // their domain admits in that cell.
    let mut buckets: BTreeMap<(u32, Weekday), Vec<(MeetingId, BTreeSet<Timeslot>)>> =
        BTreeMap::new();

    for meeting in meetings {
        if excluded_secondary.contains(&meeting.id) {
            continue;
        }
        let Some(domain) = domains.get(&meeting.id) else {
            continue;
        };
        for (week, weekday) in domain.cells() {
            let slots: BTreeSet<Timeslot> = domain.timeslots(week, weekday).collect();
            buckets
                .entry((week, weekday))
                .or_default()
                .push((meeting.id, slots));
        }
    }

    // A pair may meet in several cells; the set deduplicates.
    let mut pairs: BTreeSet<ConflictPair> = BTreeSet::new();
    for entries in buckets.values() {
        for (i, (id_a, slots_a)) in entries.iter().enumerate() {
            for (id_b, slots_b) in entries.iter().skip(i + 1) {
                // Same-cohort meetings are separated by the weekly cap.
                if id_a.cohort == id_b.cohort {
                    continue;
                }
                if slots_can_overlap(slots_a, slots_b) {
                    let (a, b) = if id_a <= id_b { (*id_a, *id_b) } else { (*id_b, *id_a) };
                    pairs.insert(ConflictPair { a, b });
                }
            }
        }
    }

    let out: Vec<ConflictPair> = pairs.into_iter().collect();
    info!(
        "conflict pre-filter: {} pairs from {} meetings",
        out.len(),
        meetings.len()
    );
    out
}

fn slots_can_overlap(a: &BTreeSet<Timeslot>, b: &BTreeSet<Timeslot>) -> bool {
    a.iter()
        .any(|&sa| b.iter().any(|&sb| sa.overlaps(sb)))
}
