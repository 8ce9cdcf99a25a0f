//! Assignment-to-schedule resolution.

use super::{MeetingAssignment, MeetingRole, ScheduleResult, ScheduleRow};
use crate::config::ScheduleConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::model::{Assignment, AssembledModel, VarId};
use crate::models::calendar::{slot_code, Calendar, Timeslot, Weekday};
use crate::models::{CohortId, GroupingCandidate, MeetingId, TrainerId};
use log::debug;
use std::collections::BTreeMap;

/// Resolves a complete assignment into a [`ScheduleResult`].
///
/// Fails when the assignment omits a meeting variable or carries a value
/// outside its encoded range; both indicate a solver integration bug.
pub fn extract(
    config: &ScheduleConfig,
    calendar: &Calendar,
    assembled: &AssembledModel,
    assignment: &Assignment,
) -> SchedulerResult<ScheduleResult> {
    let active_groupings = active_groupings(assembled, assignment)?;
    let roles = meeting_roles(config, &active_groupings);

    let mut meetings: BTreeMap<MeetingId, MeetingAssignment> = BTreeMap::new();
    for (&id, vars) in &assembled.meeting_vars {
        let week = value_of(assignment, vars.week, id)? as u32;
        let weekday = Weekday::from_index(value_of(assignment, vars.weekday, id)? as u8)
            .ok_or_else(|| out_of_range(id, "weekday"))?;
        let timeslot = Timeslot::from_index(value_of(assignment, vars.timeslot, id)? as u8)
            .ok_or_else(|| out_of_range(id, "timeslot"))?;
        let trainer = TrainerId::new(value_of(assignment, vars.trainer, id)? as u32);
        let code = value_of(assignment, vars.slot_code, id)?;
        if code != slot_code(week, weekday, timeslot) {
            return Err(SchedulerError::Extraction(format!(
                "meeting {id}: slot code {code} disagrees with its triple"
            )));
        }
        meetings.insert(
            id,
            MeetingAssignment {
                meeting: id,
                week,
                weekday,
                timeslot,
                date: calendar.date_of(week, weekday),
                trainer,
                role: roles.get(&id).copied().unwrap_or(MeetingRole::Solo),
            },
        );
    }

    let trainer_hours = tally_trainer_hours(config, &meetings);
    let rows = build_rows(&meetings);
    let objective_value = assembled.model.objective_value(assignment);
    debug!(
        "extracted {} meetings into {} rows, objective {}",
        meetings.len(),
        rows.len(),
        objective_value
    );

    Ok(ScheduleResult {
        rows,
        meetings,
        trainer_hours,
        active_groupings,
        objective_value,
    })
}

fn value_of(assignment: &Assignment, var: VarId, meeting: MeetingId) -> SchedulerResult<i64> {
    assignment.get(var).ok_or_else(|| {
        SchedulerError::Extraction(format!("meeting {meeting}: unassigned variable {var}"))
    })
}

fn out_of_range(meeting: MeetingId, what: &str) -> SchedulerError {
    SchedulerError::Extraction(format!("meeting {meeting}: {what} value out of range"))
}

fn active_groupings(
    assembled: &AssembledModel,
    assignment: &Assignment,
) -> SchedulerResult<Vec<GroupingCandidate>> {
    let mut active = Vec::new();
    for (candidate, lit) in &assembled.grouping_vars {
        match assignment.get(*lit) {
            Some(1) => active.push(candidate.clone()),
            Some(0) => {}
            Some(other) => {
                return Err(SchedulerError::Extraction(format!(
                    "grouping literal for c{}+c{} holds non-boolean value {other}",
                    candidate.cohort_a, candidate.cohort_b
                )))
            }
            None => {
                return Err(SchedulerError::Extraction(format!(
                    "grouping literal for c{}+c{} left unassigned",
                    candidate.cohort_a, candidate.cohort_b
                )))
            }
        }
    }
    Ok(active)
}

fn meeting_roles(
    config: &ScheduleConfig,
    active: &[GroupingCandidate],
) -> BTreeMap<MeetingId, MeetingRole> {
    let mut roles = BTreeMap::new();
    for candidate in active {
        let count = config
            .activity(candidate.activity)
            .map(|a| a.meetings)
            .unwrap_or(0);
        for index in 0..count {
            roles.insert(
                MeetingId::new(candidate.cohort_a, candidate.activity, index),
                MeetingRole::Primary {
                    partner: candidate.cohort_b,
                },
            );
            roles.insert(
                MeetingId::new(candidate.cohort_b, candidate.activity, index),
                MeetingRole::Secondary {
                    partner: candidate.cohort_a,
                },
            );
        }
    }
    roles
}

/// Hours per trainer; a grouped pair is one delivery, charged on the
/// primary side only.
fn tally_trainer_hours(
    config: &ScheduleConfig,
    meetings: &BTreeMap<MeetingId, MeetingAssignment>,
) -> BTreeMap<TrainerId, u32> {
    let mut hours: BTreeMap<TrainerId, u32> = BTreeMap::new();
    for (id, assignment) in meetings {
        if matches!(assignment.role, MeetingRole::Secondary { .. }) {
            continue;
        }
        *hours.entry(assignment.trainer).or_default() += config.activity_hours(id.activity);
    }
    hours
}

fn build_rows(meetings: &BTreeMap<MeetingId, MeetingAssignment>) -> Vec<ScheduleRow> {
    let mut rows: Vec<ScheduleRow> = meetings
        .values()
        .filter_map(|m| {
            let cohorts: Vec<CohortId> = match m.role {
                MeetingRole::Solo => vec![m.meeting.cohort],
                MeetingRole::Primary { partner } => vec![m.meeting.cohort, partner],
                // Folded into the primary's row.
                MeetingRole::Secondary { .. } => return None,
            };
            Some(ScheduleRow {
                date: m.date,
                week: m.week,
                weekday: m.weekday,
                timeslot: m.timeslot,
                activity: m.meeting.activity,
                meeting_index: m.meeting.index,
                trainer: m.trainer,
                cohorts,
            })
        })
        .collect();
    rows.sort_by_key(|r| {
        (
            slot_code(r.week, r.weekday, r.timeslot),
            r.trainer,
            r.cohorts.clone(),
        )
    });
    rows
}
