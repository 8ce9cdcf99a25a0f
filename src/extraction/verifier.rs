//! Independent schedule verification.
//!
//! Every check here re-derives a rule class from the configuration and the
//! concrete schedule, deliberately bypassing the constraint encoding. The
//! solver satisfying the model while this pass reports violations means
//! the model is missing or mis-encoding a rule.

use super::{MeetingAssignment, MeetingRole, ScheduleResult, Violation, ViolationKind};
use crate::config::{Cohort, ScheduleConfig, SequencingRule};
use crate::models::calendar::{Calendar, Weekday};
use crate::models::{ActivityId, CohortId, MeetingId, TrainerId};
use log::debug;
use std::collections::BTreeMap;

/// Re-checks every rule class. An empty vector means the schedule is valid.
pub fn verify(
    config: &ScheduleConfig,
    calendar: &Calendar,
    result: &ScheduleResult,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_domain_membership(config, calendar, result, &mut violations);
    check_weekly_cap(config, result, &mut violations);
    check_meeting_order(config, result, &mut violations);
    check_sequencing(config, result, &mut violations);
    check_grouping(config, result, &mut violations);
    check_trainer_overlap(result, &mut violations);
    check_trainer_assignment(config, result, &mut violations);
    check_trainer_budget(config, result, &mut violations);
    check_saturday(config, result, &mut violations);

    debug!("verification: {} violation(s)", violations.len());
    violations
}

fn push(violations: &mut Vec<Violation>, kind: ViolationKind, message: String) {
    violations.push(Violation::new(kind, message));
}

/// Calendar validity, cohort windows, exclusions, occupied weeks, and
/// pinned dates.
fn check_domain_membership(
    config: &ScheduleConfig,
    calendar: &Calendar,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    for (id, m) in &result.meetings {
        let Some(cohort) = config.cohort(id.cohort) else {
            push(
                violations,
                ViolationKind::DomainMembership,
                format!("meeting {id} belongs to unknown cohort"),
            );
            continue;
        };

        if !calendar.is_valid_week(m.week) {
            push(
                violations,
                ViolationKind::DomainMembership,
                format!("meeting {id} lands in invalid week {}", m.week),
            );
        } else if !calendar.weekdays_for_week(m.week).contains(&m.weekday) {
            push(
                violations,
                ViolationKind::DomainMembership,
                format!("meeting {id} lands on a day week {} does not run", m.week),
            );
        }

        if let Some(pin) = cohort.pinned_for(id.activity, id.index) {
            if m.date != pin.date {
                push(
                    violations,
                    ViolationKind::PinnedDate,
                    format!("meeting {id} pinned to {} but scheduled on {}", pin.date, m.date),
                );
            }
            if let Some(allowed) = pin.timeslot_restriction() {
                if !allowed.contains(&m.timeslot) {
                    push(
                        violations,
                        ViolationKind::PinnedDate,
                        format!("meeting {id} timeslot violates its pinned time range"),
                    );
                }
            }
            // A pin overrides the cohort's own availability rules.
            continue;
        }

        if !window_permits(cohort, m) {
            push(
                violations,
                ViolationKind::DomainMembership,
                format!("meeting {id} falls outside the cohort's weekly windows"),
            );
        }
        for exclusion in &cohort.exclusions {
            if m.date >= exclusion.from && m.date <= exclusion.end() {
                let slot_hit = exclusion
                    .timeslots
                    .as_ref()
                    .map(|slots| slots.contains(&m.timeslot))
                    .unwrap_or(true);
                if slot_hit {
                    push(
                        violations,
                        ViolationKind::DomainMembership,
                        format!("meeting {id} hits exclusion '{}'", exclusion.label()),
                    );
                }
            }
        }
        if cohort.occupied_weeks.contains(&m.week) {
            push(
                violations,
                ViolationKind::DomainMembership,
                format!("meeting {id} lands in occupied week {}", m.week),
            );
        }
    }
}

fn window_permits(cohort: &Cohort, m: &MeetingAssignment) -> bool {
    cohort
        .windows
        .iter()
        .any(|w| w.weekday == m.weekday && w.timeslots.contains(&m.timeslot))
}

fn check_weekly_cap(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    for cohort in &config.cohorts {
        let mut per_week: BTreeMap<u32, Vec<MeetingId>> = BTreeMap::new();
        for (id, m) in &result.meetings {
            if id.cohort == cohort.id {
                per_week.entry(m.week).or_default().push(*id);
            }
        }
        for (week, ids) in per_week {
            if ids.len() > 1 {
                push(
                    violations,
                    ViolationKind::WeeklyCap,
                    format!("cohort {} holds {} meetings in week {week}", cohort.id, ids.len()),
                );
            }
        }
    }
}

fn check_meeting_order(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    for cohort in &config.cohorts {
        for &activity in &cohort.activities {
            let count = config.activity(activity).map(|a| a.meetings).unwrap_or(0);
            for index in 1..count {
                let prev = result.meetings.get(&MeetingId::new(cohort.id, activity, index - 1));
                let next = result.meetings.get(&MeetingId::new(cohort.id, activity, index));
                if let (Some(prev), Some(next)) = (prev, next) {
                    if next.week <= prev.week {
                        push(
                            violations,
                            ViolationKind::MeetingOrder,
                            format!(
                                "cohort {} activity {activity}: meeting {index} (week {}) not after meeting {} (week {})",
                                cohort.id, next.week, index - 1, prev.week
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn first_week(result: &ScheduleResult, cohort: CohortId, activity: ActivityId) -> Option<u32> {
    result
        .meetings
        .get(&MeetingId::new(cohort, activity, 0))
        .map(|m| m.week)
}

fn last_week(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    cohort: CohortId,
    activity: ActivityId,
) -> Option<u32> {
    let count = config.activity(activity)?.meetings;
    result
        .meetings
        .get(&MeetingId::new(cohort, activity, count.checked_sub(1)?))
        .map(|m| m.week)
}

fn check_sequencing(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    for cohort in &config.cohorts {
        for rule in &cohort.sequencing {
            match rule {
                SequencingRule::FinalActivity { activity } => {
                    let Some(start) = first_week(result, cohort.id, *activity) else {
                        continue;
                    };
                    for &other in &cohort.activities {
                        if other == *activity {
                            continue;
                        }
                        if let Some(end) = last_week(config, result, cohort.id, other) {
                            if start <= end {
                                push(
                                    violations,
                                    ViolationKind::Sequencing,
                                    format!(
                                        "cohort {}: final activity {activity} starts in week {start}, before activity {other} ends in week {end}",
                                        cohort.id
                                    ),
                                );
                            }
                        }
                    }
                }
                SequencingRule::Before { prerequisite, dependent } => {
                    let end = last_week(config, result, cohort.id, *prerequisite);
                    let start = first_week(result, cohort.id, *dependent);
                    if let (Some(end), Some(start)) = (end, start) {
                        if start <= end {
                            push(
                                violations,
                                ViolationKind::Sequencing,
                                format!(
                                    "cohort {}: activity {dependent} starts in week {start}, before prerequisite {prerequisite} ends in week {end}",
                                    cohort.id
                                ),
                            );
                        }
                    }
                }
                SequencingRule::MinWeekGap { activity, from_index, to_index, min_weeks } => {
                    let from = result.meetings.get(&MeetingId::new(cohort.id, *activity, *from_index));
                    let to = result.meetings.get(&MeetingId::new(cohort.id, *activity, *to_index));
                    if let (Some(from), Some(to)) = (from, to) {
                        if to.week < from.week + min_weeks {
                            push(
                                violations,
                                ViolationKind::Sequencing,
                                format!(
                                    "cohort {} activity {activity}: meetings {from_index} and {to_index} are {} week(s) apart, minimum is {min_weeks}",
                                    cohort.id,
                                    to.week.saturating_sub(from.week)
                                ),
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Active groupings synchronize every shared meeting; a cohort joins at
/// most one partner per activity.
fn check_grouping(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    let mut membership: BTreeMap<(CohortId, ActivityId), u32> = BTreeMap::new();

    for grouping in &result.active_groupings {
        *membership.entry((grouping.cohort_a, grouping.activity)).or_default() += 1;
        *membership.entry((grouping.cohort_b, grouping.activity)).or_default() += 1;

        let count = config
            .activity(grouping.activity)
            .map(|a| a.meetings)
            .unwrap_or(0);
        for index in 0..count {
            let a = result
                .meetings
                .get(&MeetingId::new(grouping.cohort_a, grouping.activity, index));
            let b = result
                .meetings
                .get(&MeetingId::new(grouping.cohort_b, grouping.activity, index));
            let (Some(a), Some(b)) = (a, b) else {
                push(
                    violations,
                    ViolationKind::GroupingSync,
                    format!(
                        "grouping c{}+c{} activity {}: meeting {index} missing on one side",
                        grouping.cohort_a, grouping.cohort_b, grouping.activity
                    ),
                );
                continue;
            };
            let synchronized = a.week == b.week
                && a.weekday == b.weekday
                && a.timeslot == b.timeslot
                && a.trainer == b.trainer;
            if !synchronized {
                push(
                    violations,
                    ViolationKind::GroupingSync,
                    format!(
                        "grouping c{}+c{} activity {}: meeting {index} diverges between partners",
                        grouping.cohort_a, grouping.cohort_b, grouping.activity
                    ),
                );
            }
            if !matches!(a.role, MeetingRole::Primary { partner } if partner == grouping.cohort_b) {
                push(
                    violations,
                    ViolationKind::GroupingSync,
                    format!(
                        "grouping c{}+c{} activity {}: primary meeting {index} mislabeled",
                        grouping.cohort_a, grouping.cohort_b, grouping.activity
                    ),
                );
            }
        }
    }

    for ((cohort, activity), count) in membership {
        if count > 1 {
            push(
                violations,
                ViolationKind::MultipleGroupings,
                format!("cohort {cohort} joins {count} groupings for activity {activity}"),
            );
        }
    }
}

/// No trainer can deliver two wall-clock-overlapping meetings. Secondary
/// meetings are the same delivery as their primary and are skipped.
fn check_trainer_overlap(result: &ScheduleResult, violations: &mut Vec<Violation>) {
    let deliveries: Vec<&MeetingAssignment> = result
        .meetings
        .values()
        .filter(|m| !matches!(m.role, MeetingRole::Secondary { .. }))
        .collect();

    for (i, a) in deliveries.iter().enumerate() {
        for b in deliveries.iter().skip(i + 1) {
            if a.trainer == b.trainer
                && a.week == b.week
                && a.weekday == b.weekday
                && a.timeslot.overlaps(b.timeslot)
            {
                push(
                    violations,
                    ViolationKind::TrainerOverlap,
                    format!(
                        "trainer {} delivers {} and {} in overlapping slots on {}",
                        a.trainer, a.meeting, b.meeting, a.date
                    ),
                );
            }
        }
    }
}

/// Availability, site coverage, and activity qualification of the
/// assigned trainer.
fn check_trainer_assignment(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    for (id, m) in &result.meetings {
        let Some(trainer) = config.trainer(m.trainer) else {
            push(
                violations,
                ViolationKind::TrainerAvailability,
                format!("meeting {id} assigned to unknown trainer {}", m.trainer),
            );
            continue;
        };
        if !trainer.availability.permits(m.weekday, m.timeslot) {
            push(
                violations,
                ViolationKind::TrainerAvailability,
                format!(
                    "trainer {} is unavailable on {:?} {:?} for meeting {id}",
                    trainer.id, m.weekday, m.timeslot
                ),
            );
        }
        if let Some(cohort) = config.cohort(id.cohort) {
            if !trainer.covers_site(cohort.site) {
                push(
                    violations,
                    ViolationKind::TrainerAvailability,
                    format!("trainer {} does not cover site {} for meeting {id}", trainer.id, cohort.site),
                );
            }
        }
        if !trainer.qualified_for(id.activity) {
            push(
                violations,
                ViolationKind::TrainerAvailability,
                format!("trainer {} is not qualified for activity {} of meeting {id}", trainer.id, id.activity),
            );
        }
    }
}

/// Hours are re-tallied from the meetings directly; the extractor's own
/// tally is not trusted here.
fn check_trainer_budget(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    let mut hours: BTreeMap<TrainerId, u32> = BTreeMap::new();
    for (id, m) in &result.meetings {
        if matches!(m.role, MeetingRole::Secondary { .. }) {
            continue;
        }
        *hours.entry(m.trainer).or_default() += config.activity_hours(id.activity);
    }
    for trainer in &config.trainers {
        let used = hours.get(&trainer.id).copied().unwrap_or(0);
        if used > trainer.budget_hours {
            push(
                violations,
                ViolationKind::TrainerBudget,
                format!(
                    "trainer {} delivers {used}h against a budget of {}h",
                    trainer.id, trainer.budget_hours
                ),
            );
        }
    }
}

/// Saturday deliveries need both a Saturday site and a Saturday-eligible
/// trainer.
fn check_saturday(
    config: &ScheduleConfig,
    result: &ScheduleResult,
    violations: &mut Vec<Violation>,
) {
    for (id, m) in &result.meetings {
        if m.weekday != Weekday::Saturday {
            continue;
        }
        if let Some(cohort) = config.cohort(id.cohort) {
            if !config.calendar.saturday_sites.contains(&cohort.site) {
                push(
                    violations,
                    ViolationKind::SaturdayRule,
                    format!("meeting {id} on Saturday at non-Saturday site {}", cohort.site),
                );
            }
        }
        let eligible = config
            .trainer(m.trainer)
            .map(|t| t.saturday_eligible)
            .unwrap_or(false);
        if !eligible {
            push(
                violations,
                ViolationKind::SaturdayRule,
                format!("meeting {id} on Saturday with non-eligible trainer {}", m.trainer),
            );
        }
    }
}
