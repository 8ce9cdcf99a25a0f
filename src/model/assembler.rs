//! Constraint model assembler.
//!
//! Turns precomputed domains, grouping candidates, and pre-filtered
//! conflict pairs into the formal [`Model`]: one (week, weekday, timeslot,
//! trainer, slot-code) variable bundle per meeting, one boolean per
//! grouping candidate, plus the hard-constraint classes and the weighted
//! soft objective. Pinned meetings get singleton domains so they stay in
//! weekly-cap and overlap accounting without enlarging the search space.

use super::constraints::{CmpOp, Condition, HardConstraint};
use super::{Model, VarId};
use crate::config::{ScheduleConfig, SequencingRule};
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::calendar::{Calendar, Weekday, ALL_TIMESLOTS, ALL_WEEKDAYS};
use crate::models::{
    ActivityId, CohortId, ConflictPair, GroupingCandidate, Meeting, MeetingId, SiteId, SlotDomain,
    TrainerId,
};
use log::info;
use std::collections::BTreeMap;

/// Decision variables of one meeting.
#[derive(Debug, Clone, Copy)]
pub struct MeetingVars {
    pub week: VarId,
    pub weekday: VarId,
    pub timeslot: VarId,
    pub trainer: VarId,
    /// Derived total order over the grid, linked linearly to the triple.
    pub slot_code: VarId,
}

/// The assembled model plus the registries needed to interpret an
/// assignment afterwards.
#[derive(Debug, Clone)]
pub struct AssembledModel {
    pub model: Model,
    pub meeting_vars: BTreeMap<MeetingId, MeetingVars>,
    pub grouping_vars: Vec<(GroupingCandidate, VarId)>,
    pub conflict_pairs: Vec<ConflictPair>,
}

impl AssembledModel {
    pub fn grouping_var(&self, candidate: &GroupingCandidate) -> Option<VarId> {
        self.grouping_vars
            .iter()
            .find(|(c, _)| {
                c.cohort_a == candidate.cohort_a
                    && c.cohort_b == candidate.cohort_b
                    && c.activity == candidate.activity
            })
            .map(|&(_, var)| var)
    }
}

/// Assembles the full constraint model.
///
/// Fails only on structural problems (a meeting with an empty domain must
/// be caught upstream as domain exhaustion); rules referencing activities
/// a cohort never performs are silent no-ops.
pub fn assemble(
    config: &ScheduleConfig,
    calendar: &Calendar,
    meetings: &[Meeting],
    domains: &BTreeMap<MeetingId, SlotDomain>,
    candidates: &[GroupingCandidate],
    conflict_pairs: &[ConflictPair],
) -> SchedulerResult<AssembledModel> {
    let mut model = Model::new();
    let mut meeting_vars: BTreeMap<MeetingId, MeetingVars> = BTreeMap::new();

    // Per-meeting variables, domain triples, and the slot-code link.
    for meeting in meetings {
        let domain = domains.get(&meeting.id).ok_or_else(|| {
            SchedulerError::Assembly(format!("meeting {} has no computed domain", meeting.id))
        })?;
        if domain.is_empty() {
            return Err(SchedulerError::Assembly(format!(
                "meeting {} reached assembly with an empty domain",
                meeting.id
            )));
        }
        let cohort = config.cohort(meeting.id.cohort).ok_or_else(|| {
            SchedulerError::Assembly(format!("meeting {} names an unknown cohort", meeting.id))
        })?;
        let vars = meeting_variables(&mut model, config, meeting, cohort.site, domain);
        meeting_vars.insert(meeting.id, vars);
    }

    add_weekly_cap(&mut model, config, &meeting_vars);
    add_meeting_order(&mut model, config, &meeting_vars);
    add_sequencing(&mut model, config, &meeting_vars);
    add_saturday_rule(&mut model, config, &meeting_vars, meetings, domains);
    let grouping_vars = add_grouping(&mut model, config, &meeting_vars, candidates);
    add_conflict_implications(&mut model, &meeting_vars, conflict_pairs, &grouping_vars);
    add_trainer_availability(&mut model, config, meetings, &meeting_vars);
    add_trainer_budgets(&mut model, config, meetings, &meeting_vars, &grouping_vars);
    add_objective(&mut model, config, calendar, &meeting_vars, &grouping_vars);

    info!(
        "assembled model: {} variables, {} constraints, {} objective terms",
        model.variables.len(),
        model.constraints.len(),
        model.objective.len()
    );
    Ok(AssembledModel {
        model,
        meeting_vars,
        grouping_vars,
        conflict_pairs: conflict_pairs.to_vec(),
    })
}

fn meeting_variables(
    model: &mut Model,
    config: &ScheduleConfig,
    meeting: &Meeting,
    site: SiteId,
    domain: &SlotDomain,
) -> MeetingVars {
    let id = meeting.id;
    let weeks: Vec<i64> = domain.weeks().map(|w| w as i64).collect();
    let weekdays: Vec<i64> = domain
        .cells()
        .map(|(_, day)| day.index() as i64)
        .collect();
    let timeslots: Vec<i64> = domain.iter().map(|s| s.timeslot.index() as i64).collect();
    let codes: Vec<i64> = domain.iter().map(|s| s.code()).collect();

    let week = model.new_var(format!("{id}/week"), weeks);
    let weekday = model.new_var(format!("{id}/weekday"), weekdays);
    let timeslot = model.new_var(format!("{id}/timeslot"), timeslots);
    let slot_code = model.new_var(format!("{id}/code"), codes);

    let trainer_ids: Vec<i64> = config
        .trainers
        .iter()
        .filter(|t| t.covers_site(site) && t.qualified_for(id.activity))
        .map(|t| t.id.value() as i64)
        .collect();
    let trainer = model.new_var(format!("{id}/trainer"), trainer_ids);

    // The triple must come from the compressed domain, not its projections.
    let tuples: Vec<Vec<i64>> = domain
        .iter()
        .map(|s| vec![s.week as i64, s.weekday.index() as i64, s.timeslot.index() as i64])
        .collect();
    model.add(HardConstraint::InTuples {
        vars: vec![week, weekday, timeslot],
        tuples,
    });
    // code = 18*week + 3*weekday + timeslot.
    model.add(HardConstraint::Linear {
        terms: vec![(18, week), (3, weekday), (1, timeslot), (-1, slot_code)],
        op: CmpOp::Eq,
        rhs: 0,
    });

    MeetingVars {
        week,
        weekday,
        timeslot,
        trainer,
        slot_code,
    }
}

/// A cohort's assigned weeks are pairwise distinct.
fn add_weekly_cap(
    model: &mut Model,
    config: &ScheduleConfig,
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
) {
    for cohort in &config.cohorts {
        let weeks: Vec<VarId> = meeting_vars
            .iter()
            .filter(|(id, _)| id.cohort == cohort.id)
            .map(|(_, vars)| vars.week)
            .collect();
        if weeks.len() > 1 {
            model.add(HardConstraint::AllDifferent { vars: weeks });
        }
    }
}

/// Meetings of one activity happen in strictly increasing week order.
fn add_meeting_order(
    model: &mut Model,
    config: &ScheduleConfig,
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
) {
    for cohort in &config.cohorts {
        for &activity in &cohort.activities {
            let count = config.activity(activity).map(|a| a.meetings).unwrap_or(0);
            for index in 1..count {
                let prev = meeting_vars.get(&MeetingId::new(cohort.id, activity, index - 1));
                let next = meeting_vars.get(&MeetingId::new(cohort.id, activity, index));
                if let (Some(prev), Some(next)) = (prev, next) {
                    model.add(HardConstraint::Linear {
                        terms: vec![(1, next.week), (-1, prev.week)],
                        op: CmpOp::Ge,
                        rhs: 1,
                    });
                }
            }
        }
    }
}

fn first_week_var(
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
    cohort: CohortId,
    activity: ActivityId,
) -> Option<VarId> {
    meeting_vars
        .get(&MeetingId::new(cohort, activity, 0))
        .map(|v| v.week)
}

fn last_week_var(
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
    config: &ScheduleConfig,
    cohort: CohortId,
    activity: ActivityId,
) -> Option<VarId> {
    let count = config.activity(activity)?.meetings;
    if count == 0 {
        return None;
    }
    meeting_vars
        .get(&MeetingId::new(cohort, activity, count - 1))
        .map(|v| v.week)
}

/// Activity sequencing: final-activity, prerequisite/dependent, and
/// minimum week gaps. Rules referencing activities the cohort never
/// performs do not apply and are skipped.
fn add_sequencing(
    model: &mut Model,
    config: &ScheduleConfig,
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
) {
    for cohort in &config.cohorts {
        for rule in &cohort.sequencing {
            match rule {
                SequencingRule::FinalActivity { activity } => {
                    let Some(final_start) = first_week_var(meeting_vars, cohort.id, *activity)
                    else {
                        continue;
                    };
                    for &other in &cohort.activities {
                        if other == *activity {
                            continue;
                        }
                        if let Some(other_end) =
                            last_week_var(meeting_vars, config, cohort.id, other)
                        {
                            model.add(HardConstraint::Linear {
                                terms: vec![(1, final_start), (-1, other_end)],
                                op: CmpOp::Ge,
                                rhs: 1,
                            });
                        }
                    }
                }
                SequencingRule::Before {
                    prerequisite,
                    dependent,
                } => {
                    let prereq_end = last_week_var(meeting_vars, config, cohort.id, *prerequisite);
                    let dependent_start = first_week_var(meeting_vars, cohort.id, *dependent);
                    if let (Some(end), Some(start)) = (prereq_end, dependent_start) {
                        model.add(HardConstraint::Linear {
                            terms: vec![(1, start), (-1, end)],
                            op: CmpOp::Ge,
                            rhs: 1,
                        });
                    }
                }
                SequencingRule::MinWeekGap {
                    activity,
                    from_index,
                    to_index,
                    min_weeks,
                } => {
                    let from = meeting_vars.get(&MeetingId::new(cohort.id, *activity, *from_index));
                    let to = meeting_vars.get(&MeetingId::new(cohort.id, *activity, *to_index));
                    if let (Some(from), Some(to)) = (from, to) {
                        model.add(HardConstraint::Linear {
                            terms: vec![(1, to.week), (-1, from.week)],
                            op: CmpOp::Ge,
                            rhs: *min_weeks as i64,
                        });
                    }
                }
            }
        }
    }
}

/// Saturday delivery requires a Saturday-eligible trainer. The site side
/// of the rule is already encoded in the domains.
fn add_saturday_rule(
    model: &mut Model,
    config: &ScheduleConfig,
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
    meetings: &[Meeting],
    domains: &BTreeMap<MeetingId, SlotDomain>,
) {
    let saturday = Weekday::Saturday.index() as i64;
    let eligible: Vec<i64> = config
        .trainers
        .iter()
        .filter(|t| t.saturday_eligible)
        .map(|t| t.id.value() as i64)
        .collect();

    for meeting in meetings {
        let reaches_saturday = domains
            .get(&meeting.id)
            .map(|d| d.cells().any(|(_, day)| day == Weekday::Saturday))
            .unwrap_or(false);
        if !reaches_saturday {
            continue;
        }
        let vars = &meeting_vars[&meeting.id];
        model.add(HardConstraint::If {
            cond: Condition::EqualsConst(vars.weekday, saturday),
            then: Box::new(HardConstraint::InSet {
                var: vars.trainer,
                values: eligible.clone(),
            }),
        });
    }
}

/// Conflict pairs compile to an implication: same trainer and same
/// calendar cell forbids overlapping timeslots. Most pairs end up on
/// different days or trainers, so the guard usually discharges.
///
/// A member that is the secondary side of an active grouping mirrors its
/// primary, whose own pairs already police the collision; such pairs get
/// an extra "grouping inactive" guard so the shared delivery itself is
/// not flagged.
fn add_conflict_implications(
    model: &mut Model,
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
    conflict_pairs: &[ConflictPair],
    grouping_vars: &[(GroupingCandidate, VarId)],
) {
    let mut secondary_lits: BTreeMap<(CohortId, ActivityId), Vec<VarId>> = BTreeMap::new();
    for (candidate, lit) in grouping_vars {
        secondary_lits
            .entry((candidate.cohort_b, candidate.activity))
            .or_default()
            .push(*lit);
    }
    let overlapping: Vec<Vec<i64>> = ALL_TIMESLOTS
        .iter()
        .flat_map(|&a| {
            ALL_TIMESLOTS
                .iter()
                .filter(move |&&b| a.overlaps(b))
                .map(move |&b| vec![a.index() as i64, b.index() as i64])
        })
        .collect();

    for pair in conflict_pairs {
        let (Some(a), Some(b)) = (meeting_vars.get(&pair.a), meeting_vars.get(&pair.b)) else {
            continue;
        };
        let mut guard = vec![
            Condition::VarsEqual(a.trainer, b.trainer),
            Condition::VarsEqual(a.week, b.week),
            Condition::VarsEqual(a.weekday, b.weekday),
        ];
        for member in [pair.a, pair.b] {
            if let Some(lits) = secondary_lits.get(&(member.cohort, member.activity)) {
                guard.extend(lits.iter().map(|&lit| Condition::EqualsConst(lit, 0)));
            }
        }
        model.add(HardConstraint::If {
            cond: Condition::And(guard),
            then: Box::new(HardConstraint::NotInTuples {
                vars: vec![a.timeslot, b.timeslot],
                tuples: overlapping.clone(),
            }),
        });
    }
}

/// One boolean per grouping candidate: when active, every meeting of the
/// shared activity is synchronized across the pair. Each cohort keeps at
/// most one active partner per activity.
fn add_grouping(
    model: &mut Model,
    config: &ScheduleConfig,
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
    candidates: &[GroupingCandidate],
) -> Vec<(GroupingCandidate, VarId)> {
    let mut grouping_vars = Vec::new();
    let mut per_cohort_activity: BTreeMap<(CohortId, ActivityId), Vec<VarId>> = BTreeMap::new();

    for candidate in candidates {
        let count = config
            .activity(candidate.activity)
            .map(|a| a.meetings)
            .unwrap_or(0);
        let lit = model.new_bool(format!(
            "group/c{}+c{}/a{}",
            candidate.cohort_a, candidate.cohort_b, candidate.activity
        ));

        for index in 0..count {
            let a = meeting_vars.get(&MeetingId::new(candidate.cohort_a, candidate.activity, index));
            let b = meeting_vars.get(&MeetingId::new(candidate.cohort_b, candidate.activity, index));
            let (Some(a), Some(b)) = (a, b) else {
                continue;
            };
            for (va, vb) in [
                (a.week, b.week),
                (a.weekday, b.weekday),
                (a.timeslot, b.timeslot),
                (a.trainer, b.trainer),
            ] {
                model.add(HardConstraint::If {
                    cond: Condition::LitTrue(lit),
                    then: Box::new(HardConstraint::Equal { a: va, b: vb }),
                });
            }
        }

        per_cohort_activity
            .entry((candidate.cohort_a, candidate.activity))
            .or_default()
            .push(lit);
        per_cohort_activity
            .entry((candidate.cohort_b, candidate.activity))
            .or_default()
            .push(lit);
        grouping_vars.push((candidate.clone(), lit));
    }

    for vars in per_cohort_activity.into_values() {
        if vars.len() > 1 {
            model.add(HardConstraint::AtMostOne { vars });
        }
    }
    grouping_vars
}

/// Per assigned trainer, the meeting's (weekday, timeslot) must satisfy
/// the trainer's availability rule. A trainer with no permitted pair is
/// thereby unusable for the meeting - infeasible, not silently ignored.
fn add_trainer_availability(
    model: &mut Model,
    config: &ScheduleConfig,
    meetings: &[Meeting],
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
) {
    for meeting in meetings {
        let vars = &meeting_vars[&meeting.id];
        let trainer_domain = model.var(vars.trainer).domain.clone();
        for trainer_id in trainer_domain {
            let Some(trainer) = config.trainer(TrainerId::new(trainer_id as u32)) else {
                continue;
            };
            let allowed: Vec<Vec<i64>> = ALL_WEEKDAYS
                .iter()
                .flat_map(|&day| {
                    ALL_TIMESLOTS
                        .iter()
                        .filter(move |&&slot| trainer.availability.permits(day, slot))
                        .map(move |&slot| vec![day.index() as i64, slot.index() as i64])
                })
                .collect();
            if allowed.len() == 18 {
                // Unrestricted; nothing to encode.
                continue;
            }
            model.add(HardConstraint::If {
                cond: Condition::EqualsConst(vars.trainer, trainer_id),
                then: Box::new(HardConstraint::InTuples {
                    vars: vec![vars.weekday, vars.timeslot],
                    tuples: allowed,
                }),
            });
        }
    }
}

/// Hour budgets: sum of hours of meetings on a trainer, minus hours of
/// meetings that are the secondary half of an active grouping with that
/// trainer, stays within the budget.
fn add_trainer_budgets(
    model: &mut Model,
    config: &ScheduleConfig,
    meetings: &[Meeting],
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
    grouping_vars: &[(GroupingCandidate, VarId)],
) {
    for trainer in &config.trainers {
        let trainer_value = trainer.id.value() as i64;
        let mut terms: Vec<(i64, VarId)> = Vec::new();
        // Assignment indicators, reused by the secondary exclusions below.
        let mut indicators: BTreeMap<MeetingId, VarId> = BTreeMap::new();

        for meeting in meetings {
            let vars = &meeting_vars[&meeting.id];
            if !model.var(vars.trainer).domain.contains(&trainer_value) {
                continue;
            }
            let lit = model.new_bool(format!("on/{}/t{}", meeting.id, trainer.id));
            model.add(HardConstraint::IffConst {
                lit,
                var: vars.trainer,
                value: trainer_value,
            });
            terms.push((meeting.hours as i64, lit));
            indicators.insert(meeting.id, lit);
        }

        for (candidate, group_lit) in grouping_vars {
            let count = config
                .activity(candidate.activity)
                .map(|a| a.meetings)
                .unwrap_or(0);
            for index in 0..count {
                let secondary = MeetingId::new(candidate.cohort_b, candidate.activity, index);
                let Some(&on_trainer) = indicators.get(&secondary) else {
                    continue;
                };
                let hours = config.activity_hours(candidate.activity) as i64;
                let excluded = model.new_bool(format!("excl/{}/t{}", secondary, trainer.id));
                model.add(HardConstraint::IffAnd {
                    lit: excluded,
                    of: vec![*group_lit, on_trainer],
                });
                terms.push((-hours, excluded));
            }
        }

        if !terms.is_empty() {
            model.add(HardConstraint::Linear {
                terms,
                op: CmpOp::Le,
                rhs: trainer.budget_hours as i64,
            });
        }
    }
}

/// The weighted soft objective. Every term is disableable by a zero
/// weight, in which case its auxiliary variables are never created.
fn add_objective(
    model: &mut Model,
    config: &ScheduleConfig,
    calendar: &Calendar,
    meeting_vars: &BTreeMap<MeetingId, MeetingVars>,
    grouping_vars: &[(GroupingCandidate, VarId)],
) {
    let weights = &config.objective;

    // Trainer continuity: bonus for consecutive activities of one cohort
    // sharing a trainer (representative: each activity's first meeting).
    if weights.trainer_continuity != 0 {
        for cohort in &config.cohorts {
            for pair in cohort.activities.windows(2) {
                let a = meeting_vars.get(&MeetingId::new(cohort.id, pair[0], 0));
                let b = meeting_vars.get(&MeetingId::new(cohort.id, pair[1], 0));
                let (Some(a), Some(b)) = (a, b) else {
                    continue;
                };
                let lit = model.new_bool(format!("cont/c{}/a{}+a{}", cohort.id, pair[0], pair[1]));
                model.add(HardConstraint::If {
                    cond: Condition::LitTrue(lit),
                    then: Box::new(HardConstraint::Equal {
                        a: a.trainer,
                        b: b.trainer,
                    }),
                });
                model.add_objective_term(weights.trainer_continuity, lit);
            }
        }
    }

    // Preferred partner: bonus when an active grouping matches a stated
    // preference on either side.
    if weights.preferred_partner != 0 {
        for (candidate, lit) in grouping_vars {
            let a_prefers = config
                .cohort(candidate.cohort_a)
                .and_then(|c| c.preferred_partner)
                == Some(candidate.cohort_b);
            let b_prefers = config
                .cohort(candidate.cohort_b)
                .and_then(|c| c.preferred_partner)
                == Some(candidate.cohort_a);
            if a_prefers || b_prefers {
                model.add_objective_term(weights.preferred_partner, *lit);
            }
        }
    }

    // Priority cohorts: penalty proportional to the last week reached.
    if weights.priority_early_finish != 0 {
        let week_values: Vec<i64> = calendar.weeks().map(|w| w as i64).collect();
        for cohort in &config.cohorts {
            if !cohort.priority {
                continue;
            }
            let weeks: Vec<VarId> = meeting_vars
                .iter()
                .filter(|(id, _)| id.cohort == cohort.id)
                .map(|(_, vars)| vars.week)
                .collect();
            if weeks.is_empty() {
                continue;
            }
            let makespan = model.new_var(format!("makespan/c{}", cohort.id), week_values.clone());
            for week in weeks {
                model.add(HardConstraint::Linear {
                    terms: vec![(1, makespan), (-1, week)],
                    op: CmpOp::Ge,
                    rhs: 0,
                });
            }
            model.add_objective_term(-weights.priority_early_finish, makespan);
        }
    }

    // Ideal activity ordering: bonus when consecutive activities of the
    // configured order finish in that order.
    if weights.ideal_ordering != 0 {
        for cohort in &config.cohorts {
            for pair in cohort.ideal_order.windows(2) {
                let earlier = last_week_var(meeting_vars, config, cohort.id, pair[0]);
                let later = last_week_var(meeting_vars, config, cohort.id, pair[1]);
                let (Some(earlier), Some(later)) = (earlier, later) else {
                    continue;
                };
                let lit = model.new_bool(format!("order/c{}/a{}<a{}", cohort.id, pair[0], pair[1]));
                model.add(HardConstraint::If {
                    cond: Condition::LitTrue(lit),
                    then: Box::new(HardConstraint::Linear {
                        terms: vec![(1, later), (-1, earlier)],
                        op: CmpOp::Ge,
                        rhs: 1,
                    }),
                });
                model.add_objective_term(weights.ideal_ordering, lit);
            }
        }
    }
}
