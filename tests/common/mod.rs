//! Shared integration-test harness: a small exhaustive solver and
//! configuration builders.

use chrono::NaiveDate;
use rota_rust::config::{
    Activity, Cohort, DayWindow, ObjectiveWeights, ScheduleConfig, Site,
};
use rota_rust::model::{Assignment, Model, VarId};
use rota_rust::models::calendar::{CalendarRules, Weekday, ALL_TIMESLOTS};
use rota_rust::models::{
    ActivityId, CohortId, SiteId, Trainer, TrainerAvailability, TrainerId,
};
use rota_rust::solver::{SolveBudget, SolveOutcome, Solver};
use std::time::Instant;

/// Depth-first exhaustive search with three-valued constraint pruning.
/// Only suitable for the tiny models these tests build; it proves
/// optimality by exhausting the space.
pub struct ExhaustiveSolver;

impl Solver for ExhaustiveSolver {
    fn solve(&self, model: &Model, budget: &SolveBudget) -> SolveOutcome {
        let deadline = Instant::now() + budget.wall_clock;

        // Constraint indices per variable, so each decision only
        // re-evaluates constraints it can have changed.
        let mut by_var: Vec<Vec<usize>> = vec![Vec::new(); model.variables.len()];
        for (index, constraint) in model.constraints.iter().enumerate() {
            for var in constraint.vars() {
                by_var[var.0].push(index);
            }
        }

        let mut assignment = Assignment::new();
        let mut best: Option<(i64, Assignment)> = None;
        let mut timed_out = false;
        search(
            model,
            &by_var,
            0,
            &mut assignment,
            &mut best,
            deadline,
            &mut timed_out,
        );

        match (best, timed_out) {
            (Some((_, solution)), false) => SolveOutcome::Optimal(solution),
            (Some((_, solution)), true) => SolveOutcome::Feasible(solution),
            (None, false) => SolveOutcome::Infeasible,
            (None, true) => SolveOutcome::Inconclusive,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn search(
    model: &Model,
    by_var: &[Vec<usize>],
    index: usize,
    assignment: &mut Assignment,
    best: &mut Option<(i64, Assignment)>,
    deadline: Instant,
    timed_out: &mut bool,
) {
    if *timed_out {
        return;
    }
    if Instant::now() > deadline {
        *timed_out = true;
        return;
    }
    if index == model.variables.len() {
        if model.is_satisfied(assignment) {
            let value = model.objective_value(assignment);
            if best.as_ref().map(|&(b, _)| value > b).unwrap_or(true) {
                *best = Some((value, assignment.clone()));
            }
        }
        return;
    }

    let var = VarId(index);
    for value in model.variables[index].domain.clone() {
        assignment.set(var, value);
        let viable = by_var[index]
            .iter()
            .all(|&c| model.constraints[c].eval(assignment) != Some(false));
        if viable {
            search(model, by_var, index + 1, assignment, best, deadline, timed_out);
        }
        assignment.unset(var);
    }
}

/// Regular calendar anchored to Monday 2026-01-05.
pub fn calendar_rules(first_week: u32, last_week: u32) -> CalendarRules {
    CalendarRules {
        first_week,
        last_week,
        first_monday: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        blackout_weeks: vec![],
        week_overrides: vec![],
        saturday_sites: vec![],
    }
}

pub fn site(id: u32) -> Site {
    Site {
        id: SiteId::new(id),
        name: format!("Site {id}"),
    }
}

pub fn activity(id: u32, meetings: u32, hours: u32) -> Activity {
    Activity {
        id: ActivityId::new(id),
        name: format!("Activity {id}"),
        meetings,
        hours_per_meeting: hours,
    }
}

pub fn cohort(id: u32, site: u32, activities: &[u32], weekdays: &[Weekday]) -> Cohort {
    Cohort {
        id: CohortId::new(id),
        name: format!("Cohort {id}"),
        site: SiteId::new(site),
        windows: weekdays
            .iter()
            .map(|&weekday| DayWindow {
                weekday,
                timeslots: ALL_TIMESLOTS.to_vec(),
            })
            .collect(),
        exclusions: vec![],
        pinned: vec![],
        occupied_weeks: vec![],
        activities: activities.iter().map(|&a| ActivityId::new(a)).collect(),
        preferred_partner: None,
        priority: false,
        sequencing: vec![],
        ideal_order: vec![],
    }
}

/// Trainer available Monday through Friday, morning and afternoon.
pub fn trainer(id: u32, budget_hours: u32) -> Trainer {
    let weekdays = vec![
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];
    Trainer {
        id: TrainerId::new(id),
        name: format!("Trainer {id}"),
        availability: TrainerAvailability::WeekdaySets {
            morning: weekdays.clone(),
            afternoon: weekdays,
        },
        budget_hours,
        saturday_eligible: false,
        sites: None,
        activities: None,
    }
}

pub fn config(
    rules: CalendarRules,
    sites: Vec<Site>,
    activities: Vec<Activity>,
    cohorts: Vec<Cohort>,
    trainers: Vec<Trainer>,
) -> ScheduleConfig {
    ScheduleConfig {
        calendar: rules,
        sites,
        activities,
        cohorts,
        trainers,
        objective: ObjectiveWeights::default(),
    }
}
