//! End-to-end pipeline.
//!
//! Wires preprocessing, assembly, the external solver, and extraction into
//! one call. Unschedulable inputs are reported as outcomes with
//! diagnostics, not errors; [`SchedulerError`] is reserved for broken
//! configuration, assembly bugs, and verification failures.

use crate::error::{SchedulerError, SchedulerResult};
use crate::extraction::{self, ScheduleResult};
use crate::model;
use crate::models::{Calendar, CohortId, SiteId};
use crate::preprocessing::{
    always_secondary_meetings, compute_conflict_pairs, compute_domains,
    compute_grouping_candidates, DomainExhaustion,
};
use crate::config::ScheduleConfig;
use crate::solver::{SolveBudget, SolveOutcome, Solver};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

/// Why an infeasible model is likely infeasible, derived from the input
/// alone. Heuristic, but the two dominant causes in practice are a global
/// hour shortage and a cohort with more meetings than free weeks.
#[derive(Debug, Clone, Serialize)]
pub struct InfeasibilityDiagnostics {
    /// Delivery hours required if nothing is grouped.
    pub required_hours: u32,
    /// Sum of all trainer budgets.
    pub available_budget_hours: u32,
    pub site_margins: Vec<SiteMargin>,
    pub cohort_margins: Vec<CohortMargin>,
}

/// Hour demand vs. trainer supply at one site. A trainer covering several
/// sites counts toward each of them, so site budgets can overlap.
#[derive(Debug, Clone, Serialize)]
pub struct SiteMargin {
    pub site: SiteId,
    pub required_hours: u32,
    pub available_budget_hours: u32,
}

impl SiteMargin {
    pub fn is_tight(&self) -> bool {
        self.available_budget_hours < self.required_hours
    }
}

/// Meetings demanded vs. weeks available for one cohort. A negative-margin
/// cohort (fewer weeks than meetings) can never satisfy the weekly cap.
#[derive(Debug, Clone, Serialize)]
pub struct CohortMargin {
    pub cohort: CohortId,
    pub meetings: usize,
    pub available_weeks: usize,
}

impl CohortMargin {
    pub fn is_tight(&self) -> bool {
        self.available_weeks < self.meetings
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    Scheduled(ScheduleResult),
    /// One or more required meetings have no legal slot at all; solving
    /// was never attempted.
    DomainExhausted(Vec<DomainExhaustion>),
    Infeasible(InfeasibilityDiagnostics),
    /// The solver budget ran out without a verdict.
    Inconclusive,
}

/// Runs the full pipeline over an already-validated configuration.
///
/// # Arguments
/// * `config` - the scheduling problem
/// * `solver` - the external solver implementation
/// * `budget` - resource limits for the solve call
pub fn run(
    config: &ScheduleConfig,
    solver: &dyn Solver,
    budget: &SolveBudget,
) -> SchedulerResult<PipelineOutcome> {
    let calendar = Calendar::new(config.calendar.clone());
    info!(
        "scheduling {} cohorts, {} trainers over {} weeks",
        config.cohorts.len(),
        config.trainers.len(),
        calendar.weeks().count()
    );

    let computation = compute_domains(config, &calendar);
    if !computation.exhausted.is_empty() {
        warn!(
            "{} meeting(s) have empty domains; not solving",
            computation.exhausted.len()
        );
        return Ok(PipelineOutcome::DomainExhausted(computation.exhausted));
    }

    let meetings = config.meetings();
    let candidates = compute_grouping_candidates(config, &computation);
    let excluded = always_secondary_meetings(&meetings, &candidates);
    let mut conflict_pairs = compute_conflict_pairs(&meetings, &computation.domains, &excluded);
    // Excluded meetings only mirror a primary while their grouping is
    // active; their own pairs come back here and the assembler guards
    // them with the grouping literal.
    let all_pairs = compute_conflict_pairs(&meetings, &computation.domains, &BTreeSet::new());
    conflict_pairs.extend(
        all_pairs
            .into_iter()
            .filter(|p| excluded.contains(&p.a) || excluded.contains(&p.b)),
    );
    let assembled = model::assemble(
        config,
        &calendar,
        &meetings,
        &computation.domains,
        &candidates,
        &conflict_pairs,
    )?;

    match solver.solve(&assembled.model, budget) {
        SolveOutcome::Optimal(assignment) | SolveOutcome::Feasible(assignment) => {
            let result = extraction::extract(config, &calendar, &assembled, &assignment)?;
            let violations = extraction::verify(config, &calendar, &result);
            if !violations.is_empty() {
                return Err(SchedulerError::VerificationFailed(violations));
            }
            info!(
                "scheduled {} deliveries, objective {}",
                result.rows.len(),
                result.objective_value
            );
            Ok(PipelineOutcome::Scheduled(result))
        }
        SolveOutcome::Infeasible => {
            let diagnostics = diagnose(config, &calendar);
            warn!(
                "model infeasible: {}h required vs {}h budgeted, {} tight cohort(s)",
                diagnostics.required_hours,
                diagnostics.available_budget_hours,
                diagnostics.cohort_margins.iter().filter(|m| m.is_tight()).count()
            );
            Ok(PipelineOutcome::Infeasible(diagnostics))
        }
        SolveOutcome::Inconclusive => Ok(PipelineOutcome::Inconclusive),
    }
}

fn diagnose(config: &ScheduleConfig, calendar: &Calendar) -> InfeasibilityDiagnostics {
    let meetings = config.meetings();
    let required_hours = meetings.iter().map(|m| m.hours).sum();
    let available_budget_hours = config.trainers.iter().map(|t| t.budget_hours).sum();

    let site_margins = config
        .sites
        .iter()
        .map(|site| {
            let required = meetings
                .iter()
                .filter(|m| {
                    config
                        .cohort(m.id.cohort)
                        .map(|c| c.site == site.id)
                        .unwrap_or(false)
                })
                .map(|m| m.hours)
                .sum();
            let budget = config
                .trainers
                .iter()
                .filter(|t| t.covers_site(site.id))
                .map(|t| t.budget_hours)
                .sum();
            SiteMargin {
                site: site.id,
                required_hours: required,
                available_budget_hours: budget,
            }
        })
        .collect();

    let cohort_margins = config
        .cohorts
        .iter()
        .map(|cohort| {
            let meetings = cohort
                .activities
                .iter()
                .map(|&a| config.activity(a).map(|a| a.meetings as usize).unwrap_or(0))
                .sum();
            let available_weeks = calendar
                .weeks()
                .filter(|w| !cohort.occupied_weeks.contains(w))
                .count();
            CohortMargin {
                cohort: cohort.id,
                meetings,
                available_weeks,
            }
        })
        .collect();

    InfeasibilityDiagnostics {
        required_hours,
        available_budget_hours,
        site_margins,
        cohort_margins,
    }
}
