//! End-to-end pipeline scenarios, solved with the exhaustive test solver.

mod common;

use common::ExhaustiveSolver;
use rota_rust::config::{Exclusion, PinnedMeeting, SequencingRule};
use rota_rust::extraction::MeetingRole;
use rota_rust::model::HardConstraint;
use rota_rust::models::calendar::{Calendar, Timeslot, Weekday};
use rota_rust::models::{MeetingId, TrainerAvailability};
use rota_rust::pipeline::PipelineOutcome;
use rota_rust::preprocessing::{compute_domains, ExhaustionCause};
use rota_rust::solver::SolveBudget;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::time::Duration;

fn budget() -> SolveBudget {
    SolveBudget::new(Duration::from_secs(30))
}

/// A tight trainer budget makes sharing the only feasible option: the
/// grouping activates and the pair's six meetings merge into three rows.
#[test]
fn tight_budget_forces_grouping() {
    let config = common::config(
        common::calendar_rules(1, 3),
        vec![common::site(1)],
        vec![common::activity(10, 3, 4)],
        vec![
            common::cohort(1, 1, &[10], &[Weekday::Monday]),
            common::cohort(2, 1, &[10], &[Weekday::Monday]),
        ],
        // 12 hours covers three shared deliveries, not six separate ones.
        vec![common::trainer(100, 12)],
    );

    let outcome = rota_rust::run(&config, &ExhaustiveSolver, &budget()).unwrap();
    let PipelineOutcome::Scheduled(result) = outcome else {
        panic!("expected a schedule, got {outcome:?}");
    };

    assert_eq!(result.active_groupings.len(), 1);
    assert_eq!(result.meetings.len(), 6);
    assert_eq!(result.rows.len(), 3);
    for row in &result.rows {
        assert_eq!(row.cohorts, vec![1.into(), 2.into()]);
    }
    assert_eq!(result.trainer_hours.get(&100.into()), Some(&12));

    // Both cohorts walk the same three weeks, strictly ordered.
    let weeks: Vec<u32> = (0..3)
        .map(|i| result.meetings[&MeetingId::new(1.into(), 10.into(), i)].week)
        .collect();
    assert_eq!(weeks, vec![1, 2, 3]);
}

/// A pin keeps its own meeting alive through a blanket exclusion; the
/// other meeting's domain empties and the pipeline stops before solving.
#[test]
fn blanket_exclusion_exhausts_unpinned_meeting() {
    let mut config = common::config(
        common::calendar_rules(1, 2),
        vec![common::site(1)],
        vec![common::activity(10, 2, 4)],
        vec![common::cohort(1, 1, &[10], &[Weekday::Monday])],
        vec![common::trainer(100, 40)],
    );
    config.cohorts[0].pinned = vec![PinnedMeeting {
        activity: 10.into(),
        meeting_index: 0,
        date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        start_time: None,
        end_time: None,
    }];
    config.cohorts[0].exclusions = vec![Exclusion {
        from: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        to: NaiveDate::from_ymd_opt(2026, 1, 17),
        timeslots: None,
        reason: "site closed".into(),
    }];

    let outcome = rota_rust::run(&config, &ExhaustiveSolver, &budget()).unwrap();
    let PipelineOutcome::DomainExhausted(exhausted) = outcome else {
        panic!("expected domain exhaustion, got {outcome:?}");
    };

    assert_eq!(exhausted.len(), 1);
    assert_eq!(
        exhausted[0].meeting,
        MeetingId::new(1.into(), 10.into(), 1)
    );
    assert!(matches!(exhausted[0].cause, ExhaustionCause::Exclusion { .. }));
}

/// A final activity must start after every other activity ends; the two
/// independents get no ordering between themselves.
#[test]
fn final_activity_runs_last() {
    let mut config = common::config(
        common::calendar_rules(1, 4),
        vec![common::site(1)],
        vec![
            common::activity(10, 1, 4),
            common::activity(11, 1, 4),
            common::activity(12, 1, 4),
        ],
        vec![common::cohort(1, 1, &[10, 11, 12], &[Weekday::Monday])],
        vec![common::trainer(100, 40)],
    );
    config.cohorts[0].sequencing = vec![SequencingRule::FinalActivity { activity: 12.into() }];

    let outcome = rota_rust::run(&config, &ExhaustiveSolver, &budget()).unwrap();
    let PipelineOutcome::Scheduled(result) = outcome else {
        panic!("expected a schedule, got {outcome:?}");
    };

    let week_of = |activity: u32| result.meetings[&MeetingId::new(1.into(), activity.into(), 0)].week;
    assert!(week_of(12) > week_of(10));
    assert!(week_of(12) > week_of(11));
}

/// The final-activity rule compiles to exactly one ordering constraint per
/// other activity; the independents stay unordered in the model.
#[test]
fn final_activity_rule_leaves_independents_unordered() {
    let mut config = common::config(
        common::calendar_rules(1, 4),
        vec![common::site(1)],
        vec![
            common::activity(10, 1, 4),
            common::activity(11, 1, 4),
            common::activity(12, 1, 4),
        ],
        vec![common::cohort(1, 1, &[10, 11, 12], &[Weekday::Monday])],
        vec![common::trainer(100, 40)],
    );
    config.cohorts[0].sequencing = vec![SequencingRule::FinalActivity { activity: 12.into() }];

    let calendar = Calendar::new(config.calendar.clone());
    let computation = compute_domains(&config, &calendar);
    let meetings = config.meetings();
    let assembled = rota_rust::model::assemble(
        &config,
        &calendar,
        &meetings,
        &computation.domains,
        &[],
        &[],
    )
    .unwrap();

    // Single-meeting activities produce no in-activity orderings, so
    // every week-to-week ordering comes from the sequencing rule.
    let orderings = assembled
        .model
        .constraints
        .iter()
        .filter(|c| matches!(c, HardConstraint::Linear { op: rota_rust::model::CmpOp::Ge, rhs: 1, .. }))
        .count();
    assert_eq!(orderings, 2);
}

/// A whitelisted trainer only ever delivers inside the whitelisted
/// (weekday, timeslot) cells.
#[test]
fn whitelisted_trainer_stays_in_their_slots() {
    let mut config = common::config(
        common::calendar_rules(1, 3),
        vec![common::site(1)],
        vec![common::activity(10, 2, 4)],
        vec![common::cohort(
            1,
            1,
            &[10],
            &[Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday],
        )],
        vec![common::trainer(100, 40)],
    );
    config.trainers[0].availability = TrainerAvailability::Whitelist {
        slots: vec![(Weekday::Tuesday, Timeslot::Morning1)],
    };

    let outcome = rota_rust::run(&config, &ExhaustiveSolver, &budget()).unwrap();
    let PipelineOutcome::Scheduled(result) = outcome else {
        panic!("expected a schedule, got {outcome:?}");
    };
    for m in result.meetings.values() {
        assert_eq!(m.trainer, 100.into());
        assert_eq!(m.weekday, Weekday::Tuesday);
        assert_eq!(m.timeslot, Timeslot::Morning1);
    }
}

/// When the only trainer's whitelist and the cohort's windows are
/// disjoint, assembly still succeeds and the solver proves infeasibility.
#[test]
fn disjoint_whitelist_is_infeasible_not_ignored() {
    let mut config = common::config(
        common::calendar_rules(1, 3),
        vec![common::site(1)],
        vec![common::activity(10, 1, 4)],
        vec![common::cohort(1, 1, &[10], &[Weekday::Monday])],
        vec![common::trainer(100, 40)],
    );
    config.trainers[0].availability = TrainerAvailability::Whitelist {
        slots: vec![(Weekday::Tuesday, Timeslot::Morning1)],
    };

    let outcome = rota_rust::run(&config, &ExhaustiveSolver, &budget()).unwrap();
    let PipelineOutcome::Infeasible(diagnostics) = outcome else {
        panic!("expected infeasibility, got {outcome:?}");
    };
    // Hours were never the problem here.
    assert!(diagnostics.required_hours <= diagnostics.available_budget_hours);
}

/// Infeasibility diagnostics break the hour balance down by site, so an
/// undersupplied site stands out even when the global totals look healthy.
#[test]
fn diagnostics_single_out_the_undersupplied_site() {
    let mut config = common::config(
        common::calendar_rules(1, 3),
        vec![common::site(1), common::site(2)],
        vec![common::activity(10, 1, 4)],
        vec![
            common::cohort(1, 1, &[10], &[Weekday::Monday]),
            common::cohort(2, 2, &[10], &[Weekday::Monday]),
        ],
        vec![common::trainer(100, 40), common::trainer(200, 2)],
    );
    config.trainers[0].sites = Some(vec![1.into()]);
    config.trainers[1].sites = Some(vec![2.into()]);

    let outcome = rota_rust::run(&config, &ExhaustiveSolver, &budget()).unwrap();
    let PipelineOutcome::Infeasible(diagnostics) = outcome else {
        panic!("expected infeasibility, got {outcome:?}");
    };
    // Globally there are hours to spare; only site 2 is short.
    assert!(diagnostics.required_hours <= diagnostics.available_budget_hours);
    let tight: Vec<_> = diagnostics
        .site_margins
        .iter()
        .filter(|m| m.is_tight())
        .collect();
    assert_eq!(tight.len(), 1);
    assert_eq!(tight[0].site, 2.into());
    assert_eq!(tight[0].required_hours, 4);
    assert_eq!(tight[0].available_budget_hours, 2);
}

/// Solves a small shared-site instance and re-checks the scheduling
/// invariants directly on the result.
#[test]
fn solved_schedule_upholds_invariants() {
    let config = common::config(
        common::calendar_rules(1, 2),
        vec![common::site(1)],
        vec![common::activity(10, 2, 2)],
        vec![
            common::cohort(1, 1, &[10], &[Weekday::Monday]),
            common::cohort(2, 1, &[10], &[Weekday::Monday]),
        ],
        vec![common::trainer(100, 8), common::trainer(101, 8)],
    );

    let outcome = rota_rust::run(&config, &ExhaustiveSolver, &budget()).unwrap();
    let PipelineOutcome::Scheduled(result) = outcome else {
        panic!("expected a schedule, got {outcome:?}");
    };

    // Weekly cap: no cohort repeats a week.
    for cohort in [1u32, 2] {
        let weeks: Vec<u32> = result
            .meetings
            .values()
            .filter(|m| m.meeting.cohort == cohort.into())
            .map(|m| m.week)
            .collect();
        let distinct: BTreeSet<u32> = weeks.iter().copied().collect();
        assert_eq!(weeks.len(), distinct.len());
    }

    // In-activity order is strictly increasing.
    for cohort in [1u32, 2] {
        let first = result.meetings[&MeetingId::new(cohort.into(), 10.into(), 0)].week;
        let second = result.meetings[&MeetingId::new(cohort.into(), 10.into(), 1)].week;
        assert!(second > first);
    }

    // Budgets hold over the extractor's tally.
    for trainer in &config.trainers {
        let used = result.trainer_hours.get(&trainer.id).copied().unwrap_or(0);
        assert!(used <= trainer.budget_hours);
    }

    // Active groupings are fully synchronized and exclusive.
    for grouping in &result.active_groupings {
        for index in 0..2 {
            let a = &result.meetings[&MeetingId::new(grouping.cohort_a, grouping.activity, index)];
            let b = &result.meetings[&MeetingId::new(grouping.cohort_b, grouping.activity, index)];
            assert_eq!((a.week, a.weekday, a.timeslot, a.trainer), (b.week, b.weekday, b.timeslot, b.trainer));
        }
    }

    // No trainer delivers two overlapping meetings (grouped secondaries
    // share the primary's delivery and are skipped).
    let deliveries: Vec<_> = result
        .meetings
        .values()
        .filter(|m| !matches!(m.role, MeetingRole::Secondary { .. }))
        .collect();
    for (i, a) in deliveries.iter().enumerate() {
        for b in deliveries.iter().skip(i + 1) {
            if a.trainer == b.trainer && a.week == b.week && a.weekday == b.weekday {
                assert!(!a.timeslot.overlaps(b.timeslot));
            }
        }
    }
}

/// Preprocessing is deterministic: identical input yields byte-identical
/// domains.
#[test]
fn domain_preprocessing_is_idempotent() {
    let config = common::config(
        common::calendar_rules(1, 6),
        vec![common::site(1)],
        vec![common::activity(10, 3, 4)],
        vec![common::cohort(1, 1, &[10], &[Weekday::Monday, Weekday::Thursday])],
        vec![common::trainer(100, 40)],
    );
    let calendar = Calendar::new(config.calendar.clone());

    let first = compute_domains(&config, &calendar);
    let second = compute_domains(&config, &calendar);

    assert_eq!(first.domains.len(), second.domains.len());
    for (id, domain) in &first.domains {
        assert_eq!(domain.fingerprint(), second.domains[id].fingerprint());
    }
}
