#[cfg(test)]
mod tests {
    use crate::model::{assemble, HardConstraint};
    use crate::models::{MeetingId, SlotDomain};
    use crate::preprocessing::{
        always_secondary_meetings, compute_conflict_pairs, compute_domains,
        compute_grouping_candidates,
    };
    use crate::testutil;
    use crate::models::calendar::Weekday;

    fn assembled(
        config: &crate::config::ScheduleConfig,
    ) -> crate::model::AssembledModel {
        let calendar = testutil::calendar_of(config);
        let computation = compute_domains(config, &calendar);
        assert!(computation.exhausted.is_empty());
        let meetings = config.meetings();
        let candidates = compute_grouping_candidates(config, &computation);
        let excluded = always_secondary_meetings(&meetings, &candidates);
        let pairs = compute_conflict_pairs(&meetings, &computation.domains, &excluded);
        assemble(
            config,
            &calendar,
            &meetings,
            &computation.domains,
            &candidates,
            &pairs,
        )
        .unwrap()
    }

    #[test]
    fn bundles_five_variables_per_meeting() {
        let config = testutil::config(
            testutil::calendar_rules(1, 4),
            vec![testutil::site(1)],
            vec![testutil::activity(10, 2, 4)],
            vec![testutil::cohort(1, 1, &[10], &[Weekday::Monday, Weekday::Tuesday])],
            vec![testutil::trainer(100, 40)],
        );
        let assembled = assembled(&config);

        assert_eq!(assembled.meeting_vars.len(), 2);
        let vars = &assembled.meeting_vars[&MeetingId::new(1.into(), 10.into(), 0)];
        let model = &assembled.model;
        assert_eq!(model.var(vars.week).domain, vec![1, 2, 3, 4]);
        assert_eq!(model.var(vars.weekday).domain, vec![0, 1]);
        assert_eq!(model.var(vars.timeslot).domain, vec![0, 1, 2]);
        assert_eq!(model.var(vars.trainer).domain, vec![100]);
        // slot codes span 18w + 3d + s over the domain.
        assert_eq!(model.var(vars.slot_code).domain.len(), 4 * 2 * 3);
    }

    #[test]
    fn meetings_of_one_activity_are_week_ordered() {
        let config = testutil::config(
            testutil::calendar_rules(1, 4),
            vec![testutil::site(1)],
            vec![testutil::activity(10, 3, 4)],
            vec![testutil::cohort(1, 1, &[10], &[Weekday::Monday])],
            vec![testutil::trainer(100, 40)],
        );
        let assembled = assembled(&config);
        let order = assembled
            .model
            .constraints
            .iter()
            .filter(|c| matches!(c, HardConstraint::Linear { rhs: 1, .. }))
            .count();
        // Two consecutive-index orderings for three meetings.
        assert_eq!(order, 2);
        // One weekly cap over the cohort's three meetings.
        assert!(assembled
            .model
            .constraints
            .iter()
            .any(|c| matches!(c, HardConstraint::AllDifferent { vars } if vars.len() == 3)));
    }

    #[test]
    fn grouping_candidate_gets_boolean_and_sync() {
        let config = testutil::config(
            testutil::calendar_rules(1, 4),
            vec![testutil::site(1)],
            vec![testutil::activity(10, 2, 4)],
            vec![
                testutil::cohort(1, 1, &[10], &[Weekday::Monday]),
                testutil::cohort(2, 1, &[10], &[Weekday::Monday]),
            ],
            vec![testutil::trainer(100, 40)],
        );
        let assembled = assembled(&config);
        assert_eq!(assembled.grouping_vars.len(), 1);
        let (candidate, lit) = &assembled.grouping_vars[0];
        assert_eq!(candidate.cohort_a, 1.into());
        assert_eq!(candidate.cohort_b, 2.into());
        assert_eq!(assembled.model.var(*lit).domain, vec![0, 1]);
        // 2 meetings x 4 synchronized variables.
        let syncs = assembled
            .model
            .constraints
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    HardConstraint::If { then, .. }
                        if matches!(**then, HardConstraint::Equal { .. })
                )
            })
            .count();
        assert_eq!(syncs, 8);
    }

    #[test]
    fn one_partner_per_activity() {
        let config = testutil::config(
            testutil::calendar_rules(1, 6),
            vec![testutil::site(1)],
            vec![testutil::activity(10, 1, 4)],
            vec![
                testutil::cohort(1, 1, &[10], &[Weekday::Monday]),
                testutil::cohort(2, 1, &[10], &[Weekday::Monday]),
                testutil::cohort(3, 1, &[10], &[Weekday::Monday]),
            ],
            vec![testutil::trainer(100, 40)],
        );
        let assembled = assembled(&config);
        // Pairs (1,2), (1,3), (2,3).
        assert_eq!(assembled.grouping_vars.len(), 3);
        let at_most_one = assembled
            .model
            .constraints
            .iter()
            .filter(|c| matches!(c, HardConstraint::AtMostOne { .. }))
            .count();
        // Every cohort is party to exactly two candidates.
        assert_eq!(at_most_one, 3);
    }

    #[test]
    fn trainer_budget_sums_meeting_hours() {
        let config = testutil::config(
            testutil::calendar_rules(1, 4),
            vec![testutil::site(1)],
            vec![testutil::activity(10, 2, 4)],
            vec![testutil::cohort(1, 1, &[10], &[Weekday::Monday])],
            vec![testutil::trainer(100, 40)],
        );
        let assembled = assembled(&config);
        let budget = assembled
            .model
            .constraints
            .iter()
            .find_map(|c| match c {
                HardConstraint::Linear {
                    terms,
                    op: crate::model::CmpOp::Le,
                    rhs,
                } => Some((terms.clone(), *rhs)),
                _ => None,
            })
            .expect("budget constraint");
        assert_eq!(budget.1, 40);
        assert_eq!(budget.0.len(), 2);
        assert!(budget.0.iter().all(|&(coeff, _)| coeff == 4));
    }

    #[test]
    fn empty_meeting_domain_is_an_assembly_error() {
        let config = testutil::config(
            testutil::calendar_rules(1, 4),
            vec![testutil::site(1)],
            vec![testutil::activity(10, 1, 4)],
            vec![testutil::cohort(1, 1, &[10], &[Weekday::Monday])],
            vec![testutil::trainer(100, 40)],
        );
        let calendar = testutil::calendar_of(&config);
        let meetings = config.meetings();
        let mut domains = std::collections::BTreeMap::new();
        domains.insert(meetings[0].id, SlotDomain::new());
        let err = assemble(&config, &calendar, &meetings, &domains, &[], &[]).unwrap_err();
        assert!(matches!(err, crate::SchedulerError::Assembly(_)));
    }

    #[test]
    fn saturday_meetings_require_eligible_trainer() {
        let mut rules = testutil::calendar_rules(1, 2);
        rules.saturday_sites = vec![1.into()];
        let mut saturday_trainer = testutil::trainer(100, 40);
        saturday_trainer.saturday_eligible = true;
        let config = testutil::config(
            rules,
            vec![testutil::site(1)],
            vec![testutil::activity(10, 1, 4)],
            vec![testutil::cohort(1, 1, &[10], &[Weekday::Friday, Weekday::Saturday])],
            vec![saturday_trainer, testutil::trainer(101, 40)],
        );
        let assembled = assembled(&config);
        let guard = assembled
            .model
            .constraints
            .iter()
            .find_map(|c| match c {
                HardConstraint::If { then, .. } => match &**then {
                    HardConstraint::InSet { values, .. } => Some(values.clone()),
                    _ => None,
                },
                _ => None,
            })
            .expect("saturday implication");
        assert_eq!(guard, vec![100]);
    }

    #[test]
    fn objective_terms_follow_nonzero_weights() {
        let mut config = testutil::config(
            testutil::calendar_rules(1, 6),
            vec![testutil::site(1)],
            vec![testutil::activity(10, 1, 4), testutil::activity(11, 1, 4)],
            vec![testutil::cohort(1, 1, &[10, 11], &[Weekday::Monday, Weekday::Tuesday])],
            vec![testutil::trainer(100, 40)],
        );
        config.cohorts[0].priority = true;
        let with_terms = assembled(&config);
        // Continuity bonus for the activity pair plus the makespan penalty.
        assert_eq!(with_terms.model.objective.len(), 2);
        assert!(with_terms.model.objective.iter().any(|&(w, _)| w < 0));

        config.objective.trainer_continuity = 0;
        config.objective.priority_early_finish = 0;
        let without = assembled(&config);
        assert!(without.model.objective.is_empty());
    }
}
