//! Grouping compatibility engine.
//!
//! Decides which cohort pairs could share meetings of a common activity.
//! Only same-site pairs with at least one shared activity are examined, and
//! empty domain intersections are discarded before any model variable
//! exists - the main lever that keeps the downstream model small.

use super::domains::DomainComputation;
use crate::config::ScheduleConfig;
use crate::models::GroupingCandidate;
use log::info;

/// Computes every viable grouping candidate, in deterministic
/// (cohort_a, cohort_b, activity) order. The smaller cohort id is always
/// the primary (`cohort_a`) side.
pub fn compute_grouping_candidates(
    config: &ScheduleConfig,
    computation: &DomainComputation,
) -> Vec<GroupingCandidate> {
    let mut candidates = Vec::new();

    for (i, a) in config.cohorts.iter().enumerate() {
        for b in config.cohorts.iter().skip(i + 1) {
            if a.site != b.site {
                continue;
            }
            let (primary, secondary) = if a.id <= b.id { (a, b) } else { (b, a) };

            for &activity in &primary.activities {
                if !secondary.performs(activity) {
                    continue;
                }
                let domain_a = &computation.cohort_domains[&primary.id];
                let domain_b = &computation.cohort_domains[&secondary.id];
                if domain_a.is_empty() || domain_b.is_empty() {
                    continue;
                }
                let intersection = domain_a.intersect(domain_b);
                if intersection.is_empty() {
                    continue;
                }
                let denom = domain_a.len().min(domain_b.len());
                candidates.push(GroupingCandidate {
                    cohort_a: primary.id,
                    cohort_b: secondary.id,
                    activity,
                    compatibility_score: intersection.len() as f64 / denom as f64,
                    intersection_size: intersection.len(),
                });
            }
        }
    }

    candidates.sort_by(|x, y| {
        (x.cohort_a, x.cohort_b, x.activity).cmp(&(y.cohort_a, y.cohort_b, y.activity))
    });
    info!("grouping compatibility: {} candidates", candidates.len());
    candidates
}
