//! Domain preprocessor: reduced legal slot sets per meeting.
//!
//! For each cohort the base domain is the calendar's valid (week, weekday)
//! pairs intersected with the cohort's permitted weekday/timeslot windows,
//! minus explicit exclusions and externally occupied weeks. Each meeting
//! then takes the cohort domain, or collapses to its pinned date.
//!
//! An empty domain is reported as a [`DomainExhaustion`] carrying the rule
//! that emptied it - feasibility is a property of the input, so this is
//! data for upstream diagnosis, never a panic.

use crate::config::{Cohort, ScheduleConfig};
use crate::models::calendar::Calendar;
use crate::models::{CohortId, MeetingId, SlotDomain};
use chrono::{Duration, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a meeting's legal slot set became empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExhaustionCause {
    /// Calendar grid and cohort windows never intersect.
    EmptyBaseCalendar,
    /// The named exclusion removed the last remaining slot.
    Exclusion { rule: String },
    /// Externally occupied weeks consumed every remaining week.
    OccupiedWeeks,
    /// The pinned date does not land on a schedulable grid cell.
    PinnedOutsideCalendar { date: NaiveDate },
    /// The pinned time range admits no timeslot.
    PinnedTimeRangeEmpty { date: NaiveDate },
}

impl std::fmt::Display for ExhaustionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExhaustionCause::EmptyBaseCalendar => {
                write!(f, "cohort windows never intersect the calendar grid")
            }
            ExhaustionCause::Exclusion { rule } => {
                write!(f, "emptied by {rule}")
            }
            ExhaustionCause::OccupiedWeeks => {
                write!(f, "externally occupied weeks consumed every candidate week")
            }
            ExhaustionCause::PinnedOutsideCalendar { date } => {
                write!(f, "pinned date {date} is not a schedulable calendar cell")
            }
            ExhaustionCause::PinnedTimeRangeEmpty { date } => {
                write!(f, "pinned time range on {date} admits no timeslot")
            }
        }
    }
}

/// A required meeting whose domain came out empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainExhaustion {
    pub meeting: MeetingId,
    pub cause: ExhaustionCause,
}

/// Output of the domain preprocessor.
#[derive(Debug, Clone, Default)]
pub struct DomainComputation {
    /// Reduced base domain per cohort (before per-meeting pinning).
    pub cohort_domains: BTreeMap<CohortId, SlotDomain>,
    /// Final domain per meeting. Empty domains are also listed in
    /// `exhausted` with their cause.
    pub domains: BTreeMap<MeetingId, SlotDomain>,
    pub exhausted: Vec<DomainExhaustion>,
}

/// Computes the reduced slot domain for every required meeting.
///
/// Deterministic: identical input configuration yields byte-identical
/// domains (canonical ordering throughout).
pub fn compute_domains(config: &ScheduleConfig, calendar: &Calendar) -> DomainComputation {
    let mut out = DomainComputation::default();
    let mut base_causes: BTreeMap<CohortId, Option<ExhaustionCause>> = BTreeMap::new();

    for cohort in &config.cohorts {
        let (domain, cause) = cohort_domain(cohort, calendar);
        debug!(
            "cohort {}: {} candidate slots across {} weeks",
            cohort.id,
            domain.len(),
            domain.weeks().count()
        );
        if let Some(cause) = &cause {
            debug!("cohort {} base domain exhausted: {}", cohort.id, cause);
        }
        out.cohort_domains.insert(cohort.id, domain);
        base_causes.insert(cohort.id, cause);
    }

    for meeting in config.meetings() {
        let cohort = config
            .cohort(meeting.id.cohort)
            .expect("meetings are generated from known cohorts");
        let base = &out.cohort_domains[&cohort.id];

        let (domain, cause) = match cohort.pinned_for(meeting.id.activity, meeting.id.index) {
            Some(pin) => pinned_domain(pin.date, pin.timeslot_restriction(), calendar),
            None => (base.clone(), base_causes[&cohort.id].clone()),
        };

        if domain.is_empty() {
            out.exhausted.push(DomainExhaustion {
                meeting: meeting.id,
                cause: cause.unwrap_or(ExhaustionCause::EmptyBaseCalendar),
            });
        }
        out.domains.insert(meeting.id, domain);
    }

    info!(
        "domain preprocessing: {} meetings, {} exhausted",
        out.domains.len(),
        out.exhausted.len()
    );
    out
}

/// Builds one cohort's base domain and, when it ends up empty, the rule
/// that emptied it.
fn cohort_domain(cohort: &Cohort, calendar: &Calendar) -> (SlotDomain, Option<ExhaustionCause>) {
    let mut domain = SlotDomain::new();

    for week in calendar.weeks() {
        let valid_days = calendar.weekdays_for_week(week);
        for window in &cohort.windows {
            if !valid_days.contains(&window.weekday) {
                continue;
            }
            // Saturday sessions require a Saturday-capable site; the
            // trainer side of the rule stays in the model.
            if window.weekday == crate::models::Weekday::Saturday
                && !calendar.saturday_allowed_at(cohort.site)
            {
                continue;
            }
            for &slot in &window.timeslots {
                domain.insert(week, window.weekday, slot);
            }
        }
    }
    if domain.is_empty() {
        return (domain, Some(ExhaustionCause::EmptyBaseCalendar));
    }

    for exclusion in &cohort.exclusions {
        let mut removed_any = false;
        let mut date = exclusion.from;
        while date <= exclusion.end() {
            if let Some((week, weekday)) = calendar.locate_date(date) {
                removed_any |= match &exclusion.timeslots {
                    None => domain.remove_day(week, weekday),
                    Some(slots) => slots
                        .iter()
                        .map(|&slot| domain.remove_slot(week, weekday, slot))
                        .fold(false, |acc, removed| acc || removed),
                };
            }
            date += Duration::days(1);
        }
        if removed_any && domain.is_empty() {
            return (
                domain,
                Some(ExhaustionCause::Exclusion {
                    rule: exclusion.label(),
                }),
            );
        }
    }

    for &week in &cohort.occupied_weeks {
        domain.remove_week(week);
    }
    if domain.is_empty() {
        return (domain, Some(ExhaustionCause::OccupiedWeeks));
    }

    (domain, None)
}

/// Collapses a pinned meeting's domain to its exact calendar cell.
///
/// The pin is authoritative over cohort windows: any schedulable cell may
/// be pinned, optionally restricted to the timeslots inside the pinned
/// time range.
fn pinned_domain(
    date: NaiveDate,
    restriction: Option<Vec<crate::models::Timeslot>>,
    calendar: &Calendar,
) -> (SlotDomain, Option<ExhaustionCause>) {
    let mut domain = SlotDomain::new();

    let Some((week, weekday)) = calendar.locate_date(date) else {
        return (domain, Some(ExhaustionCause::PinnedOutsideCalendar { date }));
    };
    if !calendar.is_valid_week(week) || !calendar.weekdays_for_week(week).contains(&weekday) {
        return (domain, Some(ExhaustionCause::PinnedOutsideCalendar { date }));
    }

    match restriction {
        Some(slots) if slots.is_empty() => {
            return (domain, Some(ExhaustionCause::PinnedTimeRangeEmpty { date }));
        }
        Some(slots) => {
            for slot in slots {
                domain.insert(week, weekday, slot);
            }
        }
        None => {
            for slot in crate::models::calendar::ALL_TIMESLOTS {
                domain.insert(week, weekday, slot);
            }
        }
    }
    (domain, None)
}
