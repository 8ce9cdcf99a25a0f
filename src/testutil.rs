//! Shared fixtures for unit tests.

use crate::config::{
    Activity, Cohort, DayWindow, ObjectiveWeights, ScheduleConfig, Site,
};
use crate::models::calendar::{CalendarRules, Weekday, ALL_TIMESLOTS};
use crate::models::{ActivityId, Calendar, CohortId, SiteId, Trainer, TrainerAvailability, TrainerId};
use chrono::NaiveDate;

/// Regular 8-week calendar anchored to Monday 2026-01-05, no blackouts.
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

/// Cohort with full-timeslot windows on the given weekdays and no other
/// restrictions.
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

/// Trainer available everywhere on weekdays, morning and afternoon.
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

pub fn calendar_of(config: &ScheduleConfig) -> Calendar {
    Calendar::new(config.calendar.clone())
}
