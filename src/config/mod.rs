//! Declarative scheduling configuration.
//!
//! Everything the pipeline needs - sites, activities, cohorts with their
//! temporal rules, trainers, calendar rules, objective weights - is loaded
//! once into an immutable [`ScheduleConfig`] and passed explicitly to every
//! stage. Loaded from TOML files or strings.

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::calendar::{CalendarRules, Timeslot, Weekday, ALL_TIMESLOTS};
use crate::models::{ActivityId, CohortId, Meeting, MeetingId, SiteId, Trainer, TrainerId};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// A training location. Cohort pairs can only be grouped within one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
}

/// A recurring instructional module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    /// Required meeting count per cohort performing this activity.
    pub meetings: u32,
    /// Delivery hours per meeting, charged against trainer budgets.
    pub hours_per_meeting: u32,
}

/// Permitted timeslots on one weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayWindow {
    pub weekday: Weekday,
    #[serde(default = "all_timeslots")]
    pub timeslots: Vec<Timeslot>,
}

fn all_timeslots() -> Vec<Timeslot> {
    ALL_TIMESLOTS.to_vec()
}

/// A per-date or per-range exclusion. Removes whole days unless a timeslot
/// subset is given, in which case only those timeslots are removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub from: NaiveDate,
    /// Inclusive range end; a single day when absent.
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub timeslots: Option<Vec<Timeslot>>,
    #[serde(default)]
    pub reason: String,
}

impl Exclusion {
    pub fn end(&self) -> NaiveDate {
        self.to.unwrap_or(self.from)
    }

    pub fn label(&self) -> String {
        if self.reason.is_empty() {
            match self.to {
                Some(to) => format!("exclusion {}..{}", self.from, to),
                None => format!("exclusion {}", self.from),
            }
        } else {
            self.reason.clone()
        }
    }
}

/// Pins one meeting to an exact date, optionally restricted to the
/// timeslots fully contained in a wall-clock time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinnedMeeting {
    pub activity: ActivityId,
    pub meeting_index: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
}

impl PinnedMeeting {
    /// Timeslot restriction derived from the pinned time range, if any.
    pub fn timeslot_restriction(&self) -> Option<Vec<Timeslot>> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                let start_min = (start.hour() * 60 + start.minute()) as u16;
                let end_min = (end.hour() * 60 + end.minute()) as u16;
                Some(Timeslot::within_range(start_min, end_min))
            }
            _ => None,
        }
    }
}

/// Ordering rules between a cohort's activities.
///
/// Rules naming activities the cohort never performs are silent no-ops so
/// heterogeneous per-cohort configuration stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SequencingRule {
    /// The activity must start after every other activity of the cohort ends.
    FinalActivity { activity: ActivityId },
    /// `prerequisite` must end before `dependent` starts.
    Before {
        prerequisite: ActivityId,
        dependent: ActivityId,
    },
    /// Minimum week gap between two meetings of one activity.
    MinWeekGap {
        activity: ActivityId,
        from_index: u32,
        to_index: u32,
        min_weeks: u32,
    },
}

/// A student group scheduled as an indivisible unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohort {
    pub id: CohortId,
    pub name: String,
    pub site: SiteId,
    /// Permitted weekday/timeslot combinations.
    pub windows: Vec<DayWindow>,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
    #[serde(default)]
    pub pinned: Vec<PinnedMeeting>,
    /// Weeks already consumed by externally-scheduled activities.
    #[serde(default)]
    pub occupied_weeks: Vec<u32>,
    /// Activities this cohort performs.
    pub activities: Vec<ActivityId>,
    /// Stated grouping preference, rewarded by the objective.
    #[serde(default)]
    pub preferred_partner: Option<CohortId>,
    /// Flagged cohorts get an early-completion penalty term.
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub sequencing: Vec<SequencingRule>,
    /// Preferred relative finishing order of activities, earliest first.
    #[serde(default)]
    pub ideal_order: Vec<ActivityId>,
}

impl Cohort {
    pub fn performs(&self, activity: ActivityId) -> bool {
        self.activities.contains(&activity)
    }

    pub fn pinned_for(&self, activity: ActivityId, index: u32) -> Option<&PinnedMeeting> {
        self.pinned
            .iter()
            .find(|p| p.activity == activity && p.meeting_index == index)
    }
}

/// Objective term weights. A weight of zero disables the term entirely
/// (its auxiliary variables are not created).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    #[serde(default = "default_continuity")]
    pub trainer_continuity: i64,
    #[serde(default = "default_partner")]
    pub preferred_partner: i64,
    #[serde(default = "default_early_finish")]
    pub priority_early_finish: i64,
    #[serde(default = "default_ordering")]
    pub ideal_ordering: i64,
}

fn default_continuity() -> i64 {
    3
}

fn default_partner() -> i64 {
    5
}

fn default_early_finish() -> i64 {
    2
}

fn default_ordering() -> i64 {
    1
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            trainer_continuity: default_continuity(),
            preferred_partner: default_partner(),
            priority_early_finish: default_early_finish(),
            ideal_ordering: default_ordering(),
        }
    }
}

/// The immutable configuration object handed to every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub calendar: CalendarRules,
    pub sites: Vec<Site>,
    pub activities: Vec<Activity>,
    pub cohorts: Vec<Cohort>,
    pub trainers: Vec<Trainer>,
    #[serde(default)]
    pub objective: ObjectiveWeights,
}

impl ScheduleConfig {
    /// Load from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// Load from a TOML string and validate referential integrity.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: ScheduleConfig =
            toml::from_str(raw).context("Failed to deserialize scheduling config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation: unique ids and valid cross-references.
    /// Sequencing rules referencing unperformed activities are not checked
    /// here - they are tolerated downstream as no-ops.
    pub fn validate(&self) -> SchedulerResult<()> {
        let err = |msg: String| Err(SchedulerError::Configuration(msg));

        let site_ids: BTreeSet<SiteId> = self.sites.iter().map(|s| s.id).collect();
        if site_ids.len() != self.sites.len() {
            return err("duplicate site ids".into());
        }
        let activity_ids: BTreeSet<ActivityId> = self.activities.iter().map(|a| a.id).collect();
        if activity_ids.len() != self.activities.len() {
            return err("duplicate activity ids".into());
        }
        let cohort_ids: BTreeSet<CohortId> = self.cohorts.iter().map(|c| c.id).collect();
        if cohort_ids.len() != self.cohorts.len() {
            return err("duplicate cohort ids".into());
        }
        let trainer_ids: BTreeSet<TrainerId> = self.trainers.iter().map(|t| t.id).collect();
        if trainer_ids.len() != self.trainers.len() {
            return err("duplicate trainer ids".into());
        }

        if self.calendar.first_week > self.calendar.last_week {
            return err(format!(
                "calendar first_week {} is after last_week {}",
                self.calendar.first_week, self.calendar.last_week
            ));
        }

        for cohort in &self.cohorts {
            if !site_ids.contains(&cohort.site) {
                return err(format!("cohort {} references unknown site {}", cohort.id, cohort.site));
            }
            let performed: BTreeSet<ActivityId> = cohort.activities.iter().copied().collect();
            if performed.len() != cohort.activities.len() {
                return err(format!("cohort {} lists an activity more than once", cohort.id));
            }
            for activity in &cohort.activities {
                if !activity_ids.contains(activity) {
                    return err(format!(
                        "cohort {} references unknown activity {}",
                        cohort.id, activity
                    ));
                }
            }
            if let Some(partner) = cohort.preferred_partner {
                if !cohort_ids.contains(&partner) {
                    return err(format!(
                        "cohort {} prefers unknown partner cohort {}",
                        cohort.id, partner
                    ));
                }
            }
            for pin in &cohort.pinned {
                if !cohort.performs(pin.activity) {
                    return err(format!(
                        "cohort {} pins a meeting of activity {} it does not perform",
                        cohort.id, pin.activity
                    ));
                }
                let required = self
                    .activity(pin.activity)
                    .map(|a| a.meetings)
                    .unwrap_or(0);
                if pin.meeting_index >= required {
                    return err(format!(
                        "cohort {} pins meeting index {} of activity {} which has {} meetings",
                        cohort.id, pin.meeting_index, pin.activity, required
                    ));
                }
            }
        }

        for trainer in &self.trainers {
            if let Some(sites) = &trainer.sites {
                for site in sites {
                    if !site_ids.contains(site) {
                        return err(format!(
                            "trainer {} references unknown site {}",
                            trainer.id, site
                        ));
                    }
                }
            }
            if let Some(activities) = &trainer.activities {
                for activity in activities {
                    if !activity_ids.contains(activity) {
                        return err(format!(
                            "trainer {} references unknown activity {}",
                            trainer.id, activity
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn activity(&self, id: ActivityId) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn cohort(&self, id: CohortId) -> Option<&Cohort> {
        self.cohorts.iter().find(|c| c.id == id)
    }

    pub fn trainer(&self, id: TrainerId) -> Option<&Trainer> {
        self.trainers.iter().find(|t| t.id == id)
    }

    /// Hours per meeting of an activity; zero for unknown ids.
    pub fn activity_hours(&self, id: ActivityId) -> u32 {
        self.activity(id).map(|a| a.hours_per_meeting).unwrap_or(0)
    }

    /// Generates the full meeting list, 1:1 with activity requirements,
    /// in deterministic (cohort, activity, index) order.
    pub fn meetings(&self) -> Vec<Meeting> {
        let mut out = Vec::new();
        for cohort in &self.cohorts {
            for &activity_id in &cohort.activities {
                let Some(activity) = self.activity(activity_id) else {
                    continue;
                };
                for index in 0..activity.meetings {
                    out.push(Meeting {
                        id: MeetingId::new(cohort.id, activity_id, index),
                        hours: activity.hours_per_meeting,
                        pinned: cohort.pinned_for(activity_id, index).is_some(),
                    });
                }
            }
        }
        out
    }
}
