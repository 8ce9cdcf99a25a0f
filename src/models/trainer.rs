//! Trainers: availability rules and hour budgets.

use super::calendar::{Timeslot, Weekday};
use super::{ActivityId, SiteId, TrainerId};
use serde::{Deserialize, Serialize};

/// How a trainer's permitted slots are expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainerAvailability {
    /// Explicit whitelist of permitted (weekday, timeslot) pairs.
    Whitelist { slots: Vec<(Weekday, Timeslot)> },
    /// Weekday sets per half-day: mornings cover both morning slots,
    /// afternoons the afternoon slot.
    WeekdaySets {
        #[serde(default)]
        morning: Vec<Weekday>,
        #[serde(default)]
        afternoon: Vec<Weekday>,
    },
}

impl TrainerAvailability {
    /// True if the trainer may deliver at (weekday, timeslot).
    pub fn permits(&self, weekday: Weekday, timeslot: Timeslot) -> bool {
        match self {
            TrainerAvailability::Whitelist { slots } => slots.contains(&(weekday, timeslot)),
            TrainerAvailability::WeekdaySets { morning, afternoon } => match timeslot {
                Timeslot::Morning1 | Timeslot::Morning2 => morning.contains(&weekday),
                Timeslot::Afternoon => afternoon.contains(&weekday),
            },
        }
    }
}

/// A staff member who can deliver meetings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trainer {
    pub id: TrainerId,
    pub name: String,
    pub availability: TrainerAvailability,
    /// Hour budget for the whole scheduling period.
    pub budget_hours: u32,
    /// Whether the trainer may deliver Saturday sessions at all.
    #[serde(default)]
    pub saturday_eligible: bool,
    /// Sites the trainer covers; `None` means every site.
    #[serde(default)]
    pub sites: Option<Vec<SiteId>>,
    /// Activities the trainer is qualified for; `None` means every activity.
    #[serde(default)]
    pub activities: Option<Vec<ActivityId>>,
}

impl Trainer {
    pub fn covers_site(&self, site: SiteId) -> bool {
        self.sites.as_ref().map(|s| s.contains(&site)).unwrap_or(true)
    }

    pub fn qualified_for(&self, activity: ActivityId) -> bool {
        self.activities
            .as_ref()
            .map(|a| a.contains(&activity))
            .unwrap_or(true)
    }
}
