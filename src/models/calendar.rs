//! Discrete calendar grid for the scheduling period.
//!
//! The grid is week x weekday x timeslot. Weeks are numbered within the
//! scheduling period and anchored to a real Monday so pinned dates and
//! exclusion ranges can be located on the grid. Boundary weeks may admit
//! only a subset of weekdays and blackout weeks are removed entirely.

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Schedulable weekdays. Sunday is never schedulable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

pub const ALL_WEEKDAYS: [Weekday; 6] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

impl Weekday {
    /// Zero-based index, Monday = 0 .. Saturday = 5.
    pub fn index(self) -> u8 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Weekday> {
        ALL_WEEKDAYS.get(index as usize).copied()
    }

    /// Maps a chrono weekday onto the grid. Sunday has no grid position.
    pub fn from_chrono(day: chrono::Weekday) -> Option<Weekday> {
        match day {
            chrono::Weekday::Mon => Some(Weekday::Monday),
            chrono::Weekday::Tue => Some(Weekday::Tuesday),
            chrono::Weekday::Wed => Some(Weekday::Wednesday),
            chrono::Weekday::Thu => Some(Weekday::Thursday),
            chrono::Weekday::Fri => Some(Weekday::Friday),
            chrono::Weekday::Sat => Some(Weekday::Saturday),
            chrono::Weekday::Sun => None,
        }
    }
}

/// Daily timeslots with fixed wall-clock bounds (minutes from midnight).
///
/// The two morning slots overlap in wall-clock time; the afternoon slot is
/// disjoint from both. Overlap drives trainer conflict detection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeslot {
    Morning1,
    Morning2,
    Afternoon,
}

pub const ALL_TIMESLOTS: [Timeslot; 3] = [Timeslot::Morning1, Timeslot::Morning2, Timeslot::Afternoon];

impl Timeslot {
    pub fn index(self) -> u8 {
        match self {
            Timeslot::Morning1 => 0,
            Timeslot::Morning2 => 1,
            Timeslot::Afternoon => 2,
        }
    }

    pub fn from_index(index: u8) -> Option<Timeslot> {
        ALL_TIMESLOTS.get(index as usize).copied()
    }

    /// Wall-clock bounds as minutes from midnight: (start, end).
    pub fn wall_clock(self) -> (u16, u16) {
        match self {
            Timeslot::Morning1 => (9 * 60, 11 * 60),
            Timeslot::Morning2 => (10 * 60 + 30, 12 * 60 + 30),
            Timeslot::Afternoon => (14 * 60, 16 * 60),
        }
    }

    /// True if the two slots overlap in wall-clock time. A slot always
    /// overlaps itself.
    pub fn overlaps(self, other: Timeslot) -> bool {
        TIMESLOT_OVERLAP[self.index() as usize][other.index() as usize]
    }

    /// Timeslots whose wall-clock interval lies entirely inside
    /// `[start_min, end_min)`. Used to turn a pinned time range into a
    /// timeslot restriction.
    pub fn within_range(start_min: u16, end_min: u16) -> Vec<Timeslot> {
        ALL_TIMESLOTS
            .iter()
            .copied()
            .filter(|slot| {
                let (s, e) = slot.wall_clock();
                s >= start_min && e <= end_min
            })
            .collect()
    }
}

/// Pairwise wall-clock overlap table, derived from the slot bounds.
static TIMESLOT_OVERLAP: Lazy<[[bool; 3]; 3]> = Lazy::new(|| {
    let mut table = [[false; 3]; 3];
    for a in ALL_TIMESLOTS {
        for b in ALL_TIMESLOTS {
            let (sa, ea) = a.wall_clock();
            let (sb, eb) = b.wall_clock();
            table[a.index() as usize][b.index() as usize] = sa < eb && sb < ea;
        }
    }
    table
});

/// One calendar cell: a (week, weekday, timeslot) triple.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarSlot {
    pub week: u32,
    pub weekday: Weekday,
    pub timeslot: Timeslot,
}

impl CalendarSlot {
    pub fn new(week: u32, weekday: Weekday, timeslot: Timeslot) -> Self {
        Self { week, weekday, timeslot }
    }

    /// Total order over the grid, used for interval comparisons in the model.
    pub fn code(&self) -> i64 {
        slot_code(self.week, self.weekday, self.timeslot)
    }
}

/// Derived total order: `(week * 6 + weekday) * 3 + timeslot`.
pub fn slot_code(week: u32, weekday: Weekday, timeslot: Timeslot) -> i64 {
    (week as i64 * 6 + weekday.index() as i64) * 3 + timeslot.index() as i64
}

/// Weekday restriction for an irregular week (term boundary or similar).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekOverride {
    pub week: u32,
    pub weekdays: Vec<Weekday>,
}

/// Declarative calendar rules, loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRules {
    /// First schedulable week number (inclusive).
    pub first_week: u32,
    /// Last schedulable week number (inclusive).
    pub last_week: u32,
    /// Monday date of `first_week`; anchors week numbers to real dates.
    pub first_monday: NaiveDate,
    /// Weeks removed from the grid entirely (mid-term breaks).
    #[serde(default)]
    pub blackout_weeks: Vec<u32>,
    /// Per-week weekday restrictions for irregular boundary weeks.
    #[serde(default)]
    pub week_overrides: Vec<WeekOverride>,
    /// Sites where Saturday sessions are permitted at all.
    #[serde(default)]
    pub saturday_sites: Vec<super::SiteId>,
}

/// Resolved calendar: validity predicates plus date conversion.
#[derive(Debug, Clone)]
pub struct Calendar {
    rules: CalendarRules,
    weeks: BTreeSet<u32>,
    overrides: BTreeMap<u32, BTreeSet<Weekday>>,
}

impl Calendar {
    pub fn new(rules: CalendarRules) -> Self {
        let weeks = (rules.first_week..=rules.last_week)
            .filter(|w| !rules.blackout_weeks.contains(w))
            .collect();
        let overrides = rules
            .week_overrides
            .iter()
            .map(|o| (o.week, o.weekdays.iter().copied().collect()))
            .collect();
        Self { rules, weeks, overrides }
    }

    pub fn rules(&self) -> &CalendarRules {
        &self.rules
    }

    /// Schedulable weeks in ascending order.
    pub fn weeks(&self) -> impl Iterator<Item = u32> + '_ {
        self.weeks.iter().copied()
    }

    pub fn is_valid_week(&self, week: u32) -> bool {
        self.weeks.contains(&week)
    }

    /// Admissible weekdays for a week: the override set for irregular
    /// weeks, the full Monday-Saturday range otherwise.
    pub fn weekdays_for_week(&self, week: u32) -> Vec<Weekday> {
        match self.overrides.get(&week) {
            Some(days) => days.iter().copied().collect(),
            None => ALL_WEEKDAYS.to_vec(),
        }
    }

    pub fn saturday_allowed_at(&self, site: super::SiteId) -> bool {
        self.rules.saturday_sites.contains(&site)
    }

    /// Concrete date of a (week, weekday) cell.
    pub fn date_of(&self, week: u32, weekday: Weekday) -> NaiveDate {
        let days = (week as i64 - self.rules.first_week as i64) * 7 + weekday.index() as i64;
        self.rules.first_monday + Duration::days(days)
    }

    /// Locates a date on the grid. `None` for Sundays and dates outside the
    /// scheduling period; blackout weeks still locate (exclusions may
    /// legitimately reference them).
    pub fn locate_date(&self, date: NaiveDate) -> Option<(u32, Weekday)> {
        let weekday = Weekday::from_chrono(date.weekday())?;
        let offset = (date - self.rules.first_monday).num_days();
        if offset < 0 {
            return None;
        }
        let week = self.rules.first_week + (offset / 7) as u32;
        if week > self.rules.last_week {
            return None;
        }
        Some((week, weekday))
    }
}
