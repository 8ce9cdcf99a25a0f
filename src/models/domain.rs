//! Legal slot sets, stored compressed rather than as flat slot lists.
//!
//! A [`SlotDomain`] keeps three aligned levels: the weeks it touches, the
//! weekdays alive in each week, and the timeslots alive on each
//! (week, weekday). Intersection and emptiness run in time proportional to
//! the stored structure, not the full calendar grid, and iteration order is
//! canonical so repeated runs produce byte-identical results.

use super::calendar::{CalendarSlot, Timeslot, Weekday};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Compressed set of (week, weekday, timeslot) triples.
///
/// Invariant: the three levels stay consistent - a week is present iff it
/// has at least one weekday, and a (week, weekday) key iff it has at least
/// one timeslot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDomain {
    weeks: BTreeSet<u32>,
    days: BTreeMap<u32, BTreeSet<Weekday>>,
    slots: BTreeMap<(u32, Weekday), BTreeSet<Timeslot>>,
}

impl SlotDomain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, week: u32, weekday: Weekday, timeslot: Timeslot) {
        self.weeks.insert(week);
        self.days.entry(week).or_default().insert(weekday);
        self.slots.entry((week, weekday)).or_default().insert(timeslot);
    }

    pub fn contains(&self, week: u32, weekday: Weekday, timeslot: Timeslot) -> bool {
        self.slots
            .get(&(week, weekday))
            .map(|set| set.contains(&timeslot))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of (week, weekday, timeslot) triples.
    pub fn len(&self) -> usize {
        self.slots.values().map(|set| set.len()).sum()
    }

    pub fn weeks(&self) -> impl Iterator<Item = u32> + '_ {
        self.weeks.iter().copied()
    }

    pub fn weekdays(&self, week: u32) -> impl Iterator<Item = Weekday> + '_ {
        self.days.get(&week).into_iter().flatten().copied()
    }

    pub fn timeslots(&self, week: u32, weekday: Weekday) -> impl Iterator<Item = Timeslot> + '_ {
        self.slots.get(&(week, weekday)).into_iter().flatten().copied()
    }

    /// All (week, weekday) cells the domain touches, in canonical order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, Weekday)> + '_ {
        self.slots.keys().copied()
    }

    /// All triples in canonical (week, weekday, timeslot) order.
    pub fn iter(&self) -> impl Iterator<Item = CalendarSlot> + '_ {
        self.slots.iter().flat_map(|(&(week, weekday), slots)| {
            slots
                .iter()
                .map(move |&timeslot| CalendarSlot::new(week, weekday, timeslot))
        })
    }

    /// Removes a whole week. Returns true if anything was removed.
    pub fn remove_week(&mut self, week: u32) -> bool {
        if !self.weeks.remove(&week) {
            return false;
        }
        if let Some(days) = self.days.remove(&week) {
            for day in days {
                self.slots.remove(&(week, day));
            }
        }
        true
    }

    /// Removes a whole (week, weekday) cell. Returns true if anything was removed.
    pub fn remove_day(&mut self, week: u32, weekday: Weekday) -> bool {
        if self.slots.remove(&(week, weekday)).is_none() {
            return false;
        }
        if let Some(days) = self.days.get_mut(&week) {
            days.remove(&weekday);
            if days.is_empty() {
                self.days.remove(&week);
                self.weeks.remove(&week);
            }
        }
        true
    }

    /// Removes one timeslot from a cell, pruning emptied levels.
    pub fn remove_slot(&mut self, week: u32, weekday: Weekday, timeslot: Timeslot) -> bool {
        let Some(slots) = self.slots.get_mut(&(week, weekday)) else {
            return false;
        };
        if !slots.remove(&timeslot) {
            return false;
        }
        if slots.is_empty() {
            self.remove_day(week, weekday);
        }
        true
    }

    /// Keeps only the triples present in both domains.
    pub fn intersect(&self, other: &SlotDomain) -> SlotDomain {
        let mut out = SlotDomain::new();
        // Walk the smaller structure.
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        for slot in small.iter() {
            if large.contains(slot.week, slot.weekday, slot.timeslot) {
                out.insert(slot.week, slot.weekday, slot.timeslot);
            }
        }
        out
    }

    /// Restricts the domain to a single (week, weekday), optionally to a
    /// timeslot subset of that cell. Used for pinned meetings.
    pub fn collapse_to(&self, week: u32, weekday: Weekday, timeslots: Option<&[Timeslot]>) -> SlotDomain {
        let mut out = SlotDomain::new();
        for slot in self.timeslots(week, weekday) {
            let keep = match timeslots {
                Some(allowed) => allowed.contains(&slot),
                None => true,
            };
            if keep {
                out.insert(week, weekday, slot);
            }
        }
        out
    }

    /// SHA-256 over the canonical triple encoding. Two domains are
    /// byte-identical iff their fingerprints match.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for slot in self.iter() {
            hasher.update(slot.week.to_be_bytes());
            hasher.update([slot.weekday.index(), slot.timeslot.index()]);
        }
        hex::encode(hasher.finalize())
    }
}
