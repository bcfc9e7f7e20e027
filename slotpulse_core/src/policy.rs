//! The user's declarative reservation preferences, loaded once per run and
//! never mutated afterwards.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::slots::weekday_key;

fn default_non_peak() -> BTreeSet<u8> {
    [1, 3, 4].into_iter().collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    /// Select at most one slot per calendar date per cycle.
    #[serde(default)]
    pub one_slot_per_day: bool,
    /// Dates never to book, unless an included-date entry overrides.
    #[serde(default)]
    pub excluded_dates: HashSet<NaiveDate>,
    /// Sessions charged at the lower rate; also the only sessions eligible
    /// as upgrades over an existing booking.
    #[serde(default = "default_non_peak")]
    pub non_peak_sessions: BTreeSet<u8>,
    /// Allowed sessions per weekday, keyed by three-letter day name.
    #[serde(default)]
    pub allowed_sessions: HashMap<String, BTreeSet<u8>>,
    /// Dates pinned to an explicit session set, bypassing exclusions and
    /// the weekday allowance.
    #[serde(default)]
    pub included_dates: HashMap<NaiveDate, BTreeSet<u8>>,
    /// Confirm reservations immediately instead of waiting for the operator.
    #[serde(default)]
    pub auto_book: bool,
    /// Report matches without reserving anything, then stop.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            one_slot_per_day: false,
            excluded_dates: HashSet::new(),
            non_peak_sessions: default_non_peak(),
            allowed_sessions: HashMap::new(),
            included_dates: HashMap::new(),
            auto_book: false,
            dry_run: false,
        }
    }
}

impl Policy {
    /// Normalizes weekday keys to the form the filter engine compares
    /// against, so config files may spell out full day names.
    pub fn normalized(mut self) -> Self {
        self.allowed_sessions = self
            .allowed_sessions
            .into_iter()
            .map(|(day, sessions)| (weekday_key(&day), sessions))
            .collect();
        self
    }
}
