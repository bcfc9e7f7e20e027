//! Data model shared between the portal boundary and the decision engine.

use chrono::NaiveDate;

/// Fixed daily time windows the portal offers.
pub const SESSIONS_PER_DAY: u8 = 7;

/// Date format used by the portal in both the slot grid and the bookings
/// table, e.g. `01/Jan/2025`.
pub const DATE_FORMAT: &str = "%d/%b/%Y";

/// One available reservation unit as scraped from the slot grid.
///
/// `date` and `weekday` are kept in their scraped form; the filter engine
/// parses them and drops the slot if they do not parse. Identity key is
/// (date, session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub date: String,
    pub weekday: String,
    pub session: u8,
    /// Opaque reservation token, handed back to the portal verbatim.
    pub handle: String,
}

impl Slot {
    pub fn describe(&self) -> String {
        format!("{}, Session {}, Day: {}", self.date, self.session, self.weekday)
    }
}

/// A confirmed reservation already held by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Booking {
    pub date: NaiveDate,
    pub session: u8,
}

/// What one poll-filter-act iteration produced.
#[derive(Debug, Default)]
pub struct CycleResult {
    pub slots_found: bool,
    pub filtered: Vec<Slot>,
    pub booked: Vec<Slot>,
}

pub fn parse_slot_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Folds a scraped day name to the three-letter key the policy uses,
/// e.g. `Wednesday` -> `WED`.
pub fn weekday_key(raw: &str) -> String {
    raw.trim().chars().take(3).collect::<String>().to_uppercase()
}
