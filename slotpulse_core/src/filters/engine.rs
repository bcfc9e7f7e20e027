//! The slot-matching rule chain.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::filters::dto::{FilterOutcome, UpgradeNotice};
use crate::policy::Policy;
use crate::slots::{parse_slot_date, weekday_key, Booking, Slot, SESSIONS_PER_DAY};

/// Reduces a slot snapshot to the candidates the policy allows.
///
/// Rules are evaluated in order and short-circuit per slot; input ordering
/// is preserved. A slot whose date or session does not parse is dropped on
/// its own, leaving the rest of the batch untouched.
pub fn filter_slots(slots: &[Slot], policy: &Policy, existing_bookings: &[Booking]) -> FilterOutcome {
    let mut out = FilterOutcome::default();
    let mut dates_with_match: HashSet<NaiveDate> = HashSet::new();

    let booked_by_date: HashMap<NaiveDate, u8> = existing_bookings
        .iter()
        .map(|b| (b.date, b.session))
        .collect();

    for slot in slots {
        let Some(date) = parse_slot_date(&slot.date) else {
            log::warn!("Dropping slot with unparseable date {:?}", slot.date);
            continue;
        };
        if slot.session == 0 || slot.session > SESSIONS_PER_DAY {
            log::warn!(
                "Dropping slot {} with out-of-range session {}",
                slot.date,
                slot.session
            );
            continue;
        }
        let weekday = weekday_key(&slot.weekday);
        let session = slot.session;

        // 1. One slot per day
        if policy.one_slot_per_day && dates_with_match.contains(&date) {
            continue;
        }

        // 2. Dates with an existing booking only admit earlier non-peak
        //    sessions, as upgrade opportunities.
        if let Some(&booked_session) = booked_by_date.get(&date) {
            if session < booked_session && policy.non_peak_sessions.contains(&session) {
                out.upgrades.push(UpgradeNotice {
                    date,
                    candidate_session: session,
                    booked_session,
                });
                out.matched.push(slot.clone());
                dates_with_match.insert(date);
            }
            continue;
        }

        // 3. Included dates pin the date to the listed sessions, bypassing
        //    the exclusion and weekday rules either way.
        if let Some(sessions) = policy.included_dates.get(&date) {
            if sessions.contains(&session) {
                log::debug!("MATCH (included): {} S{}", date, session);
                out.matched.push(slot.clone());
                dates_with_match.insert(date);
            }
            continue;
        }

        // 4. Excluded dates
        if policy.excluded_dates.contains(&date) {
            continue;
        }

        // 5. Weekday allowance
        match policy.allowed_sessions.get(&weekday) {
            Some(allowed) if allowed.contains(&session) => {}
            _ => continue,
        }

        log::debug!("MATCH: {} S{}", date, session);
        out.matched.push(slot.clone());
        dates_with_match.insert(date);
    }

    log::info!(
        "Filtered {} slots down to {} match(es).",
        slots.len(),
        out.matched.len()
    );
    out
}
