//! Operator-facing message builders.

use std::collections::BTreeSet;

use chrono::Local;

use crate::policy::Policy;
use crate::slots::{Booking, DATE_FORMAT};

/// Store-value cost of one session, used to estimate affordable slots.
pub(crate) const NON_PEAK_RATE: f64 = 73.03;
pub(crate) const PEAK_RATE: f64 = 81.75;

const SESSION_TIMETABLE: &str = "\u{1F4C5} Practical Session Timings:\n\
  Session 1: 08:30 - 10:10 (Non-peak)\n\
  Session 2: 10:20 - 12:00 (Peak)\n\
  Session 3: 12:45 - 14:25 (Non-peak)\n\
  Session 4: 14:35 - 16:15 (Non-peak)\n\
  Session 5: 16:25 - 18:05 (Peak)\n\
  Session 6: 18:50 - 20:30 (Peak)\n\
  Session 7: 20:40 - 22:20 (Peak)";

const WEEKDAY_ORDER: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

fn weekday_rank(day: &str) -> usize {
    WEEKDAY_ORDER
        .iter()
        .position(|d| *d == day)
        .unwrap_or(WEEKDAY_ORDER.len())
}

fn join_sessions(sessions: &BTreeSet<u8>) -> String {
    sessions
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn start_message(
    course_display: &str,
    policy: &Policy,
    balance: Option<f64>,
    bookings: &[Booking],
) -> String {
    let started = Local::now().format("%d/%b/%Y %H:%M:%S");

    let mut allowed: Vec<_> = policy.allowed_sessions.iter().collect();
    allowed.sort_by_key(|(day, _)| weekday_rank(day));
    let allowed_lines: String = allowed
        .iter()
        .map(|(day, sessions)| format!("  {}: {}\n", day, join_sessions(sessions)))
        .collect();

    let mut included: Vec<_> = policy.included_dates.iter().collect();
    included.sort_by_key(|(date, _)| **date);
    let included_lines: String = included
        .iter()
        .map(|(date, sessions)| format!("  {}: {}\n", date, join_sessions(sessions)))
        .collect();

    let mut excluded: Vec<_> = policy.excluded_dates.iter().collect();
    excluded.sort();
    let excluded_lines: String = excluded.iter().map(|date| format!("  {}\n", date)).collect();

    let mut booked_lines = format!("Your booked {} sessions:\n", course_display);
    if bookings.is_empty() {
        booked_lines.push_str("  None booked yet.\n");
    } else {
        let mut sorted: Vec<_> = bookings.to_vec();
        sorted.sort_by_key(|b| (b.date, b.session));
        for b in sorted {
            booked_lines.push_str(&format!(
                "  - {} - Session {}\n",
                b.date.format(DATE_FORMAT),
                b.session
            ));
        }
    }

    let affordability = match balance {
        Some(value) => format!(
            "Current store value: {:.2}\n\
             Slots you can afford:\n  - {:.0} non-peak sessions\n  - {:.0} peak sessions\n\n",
            value,
            (value / NON_PEAK_RATE).floor(),
            (value / PEAK_RATE).floor()
        ),
        None => String::new(),
    };

    format!(
        "\u{1F916} Bot started at {}\n\
         AutoBook: {}\n\
         Course: {}\n\
         {}\
         Allowed Sessions:\n{}\n\
         Additional Included Dates:\n{}\n\
         Excluded Dates:\n{}\n\
         {}\n\
         {}",
        started,
        if policy.auto_book { "Enabled" } else { "Disabled" },
        course_display,
        affordability,
        allowed_lines,
        included_lines,
        excluded_lines,
        booked_lines,
        SESSION_TIMETABLE
    )
}

pub(crate) fn status_message() -> String {
    format!(
        "\u{2705} Bot is running. Last check: {}",
        Local::now().format("%d/%b/%Y %H:%M:%S")
    )
}

pub(crate) fn stats_message(slots_found: u64, cycles: u64) -> String {
    format!(
        "\u{1F4CA} Bot Statistics:\n  - Slots found: {}\n  - Cycles run: {}",
        slots_found, cycles
    )
}
