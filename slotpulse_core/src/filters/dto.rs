use chrono::NaiveDate;

use crate::slots::Slot;

/// What the filter engine decided for one snapshot.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// Slots worth attempting, in snapshot order.
    pub matched: Vec<Slot>,
    /// Upgrade opportunities found on already-booked dates; the caller
    /// relays these to the operator.
    pub upgrades: Vec<UpgradeNotice>,
}

/// An earlier non-peak slot on a date that already carries a booking.
/// Booking it requires cancelling the existing reservation first, which
/// only the operator can decide to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeNotice {
    pub date: NaiveDate,
    pub candidate_session: u8,
    pub booked_session: u8,
}

impl UpgradeNotice {
    pub fn message(&self) -> String {
        format!(
            "Found an earlier non-peak slot on a booked date!\n\
             Date: {}\n\
             New Slot: Session {}\n\
             Current Slot: Session {}\n\n\
             Note: You must cancel your existing booking for this day before booking the new one.",
            self.date.format("%d %b %Y, %a"),
            self.candidate_session,
            self.booked_session
        )
    }
}
