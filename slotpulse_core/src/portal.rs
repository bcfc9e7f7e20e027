//! Booking-portal capabilities the orchestrator consumes.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::PortalError;
use crate::slots::{Booking, Slot};

/// Outcome of a single reservation attempt, as observed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The slot flipped to reserved under this session.
    Success,
    /// The page came back unchanged; the snapshot is stale and the cycle's
    /// remaining candidates are abandoned.
    NoChange,
    /// The portal surfaced a blocking dialog with this text.
    Alert(String),
    /// The attempt failed; the slot is skipped this cycle.
    Error,
}

/// Interaction surface of the remote booking portal.
///
/// Implementations own the course identity and the authenticated session;
/// calls may suspend while the remote page settles. Errors other than
/// [`PortalError::AuthLost`] are transient.
#[async_trait]
pub trait PortalClient {
    /// Current snapshot of bookable slots, in page order.
    async fn available_slots(&mut self) -> Result<Vec<Slot>, PortalError>;

    async fn reserve(&mut self, slot: &Slot) -> Result<ReserveOutcome, PortalError>;

    /// Walks the checkout flow for reservations held by this session.
    async fn confirm_reservation(&mut self) -> Result<bool, PortalError>;

    async fn existing_bookings(&mut self) -> Result<Vec<Booking>, PortalError>;

    /// Whether a reservation now shows up in the bookings table.
    async fn is_slot_confirmed(&mut self, date: &str, session: u8) -> Result<bool, PortalError>;

    /// Account balance as displayed by the portal, if it can be read.
    async fn account_balance(&mut self) -> Result<Option<f64>, PortalError>;

    /// Saves a redacted copy of the current page for the operator.
    async fn capture_snapshot(&mut self) -> Result<PathBuf, PortalError>;

    /// Best-effort; called once when the operator stops the run.
    async fn logout(&mut self);
}
