use thiserror::Error;

/// Failures surfaced by a portal adapter.
///
/// Only `AuthLost` is fatal; everything else is a transient condition the
/// cycle loop retries at its current cadence.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The session is no longer authenticated.
    #[error("portal session is no longer authenticated")]
    AuthLost,
    /// The portal served an anti-bot interstitial instead of the page.
    #[error("anti-bot challenge page served")]
    Challenge,
    #[error("portal request failed: {0}")]
    Request(String),
    #[error("unexpected page content: {0}")]
    Page(String),
}

impl PortalError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PortalError::AuthLost)
    }
}
