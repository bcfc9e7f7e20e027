//! HTTP adapter for the booking portal.
//!
//! Each operation is one or two WebForms round-trips: fetch the page,
//! post back with the captured hidden fields, classify what came back.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use slotpulse_core::error::PortalError;
use slotpulse_core::portal::{PortalClient, ReserveOutcome};
use slotpulse_core::slots::{Booking, Slot, DATE_FORMAT};

use crate::config::CourseConfig;
use crate::portal::dto::{PageExtractor, RESERVED_GIF};
use crate::portal::session::{PortalSession, BOOKING_PAGE, DASHBOARD_PAGE, LOGOUT_PAGE};

const COURSE_DROPDOWN: &str = "ctl00$ContentPlaceHolder1$ddlCourse";
const CHECKOUT_BUTTON: &str = "ctl00$ContentPlaceHolder1$btnCheckout";
const CONFIRM_BUTTON: &str = "ctl00$ContentPlaceHolder1$btnConfirm";
const CONFIRMED_PAGE_MARKER: &str = "ReportPrView.aspx";

const SNAPSHOT_PATH: &str = "logs/snapshot.html";

/// Header labels that carry personal data, blanked before a page leaves
/// the machine.
const REDACTIONS: [(&str, &str); 5] = [
    ("ctl00_HeaderSub_lblName", "ADMINISTRATOR"),
    ("ctl00_HeaderSub_lblUserID", "XXXXXXXX"),
    ("ctl00_HeaderSub_lblNRIC", "XXXXXXXXX"),
    ("ctl00_HeaderSub_lblExpiryDate", "XX/XX/XXXX"),
    ("ctl00_HeaderSub_lblDeposit", "$XXX.XX"),
];

pub struct PortalHandler {
    session: PortalSession,
    course: CourseConfig,
    extract: PageExtractor,
}

impl PortalHandler {
    pub fn new(session: PortalSession, course: CourseConfig) -> Self {
        Self {
            session,
            course,
            extract: PageExtractor::new(),
        }
    }

    /// Loads the booking page and posts the course selection back, leaving
    /// the grid for the chosen course in the session.
    async fn open_course_grid(&mut self) -> Result<String, PortalError> {
        self.session.get(BOOKING_PAGE).await?;
        log::debug!("Selecting {} course.", self.course.display_name);
        self.session
            .post_form(
                BOOKING_PAGE,
                &[
                    ("__EVENTTARGET", COURSE_DROPDOWN),
                    (COURSE_DROPDOWN, self.course.value.as_str()),
                ],
            )
            .await
    }
}

#[async_trait]
impl PortalClient for PortalHandler {
    async fn available_slots(&mut self) -> Result<Vec<Slot>, PortalError> {
        log::debug!("Getting slot statuses...");
        let body = self.open_course_grid().await?;
        if self.extract.is_fully_booked(&body) {
            log::debug!("Full booking message displayed.");
            return Ok(Vec::new());
        }
        Ok(self.extract.available_slots(&body))
    }

    async fn reserve(&mut self, slot: &Slot) -> Result<ReserveOutcome, PortalError> {
        // Image buttons post their click coordinates.
        let x_field = format!("{}.x", slot.handle);
        let y_field = format!("{}.y", slot.handle);
        let body = match self
            .session
            .post_form(BOOKING_PAGE, &[(x_field.as_str(), "1"), (y_field.as_str(), "1")])
            .await
        {
            Ok(body) => body,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::error!("Error reserving {}: {}", slot.handle, e);
                return Ok(ReserveOutcome::Error);
            }
        };

        if let Some(text) = self.extract.alert_text(&body) {
            log::warn!("Alert detected: {}", text);
            return Ok(ReserveOutcome::Alert(text));
        }

        match self.extract.button_gif(&body, &slot.handle) {
            Some(gif) if gif == RESERVED_GIF => {
                log::info!("Successfully reserved: {}", slot.handle);
                Ok(ReserveOutcome::Success)
            }
            state => {
                log::info!("Unsuccessful booking. Button state: {:?}", state);
                Ok(ReserveOutcome::NoChange)
            }
        }
    }

    async fn confirm_reservation(&mut self) -> Result<bool, PortalError> {
        let body = self
            .session
            .post_form(BOOKING_PAGE, &[(CHECKOUT_BUTTON, "Checkout")])
            .await?;
        log::info!("Posted checkout.");

        if !body.contains(CONFIRM_BUTTON.replace('$', "_").as_str()) {
            log::error!("Confirm button did not appear.");
            return Ok(false);
        }

        let (final_url, _) = self
            .session
            .post_raw(BOOKING_PAGE, &[(CONFIRM_BUTTON, "Confirm")])
            .await?;
        log::info!("Posted confirm.");

        if final_url.contains(CONFIRMED_PAGE_MARKER) {
            log::info!("Booking confirmed successfully!");
            Ok(true)
        } else {
            log::error!("Confirmation failed. URL: {}", final_url);
            Ok(false)
        }
    }

    async fn existing_bookings(&mut self) -> Result<Vec<Booking>, PortalError> {
        log::debug!("Retrieving all {} bookings...", self.course.display_name);
        let body = self.session.get(DASHBOARD_PAGE).await?;
        let bookings = self.extract.bookings(&body, &self.course.name);
        log::info!(
            "Retrieved {} {} booking(s).",
            bookings.len(),
            self.course.display_name
        );
        Ok(bookings)
    }

    async fn is_slot_confirmed(&mut self, date: &str, session: u8) -> Result<bool, PortalError> {
        let bookings = self.existing_bookings().await?;
        Ok(bookings
            .iter()
            .any(|b| b.date.format(DATE_FORMAT).to_string() == date && b.session == session))
    }

    async fn account_balance(&mut self) -> Result<Option<f64>, PortalError> {
        let body = self.session.get(DASHBOARD_PAGE).await?;
        Ok(self.extract.balance(&body))
    }

    async fn capture_snapshot(&mut self) -> Result<PathBuf, PortalError> {
        let page = match self.session.last_page() {
            Some(page) => page.to_string(),
            None => self.session.get(DASHBOARD_PAGE).await?,
        };
        let redacted = redact_personal_fields(&page);

        let path = PathBuf::from(SNAPSHOT_PATH);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| PortalError::Request(e.to_string()))?;
        }
        fs::write(&path, redacted).map_err(|e| PortalError::Request(e.to_string()))?;
        log::info!("Snapshot saved to {}", path.display());
        Ok(path)
    }

    async fn logout(&mut self) {
        log::debug!("Opening logout page...");
        if let Err(e) = self.session.fetch_raw(LOGOUT_PAGE).await {
            log::warn!("Logout request failed: {}", e);
        }
    }
}

/// Blanks the label contents listed in [`REDACTIONS`]. Labels that are not
/// on the page are left alone.
fn redact_personal_fields(page: &str) -> String {
    let mut out = page.to_string();
    for (id, replacement) in REDACTIONS {
        let Some(at) = out.find(id) else { continue };
        let Some(open_end) = out[at..].find('>').map(|i| at + i + 1) else {
            continue;
        };
        let Some(close) = out[open_end..].find('<').map(|i| open_end + i) else {
            continue;
        };
        out.replace_range(open_end..close, replacement);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_fields_are_redacted() {
        let page = r#"
            <span id="ctl00_HeaderSub_lblName">Jane Doe</span>
            <span id="ctl00_HeaderSub_lblNRIC">S1234567A</span>
            <span id="ctl00_HeaderSub_lblStoreValue">$245.60</span>
        "#;
        let redacted = redact_personal_fields(page);
        assert!(!redacted.contains("Jane Doe"));
        assert!(!redacted.contains("S1234567A"));
        assert!(redacted.contains("ADMINISTRATOR"));
        assert!(redacted.contains("XXXXXXXXX"));
        // The store value is not personal and stays visible.
        assert!(redacted.contains("$245.60"));
    }

    #[test]
    fn redaction_handles_missing_labels() {
        let page = "<html><body>no header labels</body></html>";
        assert_eq!(redact_personal_fields(page), page);
    }
}
