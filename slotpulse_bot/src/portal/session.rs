//! Cookie-backed HTTP session for the booking portal, with the WebForms
//! hidden-field bookkeeping every round-trip needs.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use slotpulse_core::error::PortalError;

pub const BOOKING_PAGE: &str = "https://bookingportal.cdc.com.sg/NewPortal/Booking/BookingPL.aspx";
pub const DASHBOARD_PAGE: &str =
    "https://bookingportal.cdc.com.sg/NewPortal/Booking/Dashboard.aspx";
pub const LOGOUT_PAGE: &str =
    "https://bookingportal.cdc.com.sg/NewPortal/logOut.aspx?PageName=Logout";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0.0.0 Safari/537.36";

/// One authenticated browsing session against the portal.
///
/// Every served page is absorbed: its `__VIEWSTATE` family is captured for
/// the next post and the body kept for snapshot capture.
pub struct PortalSession {
    http: Client,
    hidden_re: Regex,
    hidden: HashMap<String, String>,
    last_page: Option<String>,
}

impl PortalSession {
    pub fn new() -> Result<Self, PortalError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PortalError::Request(e.to_string()))?;
        let hidden_re = Regex::new(
            r#"name="(__VIEWSTATE|__VIEWSTATEGENERATOR|__EVENTVALIDATION)"[^>]*value="([^"]*)""#,
        )
        .expect("valid hidden-field regex");
        Ok(Self {
            http,
            hidden_re,
            hidden: HashMap::new(),
            last_page: None,
        })
    }

    /// Fetches an authenticated portal page. A redirect back to the sign-in
    /// flow means the session is gone.
    pub async fn get(&mut self, url: &str) -> Result<String, PortalError> {
        let (final_url, body) = self.fetch_raw(url).await?;
        Self::check_authenticated(&final_url)?;
        Ok(body)
    }

    /// Posts a WebForms form, carrying the captured hidden fields along.
    pub async fn post_form(
        &mut self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<String, PortalError> {
        let (final_url, body) = self.post_raw(url, fields).await?;
        Self::check_authenticated(&final_url)?;
        Ok(body)
    }

    /// GET without the authentication check, for the sign-in flow itself.
    /// Returns the final URL after redirects together with the body.
    pub async fn fetch_raw(&mut self, url: &str) -> Result<(String, String), PortalError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PortalError::Request(e.to_string()))?;
        self.absorb(response).await
    }

    /// POST without the authentication check, for the sign-in flow itself.
    pub async fn post_raw(
        &mut self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<(String, String), PortalError> {
        let mut form: Vec<(String, String)> = self
            .hidden
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        form.extend(fields.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PortalError::Request(e.to_string()))?;
        self.absorb(response).await
    }

    async fn absorb(
        &mut self,
        response: reqwest::Response,
    ) -> Result<(String, String), PortalError> {
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| PortalError::Request(e.to_string()))?;
        if is_challenge(&body) {
            return Err(PortalError::Challenge);
        }

        self.hidden = parse_hidden_fields(&self.hidden_re, &body);
        self.last_page = Some(body.clone());
        Ok((final_url, body))
    }

    fn check_authenticated(final_url: &str) -> Result<(), PortalError> {
        let lowered = final_url.to_lowercase();
        if lowered.contains("login") || lowered.contains("signin") {
            return Err(PortalError::AuthLost);
        }
        Ok(())
    }

    /// Body of the most recently served page, if any.
    pub fn last_page(&self) -> Option<&str> {
        self.last_page.as_deref()
    }
}

fn parse_hidden_fields(hidden_re: &Regex, body: &str) -> HashMap<String, String> {
    hidden_re
        .captures_iter(body)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Anti-bot interstitials never carry portal markup; the title gives them
/// away before any parsing runs.
pub(crate) fn is_challenge(body: &str) -> bool {
    let head: String = body.chars().take(2048).collect::<String>().to_lowercase();
    head.contains("just a moment") || head.contains("cf-chl")
}
