//! Portal sign-in flow.
//!
//! The portal fronts its credential form with an anti-bot check that an
//! HTTP session cannot complete. When one appears, the operator is told to
//! clear it from a browser; the login itself simply fails.

use std::time::Duration;

use anyhow::Result;
use slotpulse_core::error::PortalError;
use slotpulse_core::notify::NotificationChannel;
use tokio::time::sleep;

use crate::portal::session::{PortalSession, DASHBOARD_PAGE};

const HOME_URL: &str = "https://www.cdc.com.sg";
const LOGIN_URL: &str = "https://www.cdc.com.sg/login";
const USER_FIELD: &str = "userId_4";
const PASSWORD_FIELD: &str = "password_4";
const PORTAL_HOST: &str = "bookingportal.cdc.com.sg";

const REDIRECT_POLLS: u32 = 20;
const REDIRECT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct LoginManager {
    session: PortalSession,
    username: String,
    password: String,
}

impl LoginManager {
    pub fn new(session: PortalSession, username: String, password: String) -> Self {
        Self {
            session,
            username,
            password,
        }
    }

    /// Hands the authenticated session over once the login succeeded.
    pub fn into_session(self) -> PortalSession {
        self.session
    }

    /// Posts the credentials and polls until the portal accepts the session.
    /// Returns false when the portal did not let us in; only transport
    /// failures are errors.
    pub async fn login<N: NotificationChannel>(&mut self, channel: &mut N) -> Result<bool> {
        log::debug!("Login started.");

        let body = match self.session.fetch_raw(HOME_URL).await {
            Ok((_, body)) => body,
            Err(PortalError::Challenge) => {
                self.report_challenge(channel).await;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        if !body.contains(USER_FIELD) {
            log::warn!("Login form not found on the landing page; posting credentials anyway.");
        }

        log::debug!("Submitting login form for {}.", self.username);
        let (_, body) = match self
            .session
            .post_raw(
                LOGIN_URL,
                &[
                    (USER_FIELD, self.username.as_str()),
                    (PASSWORD_FIELD, self.password.as_str()),
                ],
            )
            .await
        {
            Ok(result) => result,
            Err(PortalError::Challenge) => {
                self.report_challenge(channel).await;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        if body.to_lowercase().contains("captcha") {
            let msg = "[!] The portal is asking for a CAPTCHA. Please complete the login from a \
                       browser, then restart the bot.";
            log::warn!("{}", msg);
            channel.send(msg, false).await;
            return Ok(false);
        }

        for _ in 0..REDIRECT_POLLS {
            match self.session.fetch_raw(DASHBOARD_PAGE).await {
                Ok((final_url, _)) if final_url.contains(PORTAL_HOST)
                    && !final_url.to_lowercase().contains("login") =>
                {
                    return Ok(true);
                }
                Ok(_) => {}
                Err(PortalError::Challenge) => {
                    self.report_challenge(channel).await;
                    return Ok(false);
                }
                Err(e) => log::debug!("Dashboard not reachable yet: {}", e),
            }
            sleep(REDIRECT_POLL_INTERVAL).await;
        }
        Ok(false)
    }

    async fn report_challenge<N: NotificationChannel>(&self, channel: &mut N) {
        let msg = "[!] Login blocked by an anti-bot challenge. Please sign in from a browser to \
                   clear it, then restart the bot.";
        log::warn!("{}", msg);
        channel.send(msg, false).await;
    }
}
