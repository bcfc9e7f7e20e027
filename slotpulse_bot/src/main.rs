use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use slotpulse_core::notify::NotificationChannel;
use slotpulse_core::orchestrator::runner::{Orchestrator, OrchestratorSettings};
use slotpulse_core::portal::PortalClient;

mod config;
mod login;
mod notify;
mod portal;

use config::BotConfig;
use login::handler::LoginManager;
use notify::handler::TelegramChannel;
use portal::handler::PortalHandler;
use portal::session::PortalSession;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    log::info!("Starting slotpulse_bot...");

    if let Err(e) = run().await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = BotConfig::load("config.toml")?;
    let token = env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN not set")?;
    let chat_id: i64 = env::var("TELEGRAM_CHAT_ID")
        .context("TELEGRAM_CHAT_ID not set")?
        .parse()
        .context("TELEGRAM_CHAT_ID must be a numeric chat id")?;
    let username = env::var("PORTAL_USERNAME").context("PORTAL_USERNAME not set")?;
    let password = env::var("PORTAL_PASSWORD").context("PORTAL_PASSWORD not set")?;

    log::info!("Starting run after loading configuration and environment variables.");

    let mut channel = TelegramChannel::new(token, chat_id).await;
    let session = PortalSession::new()?;

    let mut login = LoginManager::new(session, username.clone(), password);
    if !login.login(&mut channel).await? {
        anyhow::bail!("Login failed. Please check your credentials or restart the bot to try again.");
    }
    log::info!("Login successful for user: {}", username);

    let portal = PortalHandler::new(login.into_session(), config.course.clone());
    let settings = OrchestratorSettings {
        course_display: config.course.display_name.clone(),
        value_check: config.value_check,
        confirmation_wait: Duration::from_secs(config.confirmation_wait_secs),
    };
    let mut orchestrator = Orchestrator::new(
        portal,
        channel,
        StdRng::from_entropy(),
        config.policy,
        settings,
    );

    match orchestrator.run().await {
        Ok(summary) => {
            log::info!(
                "Run finished: {} cycle(s), {} with slots, {} slot(s) booked.",
                summary.cycles,
                summary.cycles_with_slots,
                summary.slots_booked
            );
            Ok(())
        }
        Err(e) => {
            log::error!("An error occurred: {}", e);
            let caption = format!("Application crashed: {}", e);
            match orchestrator.portal.capture_snapshot().await {
                Ok(path) => {
                    orchestrator.notify.send_file(&path, &caption, false).await;
                }
                Err(snapshot_err) => {
                    log::error!("Failed to capture crash snapshot: {}", snapshot_err);
                    orchestrator.notify.send(&caption, false).await;
                }
            }
            Err(e.into())
        }
    }
}
