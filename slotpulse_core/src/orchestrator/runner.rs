//! The poll-filter-reserve-confirm cycle loop.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::PortalError;
use crate::filters::engine::filter_slots;
use crate::notify::{NotificationChannel, OperatorCommand};
use crate::pacing::{PaceController, PollMode};
use crate::policy::Policy;
use crate::portal::{PortalClient, ReserveOutcome};
use crate::slots::{Booking, CycleResult, Slot};

use super::messages;

/// Growth applied to the backoff multiplier after a failed cycle. A clean
/// cycle resets the multiplier; the pace controller never sees failures.
const BACKOFF_GROWTH: f64 = 1.5;
const BACKOFF_CAP: f64 = 8.0;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Course label used in operator messages.
    pub course_display: String,
    /// Refuse to start when the balance cannot cover a peak session.
    pub value_check: bool,
    /// How long the operator gets to confirm reservations manually.
    pub confirmation_wait: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            course_display: String::new(),
            value_check: true,
            confirmation_wait: Duration::from_secs(180),
        }
    }
}

/// Totals for a finished run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub cycles_with_slots: u64,
    pub slots_booked: u64,
}

enum CycleControl {
    Continue,
    Finished,
}

/// Drives the whole run: seeds bookings, walks cycles until the operator
/// stops the bot, and owns every piece of mutable run state (pace, backoff,
/// known bookings, counters) so nothing lives in module globals.
pub struct Orchestrator<P, N, R> {
    pub portal: P,
    pub notify: N,
    rng: R,
    policy: Policy,
    settings: OrchestratorSettings,
    pace: PaceController,
    bookings: Vec<Booking>,
    backoff_multiplier: f64,
    summary: RunSummary,
}

impl<P, N, R> Orchestrator<P, N, R>
where
    P: PortalClient,
    N: NotificationChannel,
    R: Rng,
{
    pub fn new(portal: P, notify: N, rng: R, policy: Policy, settings: OrchestratorSettings) -> Self {
        Self {
            portal,
            notify,
            rng,
            policy,
            settings,
            pace: PaceController::default(),
            bookings: Vec::new(),
            backoff_multiplier: 1.0,
            summary: RunSummary::default(),
        }
    }

    /// Runs cycles until the operator stops the bot or the session is lost.
    /// Only [`PortalError::AuthLost`] comes back as an error; transient cycle
    /// failures sleep and retry under a growing backoff multiplier.
    pub async fn run(&mut self) -> Result<RunSummary, PortalError> {
        self.seed_bookings().await?;
        if !self.startup_checks().await? {
            return Ok(self.summary.clone());
        }

        loop {
            if self.handle_commands().await? {
                break;
            }

            let started = Instant::now();
            let control = match self.run_cycle().await {
                Ok((result, control)) => {
                    self.backoff_multiplier = 1.0;
                    if result.slots_found {
                        self.summary.cycles_with_slots += 1;
                    }
                    self.summary.slots_booked += result.booked.len() as u64;
                    control
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::error!("Cycle {} failed: {}", self.summary.cycles, e);
                    self.backoff_multiplier =
                        (self.backoff_multiplier * BACKOFF_GROWTH).min(BACKOFF_CAP);
                    CycleControl::Continue
                }
            };

            log::info!(
                "Cycle {} completed in {:.2}ms.",
                self.summary.cycles,
                started.elapsed().as_secs_f64() * 1000.0
            );
            self.summary.cycles += 1;

            if matches!(control, CycleControl::Finished) {
                break;
            }

            self.pace.tick();
            self.sleep_cadence().await;
        }

        Ok(self.summary.clone())
    }

    async fn seed_bookings(&mut self) -> Result<(), PortalError> {
        self.bookings = self.portal.existing_bookings().await?;
        if self.bookings.is_empty() {
            log::error!(
                "No previous {} bookings found. Cannot compare slots.",
                self.settings.course_display
            );
        } else {
            log::debug!(
                "Found {} previous {} booking(s).",
                self.bookings.len(),
                self.settings.course_display
            );
        }
        Ok(())
    }

    /// Returns false when the run should stop before the first cycle.
    async fn startup_checks(&mut self) -> Result<bool, PortalError> {
        let balance = match self.portal.account_balance().await {
            Ok(balance) => balance,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::error!("Could not read account balance: {}", e);
                None
            }
        };

        if self.settings.value_check {
            match balance {
                Some(value) if value < messages::PEAK_RATE => {
                    let msg = format!(
                        "Store value is too low (${:.2}). Min required: ${:.2}. Bot stopped.",
                        value,
                        messages::PEAK_RATE
                    );
                    log::error!("{}", msg);
                    self.notify.send(&format!("[!] {}", msg), false).await;
                    return Ok(false);
                }
                Some(_) => {}
                None => log::error!("Could not parse store value."),
            }
        }

        let msg = messages::start_message(
            &self.settings.course_display,
            &self.policy,
            balance,
            &self.bookings,
        );
        self.notify.send(&msg, false).await;
        Ok(true)
    }

    /// Returns true when the operator asked to stop.
    async fn handle_commands(&mut self) -> Result<bool, PortalError> {
        match self.notify.poll_commands().await {
            Some(OperatorCommand::Stop) => {
                self.portal.logout().await;
                log::info!("Stopping bot after receiving /stop.");
                self.notify.send("Bot stopped via /stop command.", false).await;
                Ok(true)
            }
            Some(OperatorCommand::Status) => {
                log::debug!("Status command received.");
                self.notify.send(&messages::status_message(), false).await;
                Ok(false)
            }
            Some(OperatorCommand::Snapshot) => {
                match self.portal.capture_snapshot().await {
                    Ok(path) => {
                        self.notify
                            .send_file(
                                &path,
                                "\u{1F4F8} Current portal page. Personal fields redacted.",
                                false,
                            )
                            .await;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        log::error!("Snapshot capture failed: {}", e);
                        self.notify
                            .send(&format!("Snapshot capture failed: {}", e), false)
                            .await;
                    }
                }
                Ok(false)
            }
            Some(OperatorCommand::Stats) => {
                let msg =
                    messages::stats_message(self.summary.cycles_with_slots, self.summary.cycles);
                self.notify.send(&msg, false).await;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn run_cycle(&mut self) -> Result<(CycleResult, CycleControl), PortalError> {
        let slots = self.portal.available_slots().await?;
        let mut result = CycleResult {
            slots_found: !slots.is_empty(),
            ..CycleResult::default()
        };
        if !result.slots_found {
            return Ok((result, CycleControl::Continue));
        }

        let outcome = filter_slots(&slots, &self.policy, &self.bookings);
        for notice in &outcome.upgrades {
            log::debug!("{}", notice.message());
            self.notify.send(&notice.message(), true).await;
        }

        let matches_found = !outcome.matched.is_empty();
        match self
            .pace
            .on_cycle_outcome(true, matches_found, &mut self.rng)
        {
            PollMode::Aggressive => log::info!(
                "Aggressive mode enabled. Cycles remaining: {}",
                self.pace.aggressive_cycles_remaining()
            ),
            PollMode::Probe => log::info!("Probe mode enabled."),
            PollMode::Normal => log::debug!("Normal mode active."),
        }

        let filtered = outcome.matched;
        if filtered.is_empty() {
            log::info!("No matching slots found.");
            result.filtered = filtered;
            return Ok((result, CycleControl::Continue));
        }
        log::info!("Found {} matching slots after filtering.", filtered.len());

        if self.policy.dry_run {
            for slot in &filtered {
                let msg = format!(
                    "Dry run enabled. Would book {} session {} ({})",
                    slot.date, slot.session, slot.weekday
                );
                log::info!("{}", msg);
                self.notify.send(&msg, true).await;
            }
            result.filtered = filtered;
            return Ok((result, CycleControl::Finished));
        }

        let mut booked: Vec<Slot> = Vec::new();
        for slot in &filtered {
            let msg = format!("[\u{1F50D}] Trying to book: {}", slot.describe());
            log::info!("{}", msg);
            self.notify.send(&msg, false).await;

            match self.portal.reserve(slot).await? {
                ReserveOutcome::Success => {
                    let msg = format!("[\u{2714}] Reserved: {}", slot.describe());
                    log::info!("{}", msg);
                    self.notify.send(&msg, false).await;
                    if self.policy.auto_book {
                        self.auto_confirm().await?;
                    }
                    booked.push(slot.clone());
                }
                ReserveOutcome::NoChange => {
                    log::info!(
                        "Reservation produced no change; abandoning the remaining candidates this cycle."
                    );
                    break;
                }
                ReserveOutcome::Alert(text) => {
                    let msg = format!(
                        "Alert detected: {}. Please check manually. This slot will be skipped until resolved.",
                        text
                    );
                    log::warn!("{}", msg);
                    self.notify.send(&msg, false).await;
                }
                ReserveOutcome::Error => {}
            }
        }

        if !booked.is_empty() && !self.policy.auto_book {
            self.confirmation_window(&booked).await?;
        }
        if booked.is_empty() {
            log::warn!("No slots booked this round. See logs for details.");
        }

        result.filtered = filtered;
        result.booked = booked;
        Ok((result, CycleControl::Continue))
    }

    async fn auto_confirm(&mut self) -> Result<(), PortalError> {
        if self.portal.confirm_reservation().await? {
            let msg = "Auto-confirm enabled, booking has been confirmed.";
            log::info!("{}", msg);
            self.notify.send(msg, false).await;
        } else {
            let msg = "Auto-confirm booking failed. Please confirm manually.";
            log::error!("{}", msg);
            self.notify.send(msg, false).await;
        }
        Ok(())
    }

    /// Waits out the manual confirmation window, re-checks every booked slot
    /// and refreshes the known bookings when at least one check succeeded.
    async fn confirmation_window(&mut self, booked: &[Slot]) -> Result<(), PortalError> {
        let wait = self.settings.confirmation_wait;
        log::info!(
            "Waiting {}s for the operator to confirm {} booking(s)...",
            wait.as_secs(),
            booked.len()
        );
        self.notify
            .send(
                &format!(
                    "You have booked {} slot(s). Please confirm them within {} minutes.",
                    booked.len(),
                    wait.as_secs() / 60
                ),
                false,
            )
            .await;
        tokio::time::sleep(wait).await;

        log::info!("Checking if booked sessions are now confirmed...");
        let mut any_confirmed = false;
        for slot in booked {
            let confirmed = match self.portal.is_slot_confirmed(&slot.date, slot.session).await {
                Ok(confirmed) => confirmed,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::error!("Confirmation check failed: {}", e);
                    false
                }
            };

            if confirmed {
                any_confirmed = true;
                let msg = format!("[\u{2714}] Booking confirmed: {}", slot.describe());
                log::info!("{}", msg);
                self.notify.send(&msg, false).await;
            } else {
                let msg = format!(
                    "[X] Not confirmed: {} - please confirm manually and restart the bot for updated bookings.",
                    slot.describe()
                );
                log::info!("{}", msg);
                self.notify.send(&msg, false).await;
            }
        }

        if any_confirmed {
            match self.portal.existing_bookings().await {
                Ok(updated) if !updated.is_empty() => {
                    log::debug!("Updated bookings: {} found.", updated.len());
                    self.bookings = updated;
                }
                Ok(_) => log::error!("Failed to refresh bookings after confirmation."),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => log::error!("Failed to refresh bookings after confirmation: {}", e),
            }
        }
        Ok(())
    }

    async fn sleep_cadence(&mut self) {
        let base = self.pace.base_delay(&mut self.rng);
        let delay = base.mul_f64(self.backoff_multiplier);
        if self.backoff_multiplier > 1.0 {
            log::info!(
                "Applying {:.2}x backoff: sleeping {:.2}s",
                self.backoff_multiplier,
                delay.as_secs_f64()
            );
        } else {
            log::debug!("Sleeping {:.2}s before next cycle.", delay.as_secs_f64());
        }
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct ScriptedPortal {
        snapshots: VecDeque<Result<Vec<Slot>, PortalError>>,
        reserve_outcomes: VecDeque<Result<ReserveOutcome, PortalError>>,
        reserve_calls: Vec<String>,
        booking_lists: VecDeque<Vec<Booking>>,
        current_bookings: Vec<Booking>,
        confirm_checks: VecDeque<bool>,
        auto_confirm_result: bool,
        balance: Option<f64>,
        logged_out: bool,
    }

    #[async_trait]
    impl PortalClient for ScriptedPortal {
        async fn available_slots(&mut self) -> Result<Vec<Slot>, PortalError> {
            self.snapshots.pop_front().unwrap_or(Ok(Vec::new()))
        }

        async fn reserve(&mut self, slot: &Slot) -> Result<ReserveOutcome, PortalError> {
            self.reserve_calls.push(slot.handle.clone());
            self.reserve_outcomes
                .pop_front()
                .unwrap_or(Ok(ReserveOutcome::Error))
        }

        async fn confirm_reservation(&mut self) -> Result<bool, PortalError> {
            Ok(self.auto_confirm_result)
        }

        async fn existing_bookings(&mut self) -> Result<Vec<Booking>, PortalError> {
            if let Some(next) = self.booking_lists.pop_front() {
                self.current_bookings = next;
            }
            Ok(self.current_bookings.clone())
        }

        async fn is_slot_confirmed(
            &mut self,
            _date: &str,
            _session: u8,
        ) -> Result<bool, PortalError> {
            Ok(self.confirm_checks.pop_front().unwrap_or(false))
        }

        async fn account_balance(&mut self) -> Result<Option<f64>, PortalError> {
            Ok(self.balance)
        }

        async fn capture_snapshot(&mut self) -> Result<PathBuf, PortalError> {
            Ok(PathBuf::from("logs/snapshot.html"))
        }

        async fn logout(&mut self) {
            self.logged_out = true;
        }
    }

    #[derive(Default)]
    struct ScriptedChannel {
        commands: VecDeque<Option<OperatorCommand>>,
        sent: Vec<String>,
    }

    #[async_trait]
    impl NotificationChannel for ScriptedChannel {
        async fn send(&mut self, text: &str, _silent: bool) -> bool {
            self.sent.push(text.to_string());
            true
        }

        async fn send_file(&mut self, path: &Path, caption: &str, _silent: bool) -> bool {
            self.sent.push(format!("file:{} {}", path.display(), caption));
            true
        }

        async fn poll_commands(&mut self) -> Option<OperatorCommand> {
            // Once the script runs dry, stop the bot so tests terminate.
            self.commands
                .pop_front()
                .unwrap_or(Some(OperatorCommand::Stop))
        }
    }

    fn slot(date: &str, session: u8, handle: &str) -> Slot {
        Slot {
            date: date.to_string(),
            weekday: "Wednesday".to_string(),
            session,
            handle: handle.to_string(),
        }
    }

    fn wed_policy(sessions: &[u8]) -> Policy {
        let mut policy = Policy::default();
        policy
            .allowed_sessions
            .insert("WED".to_string(), sessions.iter().copied().collect());
        policy
    }

    fn orchestrator(
        portal: ScriptedPortal,
        channel: ScriptedChannel,
        policy: Policy,
    ) -> Orchestrator<ScriptedPortal, ScriptedChannel, StdRng> {
        let settings = OrchestratorSettings {
            course_display: "Practical".to_string(),
            value_check: false,
            confirmation_wait: Duration::from_secs(180),
        };
        Orchestrator::new(portal, channel, StdRng::seed_from_u64(7), policy, settings)
    }

    #[tokio::test(start_paused = true)]
    async fn no_change_abandons_remaining_candidates() {
        // Scenario D: three candidates, the second returns NoChange, the
        // third is never attempted this cycle.
        let mut policy = wed_policy(&[3]);
        policy.auto_book = true;
        let mut portal = ScriptedPortal::default();
        portal.auto_confirm_result = true;
        portal.snapshots.push_back(Ok(vec![
            slot("01/Jan/2025", 3, "h1"),
            slot("08/Jan/2025", 3, "h2"),
            slot("15/Jan/2025", 3, "h3"),
        ]));
        portal
            .reserve_outcomes
            .push_back(Ok(ReserveOutcome::Success));
        portal
            .reserve_outcomes
            .push_back(Ok(ReserveOutcome::NoChange));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, policy);
        let summary = orch.run().await.unwrap();

        assert_eq!(orch.portal.reserve_calls, vec!["h1", "h2"]);
        assert_eq!(summary.slots_booked, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn alert_skips_the_slot_and_continues() {
        let mut policy = wed_policy(&[3]);
        policy.auto_book = true;
        let mut portal = ScriptedPortal::default();
        portal.auto_confirm_result = true;
        portal.snapshots.push_back(Ok(vec![
            slot("01/Jan/2025", 3, "h1"),
            slot("08/Jan/2025", 3, "h2"),
        ]));
        portal
            .reserve_outcomes
            .push_back(Ok(ReserveOutcome::Alert("session in progress".to_string())));
        portal
            .reserve_outcomes
            .push_back(Ok(ReserveOutcome::Success));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, policy);
        let summary = orch.run().await.unwrap();

        assert_eq!(orch.portal.reserve_calls, vec!["h1", "h2"]);
        assert_eq!(summary.slots_booked, 1);
        assert!(orch
            .notify
            .sent
            .iter()
            .any(|m| m.contains("Alert detected: session in progress")));
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_booking_refreshes_known_bookings() {
        let policy = wed_policy(&[3]);
        let confirmed = Booking {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            session: 3,
        };
        let mut portal = ScriptedPortal::default();
        portal.snapshots.push_back(Ok(vec![slot("01/Jan/2025", 3, "h1")]));
        portal
            .reserve_outcomes
            .push_back(Ok(ReserveOutcome::Success));
        portal.confirm_checks.push_back(true);
        portal.booking_lists.push_back(Vec::new()); // seed
        portal.booking_lists.push_back(vec![confirmed]); // refresh

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, policy);
        orch.run().await.unwrap();

        assert_eq!(orch.bookings, vec![confirmed]);
        assert!(orch
            .notify
            .sent
            .iter()
            .any(|m| m.contains("Booking confirmed")));
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_booking_leaves_known_bookings_alone() {
        let policy = wed_policy(&[3]);
        let mut portal = ScriptedPortal::default();
        portal.snapshots.push_back(Ok(vec![slot("01/Jan/2025", 3, "h1")]));
        portal
            .reserve_outcomes
            .push_back(Ok(ReserveOutcome::Success));
        portal.confirm_checks.push_back(false);
        portal.booking_lists.push_back(Vec::new());
        portal.booking_lists.push_back(vec![Booking {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            session: 3,
        }]);

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, policy);
        orch.run().await.unwrap();

        assert!(orch.bookings.is_empty());
        assert!(orch.notify.sent.iter().any(|m| m.contains("Not confirmed")));
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_errors_grow_the_backoff_multiplier() {
        let mut portal = ScriptedPortal::default();
        portal
            .snapshots
            .push_back(Err(PortalError::Request("timed out".to_string())));
        portal
            .snapshots
            .push_back(Err(PortalError::Challenge));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, wed_policy(&[3]));
        let summary = orch.run().await.unwrap();

        assert_eq!(summary.cycles, 2);
        assert!((orch.backoff_multiplier - 2.25).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn a_clean_cycle_resets_the_backoff_multiplier() {
        let mut portal = ScriptedPortal::default();
        portal
            .snapshots
            .push_back(Err(PortalError::Request("timed out".to_string())));
        portal.snapshots.push_back(Ok(Vec::new()));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, wed_policy(&[3]));
        orch.run().await.unwrap();

        assert!((orch.backoff_multiplier - 1.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_loss_is_fatal() {
        let mut portal = ScriptedPortal::default();
        portal.snapshots.push_back(Err(PortalError::AuthLost));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, wed_policy(&[3]));
        assert!(matches!(orch.run().await, Err(PortalError::AuthLost)));
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_reports_matches_and_finishes() {
        let mut policy = wed_policy(&[3]);
        policy.dry_run = true;
        let mut portal = ScriptedPortal::default();
        portal.snapshots.push_back(Ok(vec![slot("01/Jan/2025", 3, "h1")]));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, policy);
        let summary = orch.run().await.unwrap();

        assert!(orch.portal.reserve_calls.is_empty());
        assert_eq!(summary.slots_booked, 0);
        assert!(orch
            .notify
            .sent
            .iter()
            .any(|m| m.contains("Dry run enabled. Would book 01/Jan/2025 session 3")));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_snapshot_skips_filtering_and_booking() {
        let mut portal = ScriptedPortal::default();
        portal.snapshots.push_back(Ok(Vec::new()));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, wed_policy(&[3]));
        let summary = orch.run().await.unwrap();

        assert!(orch.portal.reserve_calls.is_empty());
        assert_eq!(summary.cycles_with_slots, 0);
        assert_eq!(summary.cycles, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_command_logs_out_before_exiting() {
        let portal = ScriptedPortal::default();
        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(Some(OperatorCommand::Stop));

        let mut orch = orchestrator(portal, channel, wed_policy(&[3]));
        let summary = orch.run().await.unwrap();

        assert!(orch.portal.logged_out);
        assert_eq!(summary.cycles, 0);
        assert!(orch
            .notify
            .sent
            .iter()
            .any(|m| m.contains("Bot stopped via /stop command.")));
    }

    #[tokio::test(start_paused = true)]
    async fn status_and_stats_commands_answer_inline() {
        let mut portal = ScriptedPortal::default();
        portal.snapshots.push_back(Ok(Vec::new()));
        portal.snapshots.push_back(Ok(Vec::new()));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(Some(OperatorCommand::Status));
        channel.commands.push_back(Some(OperatorCommand::Stats));
        channel.commands.push_back(Some(OperatorCommand::Stop));

        let mut orch = orchestrator(portal, channel, wed_policy(&[3]));
        orch.run().await.unwrap();

        assert!(orch.notify.sent.iter().any(|m| m.contains("Bot is running")));
        assert!(orch.notify.sent.iter().any(|m| m.contains("Bot Statistics")));
    }

    #[tokio::test(start_paused = true)]
    async fn low_balance_stops_before_the_first_cycle() {
        let mut portal = ScriptedPortal::default();
        portal.balance = Some(50.0);

        let channel = ScriptedChannel::default();
        let mut orch = orchestrator(portal, channel, wed_policy(&[3]));
        orch.settings.value_check = true;
        let summary = orch.run().await.unwrap();

        assert_eq!(summary.cycles, 0);
        assert!(orch
            .notify
            .sent
            .iter()
            .any(|m| m.contains("Store value is too low")));
    }

    #[tokio::test(start_paused = true)]
    async fn upgrade_opportunity_is_relayed_to_the_operator() {
        let policy = wed_policy(&[3]);
        let mut portal = ScriptedPortal::default();
        portal.booking_lists.push_back(vec![Booking {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            session: 5,
        }]);
        portal.snapshots.push_back(Ok(vec![slot("01/Jan/2025", 3, "h1")]));
        portal
            .reserve_outcomes
            .push_back(Ok(ReserveOutcome::Error));

        let mut channel = ScriptedChannel::default();
        channel.commands.push_back(None);

        let mut orch = orchestrator(portal, channel, policy);
        orch.run().await.unwrap();

        assert!(orch
            .notify
            .sent
            .iter()
            .any(|m| m.contains("Found an earlier non-peak slot on a booked date!")));
    }
}
