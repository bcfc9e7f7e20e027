//! Adaptive polling cadence: a small state machine that speeds the poll loop
//! up while demand is visible and lets it relax again as bursts decay.

use std::time::{Duration, Instant};

use rand::Rng;

/// Polling aggressiveness for the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Normal,
    Probe,
    Aggressive,
}

/// Aggressive bursts at or above this remaining count are left alone when a
/// new match would otherwise re-arm them. Preserved from observed behavior;
/// whether the floor is meant to rate-limit re-triggers or to keep long
/// bursts from being truncated is an open product question.
const REARM_FLOOR: u32 = 4;

pub const DEFAULT_PROBE_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_AGGRO_RANGE: (u32, u32) = (6, 8);

/// Tracks the current polling mode and derives the base sleep per cycle.
///
/// All randomness flows through a caller-supplied [`Rng`], so tests drive
/// the controller with a seeded generator.
#[derive(Debug)]
pub struct PaceController {
    aggressive_cycles: u32,
    probe_start: Option<Instant>,
    probe_duration: Duration,
    aggro_range: (u32, u32),
}

impl Default for PaceController {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_DURATION, DEFAULT_AGGRO_RANGE)
    }
}

impl PaceController {
    pub fn new(probe_duration: Duration, aggro_range: (u32, u32)) -> Self {
        Self {
            aggressive_cycles: 0,
            probe_start: None,
            probe_duration,
            aggro_range,
        }
    }

    /// Aggressive takes precedence over Probe while any burst cycles remain.
    pub fn mode(&self) -> PollMode {
        if self.aggressive_cycles > 0 {
            PollMode::Aggressive
        } else if self.probe_start.is_some() {
            PollMode::Probe
        } else {
            PollMode::Normal
        }
    }

    pub fn aggressive_cycles_remaining(&self) -> u32 {
        self.aggressive_cycles
    }

    pub fn in_aggressive(&self) -> bool {
        self.aggressive_cycles > 0
    }

    pub fn in_probe(&self) -> bool {
        self.probe_start.is_some()
    }

    /// Consumes one cycle's outcome and returns the mode to act under.
    ///
    /// A cycle with policy matches re-arms an Aggressive burst (unless a long
    /// burst is still running, see [`REARM_FLOOR`]) and cancels any probe.
    /// Slots without matches start a Probe unless a burst is active. An empty
    /// cycle leaves the standing mode to decay through [`tick`].
    ///
    /// [`tick`]: PaceController::tick
    pub fn on_cycle_outcome<R: Rng>(
        &mut self,
        slots_found: bool,
        matches_found: bool,
        rng: &mut R,
    ) -> PollMode {
        if matches_found {
            if self.aggressive_cycles < REARM_FLOOR {
                self.aggressive_cycles = rng.gen_range(self.aggro_range.0..=self.aggro_range.1);
            }
            self.probe_start = None;
            return PollMode::Aggressive;
        }

        if slots_found && !self.in_aggressive() && self.probe_start.is_none() {
            self.probe_start = Some(Instant::now());
            return PollMode::Probe;
        }

        self.mode()
    }

    /// Once per cycle, after the mode decision has been acted on: burn one
    /// burst cycle and expire a probe that has outlived its window.
    pub fn tick(&mut self) {
        if self.aggressive_cycles > 0 {
            self.aggressive_cycles -= 1;
        }
        if let Some(started) = self.probe_start {
            if started.elapsed() > self.probe_duration {
                self.probe_start = None;
            }
        }
    }

    /// Base sleep before the failure backoff multiplier is applied.
    pub fn base_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let secs = match self.mode() {
            PollMode::Aggressive => rng.gen_range(2.0..4.0),
            PollMode::Probe => rng.gen_range(5.0..9.0),
            PollMode::Normal => rng.gen_range(13.0..40.0),
        };
        Duration::from_secs_f64(secs)
    }
}
