//! Run configuration: course identity plus the reservation policy, loaded
//! once from a TOML file before the first cycle. Secrets stay in the
//! environment and never enter this file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use slotpulse_core::policy::Policy;

#[derive(Debug, Clone, Deserialize)]
pub struct CourseConfig {
    /// Value the course dropdown posts back to the portal.
    pub value: String,
    /// Course label exactly as it appears in the bookings table.
    pub name: String,
    /// Human-readable label used in operator messages.
    pub display_name: String,
}

fn default_true() -> bool {
    true
}

fn default_confirmation_wait() -> u64 {
    180
}

#[derive(Debug, Deserialize)]
pub struct BotConfig {
    pub course: CourseConfig,
    /// Refuse to start when the balance cannot cover a peak session.
    #[serde(default = "default_true")]
    pub value_check: bool,
    #[serde(default = "default_confirmation_wait")]
    pub confirmation_wait_secs: u64,
    #[serde(flatten)]
    pub policy: Policy,
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: BotConfig =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.policy = config.policy.normalized();
        Ok(config)
    }
}
