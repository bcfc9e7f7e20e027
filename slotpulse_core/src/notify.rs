//! Operator messaging and the remote command poll.

use std::path::Path;

use async_trait::async_trait;

/// Remote commands an operator can issue between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Stop,
    Status,
    Snapshot,
    Stats,
}

/// Outbound operator channel.
///
/// Sends are best-effort: adapters log delivery failures and report them
/// through the return value, never escalate them.
#[async_trait]
pub trait NotificationChannel {
    async fn send(&mut self, text: &str, silent: bool) -> bool;

    async fn send_file(&mut self, path: &Path, caption: &str, silent: bool) -> bool;

    /// Next pending operator command, if any. Checked once per cycle
    /// boundary; commands queued mid-cycle wait for the next boundary.
    async fn poll_commands(&mut self) -> Option<OperatorCommand>;
}
