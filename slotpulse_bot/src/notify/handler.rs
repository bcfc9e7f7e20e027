//! Telegram adapter for operator notifications and remote commands.

use std::path::Path;

use async_trait::async_trait;
use slotpulse_core::notify::{NotificationChannel, OperatorCommand};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, UpdateKind};

pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
    last_update_id: Option<i32>,
}

impl TelegramChannel {
    /// Connects and fast-forwards past updates that queued up while the bot
    /// was offline, so stale commands are never replayed.
    pub async fn new(token: String, chat_id: i64) -> Self {
        let bot = Bot::new(token);
        let mut channel = Self {
            bot,
            chat_id: ChatId(chat_id),
            last_update_id: None,
        };
        channel.drain_pending().await;
        channel
    }

    async fn drain_pending(&mut self) {
        match self.bot.get_updates().await {
            Ok(updates) => {
                if let Some(last) = updates.last() {
                    self.last_update_id = Some(last.id.0 as i32);
                    log::debug!("Skipped {} pending Telegram update(s).", updates.len());
                }
            }
            Err(e) => log::warn!("Failed to initialize Telegram update offset: {}", e),
        }
    }

    fn parse_command(text: &str) -> Option<OperatorCommand> {
        match text.trim().to_lowercase().as_str() {
            "/stop" => Some(OperatorCommand::Stop),
            "/status" => Some(OperatorCommand::Status),
            "/screen" => Some(OperatorCommand::Snapshot),
            "/stats" => Some(OperatorCommand::Stats),
            _ => None,
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&mut self, text: &str, silent: bool) -> bool {
        match self
            .bot
            .send_message(self.chat_id, text)
            .disable_notification(silent)
            .protect_content(true)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("Telegram send failed: {}", e);
                false
            }
        }
    }

    async fn send_file(&mut self, path: &Path, caption: &str, silent: bool) -> bool {
        let file = InputFile::file(path.to_path_buf());
        match self
            .bot
            .send_document(self.chat_id, file)
            .caption(caption.to_string())
            .disable_notification(silent)
            .protect_content(true)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("Telegram send_file failed: {}", e);
                false
            }
        }
    }

    async fn poll_commands(&mut self) -> Option<OperatorCommand> {
        let mut request = self.bot.get_updates();
        if let Some(last) = self.last_update_id {
            request = request.offset(last + 1);
        }
        let updates = match request.await {
            Ok(updates) => updates,
            Err(e) => {
                log::error!("Error checking Telegram commands: {}", e);
                return None;
            }
        };

        for update in updates {
            self.last_update_id = Some(update.id.0 as i32);
            let UpdateKind::Message(message) = update.kind else {
                continue;
            };
            if message.chat.id != self.chat_id {
                continue;
            }
            let Some(text) = message.text() else { continue };
            if let Some(command) = Self::parse_command(text) {
                return Some(command);
            }
        }
        None
    }
}
