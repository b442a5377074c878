//! Shared state handed to every handler

use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{ChatId, MessageId, ReplyMarkup, User, UserId};
use tracing::debug;

use crate::config::Settings;
use crate::dialogue::{session_key, DialogueState, SessionDialogue};
use crate::gateway::Gateway;
use crate::storage::DocumentStore;

/// Who sent an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
    pub full_name: String,
}

impl Sender {
    pub fn new(id: u64, username: Option<&str>, full_name: &str) -> Self {
        Self {
            id: UserId(id),
            username: username.map(str::to_string),
            full_name: full_name.trim().to_string(),
        }
    }
}

impl From<&User> for Sender {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name().trim().to_string(),
        }
    }
}

pub struct BotContext {
    pub settings: Settings,
    pub store: DocumentStore,
    pub gateway: Arc<dyn Gateway>,
    /// Used to accept `/command@bot_username` in group chats
    pub bot_username: String,
    sessions: Arc<InMemStorage<DialogueState>>,
}

impl BotContext {
    pub fn new(settings: Settings, store: DocumentStore, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            settings,
            store,
            gateway,
            bot_username: String::new(),
            sessions: InMemStorage::new(),
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = username.into();
        self
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.settings.is_admin(user_id.0)
    }

    /// Session handle of a user
    pub fn dialogue(&self, user_id: UserId) -> SessionDialogue {
        Dialogue::new(Arc::clone(&self.sessions), session_key(user_id))
    }

    /// Current state of a user's session, `Idle` when there is none
    pub async fn session_state(&self, user_id: UserId) -> Result<DialogueState> {
        Ok(self.dialogue(user_id).get().await?.unwrap_or_default())
    }

    pub async fn set_session(&self, user_id: UserId, state: DialogueState) -> Result<()> {
        debug!(user_id = %user_id, state = ?state, "Session transition");
        self.dialogue(user_id).update(state).await?;
        Ok(())
    }

    /// Drop a user's session. No-op when there is none.
    pub async fn clear_session(&self, user_id: UserId) -> Result<()> {
        let dialogue = self.dialogue(user_id);
        if dialogue.get().await?.is_some() {
            debug!(user_id = %user_id, "Session cleared");
            dialogue.exit().await?;
        }
        Ok(())
    }

    pub async fn reply(&self, chat_id: ChatId, text: String) -> Result<MessageId> {
        Ok(self.gateway.send(chat_id, text, None).await?)
    }

    pub async fn reply_with(
        &self,
        chat_id: ChatId,
        text: String,
        markup: impl Into<ReplyMarkup>,
    ) -> Result<MessageId> {
        Ok(self.gateway.send(chat_id, text, Some(markup.into())).await?)
    }
}
