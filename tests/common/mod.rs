//! Shared fixtures: a gateway that records outgoing traffic and a bot
//! context over a temporary data directory.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use teloxide::types::{ChatId, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId, ReplyMarkup};

use dairybot::bot::{BotContext, Sender};
use dairybot::config::Settings;
use dairybot::gateway::{Gateway, GatewayError};
use dairybot::storage::DocumentStore;

pub const ADMIN_ID: u64 = 1001;
pub const USER_ID: u64 = 2002;
pub const CHANNEL_ID: i64 = -1001234567890;

/// One outgoing call to the messaging transport
#[derive(Debug, Clone)]
pub enum Outgoing {
    Sent {
        chat_id: ChatId,
        text: String,
        markup: Option<ReplyMarkup>,
    },
    Edited {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    },
    Acknowledged {
        action_id: String,
        toast: Option<String>,
    },
}

/// Gateway double that records every call instead of talking to Telegram
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Outgoing>>,
    failing_chats: Mutex<HashSet<ChatId>>,
    failing_edits: AtomicBool,
    next_message_id: AtomicI32,
}

impl RecordingGateway {
    /// Make every send to `chat_id` fail
    pub fn fail_for(&self, chat_id: ChatId) {
        self.failing_chats.lock().unwrap().insert(chat_id);
    }

    /// Make every edit fail, as for a message that is too old
    pub fn fail_edits(&self) {
        self.failing_edits.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Outgoing> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Texts sent to a chat, in order
    pub fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Outgoing::Sent { chat_id: to, text, .. } if to == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Last message sent to a chat together with its markup
    pub fn last_sent(&self, chat_id: ChatId) -> Option<(String, Option<ReplyMarkup>)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Outgoing::Sent {
                chat_id: to,
                text,
                markup,
            } if to == chat_id => Some((text, markup)),
            _ => None,
        })
    }

    pub fn sends(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Outgoing::Sent { .. }))
            .count()
    }

    pub fn edits(&self) -> Vec<(MessageId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Outgoing::Edited { message_id, text, .. } => Some((message_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn acks(&self) -> Vec<(String, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Outgoing::Acknowledged { action_id, toast } => Some((action_id, toast)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn send(
        &self,
        chat_id: ChatId,
        text: String,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageId, GatewayError> {
        if self.failing_chats.lock().unwrap().contains(&chat_id) {
            return Err(GatewayError::Rejected(format!("bot was blocked by {chat_id}")));
        }
        self.calls.lock().unwrap().push(Outgoing::Sent {
            chat_id,
            text,
            markup,
        });
        Ok(MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), GatewayError> {
        if self.failing_edits.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected("message can't be edited".to_string()));
        }
        self.calls.lock().unwrap().push(Outgoing::Edited {
            chat_id,
            message_id,
            text,
            markup,
        });
        Ok(())
    }

    async fn acknowledge(&self, action_id: &str, toast: Option<String>) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(Outgoing::Acknowledged {
            action_id: action_id.to_string(),
            toast,
        });
        Ok(())
    }
}

/// Bot context wired to a recording gateway and a scratch data directory
pub struct TestBot {
    pub ctx: BotContext,
    pub gateway: Arc<RecordingGateway>,
    pub dir: TempDir,
}

pub fn test_bot() -> TestBot {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        bot_token: "test-token".to_string(),
        admin_ids: [ADMIN_ID].into_iter().collect(),
        digest_channel_id: CHANNEL_ID,
        digest_channel_username: "unionpmo".to_string(),
        data_dir: dir.path().to_path_buf(),
    };
    let gateway = Arc::new(RecordingGateway::default());
    let store = DocumentStore::open(dir.path());
    let ctx = BotContext::new(settings, store, gateway.clone() as Arc<dyn Gateway>);

    TestBot { ctx, gateway, dir }
}

pub fn admin() -> Sender {
    Sender::new(ADMIN_ID, Some("milk_admin"), "Анна Админ")
}

pub fn user() -> Sender {
    Sender::new(USER_ID, Some("farmer"), "Иван Петров")
}

/// Private chat with a user
pub fn chat_of(sender: &Sender) -> ChatId {
    ChatId(sender.id.0 as i64)
}

/// Callback data of every inline button, row by row
pub fn inline_data(markup: &Option<ReplyMarkup>) -> Vec<String> {
    match markup {
        Some(ReplyMarkup::InlineKeyboard(keyboard)) => keyboard_data(keyboard),
        _ => Vec::new(),
    }
}

pub fn keyboard_data(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
    keyboard
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}
