//! Outbound side of the messaging transport.
//!
//! Handlers talk to Telegram only through [`Gateway`], so the dialogue and
//! routing logic can run against a recording double in tests.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, InlineKeyboardMarkup, MessageId, ParseMode, ReplyMarkup};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send a new message to a chat
    async fn send(
        &self,
        chat_id: ChatId,
        text: String,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageId, GatewayError>;

    /// Edit a message in place. Fails when the message is no longer editable
    /// or unchanged; callers fall back to [`Gateway::send`].
    async fn edit(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), GatewayError>;

    /// Acknowledge a button press, optionally with a short toast
    async fn acknowledge(&self, action_id: &str, toast: Option<String>) -> Result<(), GatewayError>;
}

#[async_trait]
impl Gateway for Bot {
    async fn send(
        &self,
        chat_id: ChatId,
        text: String,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageId, GatewayError> {
        let mut request = self.send_message(chat_id, text).parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            request = request.reply_markup(markup);
        }
        let sent = request.await?;
        Ok(sent.id)
    }

    async fn edit(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), GatewayError> {
        let mut request = self
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            request = request.reply_markup(markup);
        }
        request.await?;
        Ok(())
    }

    async fn acknowledge(&self, action_id: &str, toast: Option<String>) -> Result<(), GatewayError> {
        let mut request = self.answer_callback_query(CallbackQueryId(action_id.to_string()));
        if let Some(toast) = toast {
            request = request.text(toast);
        }
        request.await?;
        Ok(())
    }
}
