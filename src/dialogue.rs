//! Conversation state for guided multi-step flows.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{ChatId, UserId};
use thiserror::Error;

use crate::catalog::ArticleField;

/// Represents the conversation state of one user.
///
/// Data collected so far travels inside the variant, so a state can never be
/// reached without the fields of the steps before it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Idle,

    /// Category keyboard shown for /add_symptom
    AddChoosingCategory,
    /// "New category" pressed, waiting for its name
    AddAwaitingCategory,
    AddAwaitingTitle {
        category: String,
    },
    AddAwaitingText {
        category: String,
        title: String,
    },

    /// Category keyboard shown for /del_symptom
    DeleteChoosingCategory,
    DeleteAwaitingIndex {
        category: String,
        /// Number of cards in the list the admin was shown
        shown: usize,
    },

    /// Category keyboard shown for /edit_symptom
    EditChoosingCategory,
    EditAwaitingIndex {
        category: String,
    },
    EditAwaitingField {
        category: String,
        index: usize,
    },
    EditAwaitingValue {
        category: String,
        index: usize,
        field: ArticleField,
    },

    LeadAwaitingContact {
        source: Option<String>,
    },
}

impl DialogueState {
    /// Whether the state belongs to an administrator flow
    pub fn is_admin_flow(&self) -> bool {
        !matches!(self, DialogueState::Idle | DialogueState::LeadAwaitingContact { .. })
    }
}

/// Type alias for a per-user session
pub type SessionDialogue = Dialogue<DialogueState, InMemStorage<DialogueState>>;

/// Storage key of a user's session. Sessions follow the user, not the chat.
pub fn session_key(user_id: UserId) -> ChatId {
    ChatId(user_id.0 as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("input is empty")]
    Empty,
    #[error("input is not a number")]
    NotANumber,
    #[error("no item with this number")]
    OutOfRange,
}

/// Trim a free-text answer; empty answers are rejected
pub fn validate_text(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    Ok(trimmed.to_string())
}

/// Parse a 1-based card number typed by the user into a 0-based index below `len`
pub fn parse_position(input: &str, len: usize) -> Result<usize, InputError> {
    let trimmed = input.trim();

    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(InputError::NotANumber);
    }

    let number: usize = trimmed.parse().map_err(|_| InputError::OutOfRange)?;
    if number == 0 || number > len {
        return Err(InputError::OutOfRange);
    }

    Ok(number - 1)
}
