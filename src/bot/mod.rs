//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: commands, main menu buttons and text routed to sessions
//! - `callback_handler`: inline keyboard callback queries
//! - `actions`: callback payload wire format
//! - `dialogue_manager`: dialogue state transitions and validation
//! - `sections`: symptom cards, services and courses browsing
//! - `admin_commands`: catalog overview, leads, digest and channel posts
//! - `ui_builder`: keyboards and message formatting
//! - `context`: state shared by all handlers

pub mod actions;
pub mod admin_commands;
pub mod callback_handler;
pub mod context;
pub mod dialogue_manager;
pub mod message_handler;
pub mod sections;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use admin_commands::{broadcast_digest, handle_channel_post, BroadcastReport};
pub use callback_handler::handle_callback;
pub use context::{BotContext, Sender};
pub use message_handler::{handle_text, Command};
