//! # Dairy Union Telegram Bot
//!
//! A menu-driven Telegram bot for a dairy industry association: a browsable
//! catalog of symptom cards maintained by administrators through guided
//! dialogues, service and course showcases, lead capture and a weekly digest
//! of channel posts. All data lives in JSON documents on disk.

pub mod bot;
pub mod catalog;
pub mod config;
pub mod content;
pub mod dialogue;
pub mod digest;
pub mod gateway;
pub mod leads;
pub mod localization;
pub mod storage;
pub mod subscribers;
pub mod token;
