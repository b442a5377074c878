//! Runtime settings read from the environment (or a `.env` file).
//!
//! * `BOT_TOKEN` - Telegram bot token (required)
//! * `ADMIN_IDS` - comma-separated administrator user ids, e.g. `123,456`
//! * `DIGEST_CHANNEL_ID` - id of the channel whose posts feed the digest (required)
//! * `DIGEST_CHANNEL_USERNAME` - public username of that channel, used in post links
//! * `DATA_DIR` - directory holding the JSON documents

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CHANNEL_USERNAME: &str = "unionpmo";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    pub admin_ids: HashSet<u64>,
    pub digest_channel_id: i64,
    pub digest_channel_username: String,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").unwrap_or_default().trim().to_string();
        if bot_token.is_empty() {
            bail!("BOT_TOKEN is not set");
        }

        let admin_ids = parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default())?;
        let digest_channel_id = parse_channel_id(&env::var("DIGEST_CHANNEL_ID").unwrap_or_default())?;

        let digest_channel_username = env::var("DIGEST_CHANNEL_USERNAME")
            .ok()
            .map(|s| s.trim().trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CHANNEL_USERNAME.to_string());

        let data_dir = env::var("DATA_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self {
            bot_token,
            admin_ids,
            digest_channel_id,
            digest_channel_username,
            data_dir,
        })
    }

    /// Administrator check, evaluated on every step of every admin flow
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Parse `ADMIN_IDS`. Blank entries are skipped; anything else must be a user id.
pub fn parse_admin_ids(raw: &str) -> Result<HashSet<u64>> {
    let mut ids = HashSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<u64>()
            .with_context(|| format!("Invalid ADMIN_IDS entry: {part:?}"))?;
        ids.insert(id);
    }
    Ok(ids)
}

pub fn parse_channel_id(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("DIGEST_CHANNEL_ID is not set");
    }
    raw.parse::<i64>()
        .with_context(|| format!("Invalid DIGEST_CHANNEL_ID: {raw:?}"))
}
