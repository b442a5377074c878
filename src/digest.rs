//! Weekly digest of channel publications.
//!
//! Every text post in the configured channel becomes one digest item. The
//! digest shows items from the last seven days; broadcasting it clears the
//! whole store.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use teloxide::utils::html;

use crate::localization::{t, t_args};
use crate::storage::{DocumentStore, StoreError};

pub const DIGEST_KEY: &str = "weekly_digest_items";

/// Lookback of the digest window
pub const DIGEST_WINDOW_DAYS: i64 = 7;

/// Default cap on items shown in one digest
pub const DEFAULT_MAX_ITEMS: usize = 20;

const MSK_OFFSET_SECS: i32 = 3 * 3600;
const MAX_TITLE_CHARS: usize = 160;
const MIN_FIRST_LINE_CHARS: usize = 10;

/// Fixed +03:00 offset used for digest timestamps
pub fn msk() -> FixedOffset {
    FixedOffset::east_opt(MSK_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current time in the digest offset
pub fn msk_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&msk())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    /// RFC 3339 timestamp with a +03:00 offset
    pub ts: String,
    pub message_id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
}

impl DigestItem {
    /// Item timestamp; an unparsable timestamp counts as `now`.
    fn timestamp_or(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&self.ts).unwrap_or(now)
    }
}

/// Rendered digest and the items it used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub text: String,
    pub items: Vec<DigestItem>,
}

pub struct DigestStore<'a> {
    store: &'a DocumentStore,
}

impl<'a> DigestStore<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    pub fn items(&self) -> Result<Vec<DigestItem>, StoreError> {
        self.store.load(DIGEST_KEY)
    }

    /// Record a channel post. Returns `false` when the post is already stored
    /// or carries no text.
    pub async fn record_post(
        &self,
        message_id: i32,
        text: &str,
        channel_username: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<bool, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }

        let item = DigestItem {
            ts: now.to_rfc3339(),
            message_id,
            title: title_from_text(text),
            link: post_link(channel_username, message_id),
        };

        self.store
            .update(DIGEST_KEY, |doc: &mut Vec<DigestItem>| -> Result<bool, StoreError> {
                if doc.iter().any(|it| it.message_id == message_id) {
                    return Ok(false);
                }
                doc.push(item);
                Ok(true)
            })
            .await
    }

    /// Build the digest for the window ending at `now`.
    pub fn build(&self, now: DateTime<FixedOffset>, max_items: usize) -> Result<Digest, StoreError> {
        Ok(build_digest(&self.items()?, now, max_items))
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.replace(DIGEST_KEY, &Vec::<DigestItem>::new()).await
    }
}

/// Select the items inside the window and render them.
///
/// An item is inside the window when its timestamp is not older than
/// `now - 7 days`; the boundary itself is included.
pub fn build_digest(items: &[DigestItem], now: DateTime<FixedOffset>, max_items: usize) -> Digest {
    let since = now - Duration::days(DIGEST_WINDOW_DAYS);
    let period = format!("{}–{}", since.format("%d.%m"), now.format("%d.%m"));
    let header = t_args("digest-header", &[("period", &period)]);

    let used: Vec<DigestItem> = items
        .iter()
        .filter(|it| it.timestamp_or(now) >= since)
        .take(max_items)
        .cloned()
        .collect();

    if used.is_empty() {
        return Digest {
            text: format!("{}\n\n{}", header, t("digest-empty")),
            items: Vec::new(),
        };
    }

    let mut blocks = vec![header];
    for (i, item) in used.iter().enumerate() {
        let title = match item.title.trim() {
            "" => t("digest-untitled"),
            title => title.replace('\n', " "),
        };
        blocks.push(format!("{}) {}\n{}", i + 1, html::escape(&title), item.link.trim()));
    }

    Digest {
        text: blocks.join("\n\n"),
        items: used,
    }
}

/// Digest title of a post: its first line, or the second non-empty line when
/// the first one is too short to say anything.
pub fn title_from_text(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return t("digest-untitled");
    }

    let mut title = text.lines().next().unwrap_or_default().trim();
    if title.chars().count() < MIN_FIRST_LINE_CHARS {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if lines.len() >= 2 {
            title = lines[1];
        }
    }

    title.chars().take(MAX_TITLE_CHARS).collect()
}

/// Public link to a channel post
pub fn post_link(channel_username: &str, message_id: i32) -> String {
    format!("https://t.me/{}/{}", channel_username.trim_start_matches('@'), message_id)
}
