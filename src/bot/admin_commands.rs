//! Administrator commands: catalog overview, leads and the weekly digest

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{error, info, warn};

// Import localization
use crate::localization::{t, t_args};

use crate::catalog::Catalog;
use crate::digest::{msk_now, Digest, DigestStore, DEFAULT_MAX_ITEMS};
use crate::leads::{parse_leads_limit, Leads};
use crate::subscribers::Subscribers;

use super::context::BotContext;
use super::dialogue_manager::report_store_error;
use super::ui_builder::{format_categories_overview, format_lead};

/// Outcome of a digest broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub errors: usize,
    /// Digest entries in the sent text
    pub items: usize,
    /// Whether the digest items were cleared afterwards
    pub cleared: bool,
}

pub async fn admin_help(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    let commands = [
        "help-add",
        "help-list",
        "help-delete",
        "help-edit",
        "help-leads",
        "help-clear-leads",
        "help-digest",
        "help-cancel",
    ]
    .map(|key| format!("• {}", t(key)))
    .join("\n");

    ctx.reply(
        chat_id,
        format!("{}\n\n{}\n{}", t("admin-title"), t("admin-commands"), commands),
    )
    .await?;
    Ok(())
}

pub async fn list_symptoms(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    match Catalog::new(&ctx.store).snapshot() {
        Ok(catalog) => {
            ctx.reply(chat_id, format_categories_overview(&catalog)).await?;
            Ok(())
        }
        Err(e) => report_store_error(ctx, chat_id, &e).await,
    }
}

/// `/list_leads [limit]`
pub async fn list_leads(ctx: &BotContext, chat_id: ChatId, arg: &str) -> Result<()> {
    let limit = parse_leads_limit(arg);
    let leads = match Leads::new(&ctx.store).recent(limit) {
        Ok(leads) => leads,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    if leads.is_empty() {
        ctx.reply(chat_id, t("leads-empty")).await?;
        return Ok(());
    }

    let blocks: Vec<String> = leads
        .iter()
        .enumerate()
        .map(|(i, lead)| format_lead(i + 1, lead))
        .collect();
    ctx.reply(chat_id, format!("{}\n\n{}", t("leads-title"), blocks.join("\n")))
        .await?;
    Ok(())
}

pub async fn clear_leads(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    if let Err(e) = Leads::new(&ctx.store).clear().await {
        return report_store_error(ctx, chat_id, &e).await;
    }
    info!(chat_id = %chat_id, "Leads cleared");
    ctx.reply(chat_id, t("leads-cleared")).await?;
    Ok(())
}

pub async fn digest_status(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    let status = Subscribers::new(&ctx.store).list().and_then(|subscribers| {
        let digest = DigestStore::new(&ctx.store).build(msk_now(), DEFAULT_MAX_ITEMS)?;
        Ok((subscribers.len(), digest.items.len()))
    });
    let (subscribers, items) = match status {
        Ok(status) => status,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    let text = [
        t_args("digest-subscribers", &[("count", &subscribers.to_string())]),
        t_args("digest-items", &[("count", &items.to_string())]),
        String::new(),
        t("digest-commands"),
        format!("• {}", t("help-digest-preview")),
        format!("• {}", t("help-digest-broadcast")),
        format!("• {}", t("help-digest-clear")),
    ]
    .join("\n");
    ctx.reply(chat_id, text).await?;
    Ok(())
}

pub async fn digest_preview(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    match DigestStore::new(&ctx.store).build(msk_now(), DEFAULT_MAX_ITEMS) {
        Ok(digest) => {
            ctx.reply(chat_id, format!("{}\n\n{}", t("digest-preview"), digest.text))
                .await?;
            Ok(())
        }
        Err(e) => report_store_error(ctx, chat_id, &e).await,
    }
}

/// `/digest_broadcast`: send the digest to every subscriber, then clear the items
pub async fn digest_broadcast(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    let prepared = Subscribers::new(&ctx.store).list().and_then(|subscribers| {
        let digest = DigestStore::new(&ctx.store).build(msk_now(), DEFAULT_MAX_ITEMS)?;
        Ok((subscribers, digest))
    });
    let (subscribers, digest) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    if subscribers.is_empty() {
        ctx.reply(chat_id, t("digest-no-subscribers")).await?;
        return Ok(());
    }

    ctx.reply(
        chat_id,
        t_args("digest-broadcast-started", &[("count", &subscribers.len().to_string())]),
    )
    .await?;

    let report = broadcast_digest(ctx, &subscribers, &digest).await;

    let text = [
        t("digest-broadcast-done"),
        t_args("digest-delivered", &[("count", &report.delivered.to_string())]),
        t_args("digest-errors", &[("count", &report.errors.to_string())]),
        t_args("digest-used-items", &[("count", &report.items.to_string())]),
        t(if report.cleared {
            "digest-store-cleared"
        } else {
            "digest-store-not-cleared"
        }),
    ]
    .join("\n");
    ctx.reply(chat_id, text).await?;
    Ok(())
}

/// Deliver a built digest to each subscriber independently.
///
/// Failed deliveries are counted, not retried. The digest items are cleared
/// afterwards whatever the delivery outcome; a failed clear is logged and
/// reported through [`BroadcastReport::cleared`].
pub async fn broadcast_digest(ctx: &BotContext, subscribers: &[u64], digest: &Digest) -> BroadcastReport {
    let mut report = BroadcastReport {
        delivered: 0,
        errors: 0,
        items: digest.items.len(),
        cleared: false,
    };

    for &subscriber in subscribers {
        match ctx
            .gateway
            .send(ChatId(subscriber as i64), digest.text.clone(), None)
            .await
        {
            Ok(_) => report.delivered += 1,
            Err(e) => {
                warn!(subscriber, error = %e, "Digest delivery failed");
                report.errors += 1;
            }
        }
    }

    match DigestStore::new(&ctx.store).clear().await {
        Ok(()) => report.cleared = true,
        Err(e) => error!(error = %e, "Digest sent but its items could not be cleared"),
    }
    info!(
        delivered = report.delivered,
        errors = report.errors,
        items = report.items,
        cleared = report.cleared,
        "Digest broadcast finished"
    );
    report
}

pub async fn digest_clear(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    if let Err(e) = DigestStore::new(&ctx.store).clear().await {
        return report_store_error(ctx, chat_id, &e).await;
    }
    ctx.reply(chat_id, t("digest-cleared")).await?;
    Ok(())
}

/// A post in the digest channel. Posts from any other chat are ignored.
pub async fn handle_channel_post(
    ctx: &BotContext,
    chat_id: ChatId,
    message_id: MessageId,
    text: Option<&str>,
) -> Result<()> {
    if chat_id.0 != ctx.settings.digest_channel_id {
        return Ok(());
    }
    let Some(text) = text.filter(|s| !s.trim().is_empty()) else {
        return Ok(());
    };

    let recorded = DigestStore::new(&ctx.store)
        .record_post(message_id.0, text, &ctx.settings.digest_channel_username, msk_now())
        .await;
    match recorded {
        Ok(true) => info!(message_id = message_id.0, "Channel post added to digest"),
        Ok(false) => info!(message_id = message_id.0, "Channel post already in digest"),
        Err(e) => warn!(message_id = message_id.0, error = %e, "Failed to record channel post"),
    }
    Ok(())
}
