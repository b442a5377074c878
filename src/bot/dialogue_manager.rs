//! Dialogue Manager module for handling dialogue state transitions
//!
//! Text input is routed here by the message handler, button presses by the
//! callback handler once it has checked that the press matches the session.

use anyhow::Result;
use std::fmt::Display;
use teloxide::prelude::*;
use teloxide::utils::html;
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::{t, t_args};

// Import dialogue types
use crate::dialogue::{parse_position, validate_text, DialogueState, InputError};

// Import store adapters
use crate::catalog::{Article, ArticleField, Catalog, CatalogError};
use crate::digest::msk_now;
use crate::leads::{Lead, Leads};

// Import UI builder functions
use super::actions::AdminFlow;
use super::context::{BotContext, Sender};
use super::ui_builder::{
    admin_categories_keyboard, admin_field_keyboard, clip, describe_person, format_category_items,
    lead_contact_keyboard, main_menu_keyboard, untitled_or, WRITE_CONTACT,
};

/// Cards listed before the admin picks a number
const ITEMS_LIST_LIMIT: usize = 30;
/// Old/new values in the edit confirmation
const CONFIRM_CLIP: usize = 200;

fn field_label(field: ArticleField) -> String {
    match field {
        ArticleField::Title => t("field-title"),
        ArticleField::Text => t("field-text"),
    }
}

fn with_cancel_hint(text: String) -> String {
    format!("{}\n\n{}", text, t("cancel-hint"))
}

/// Log a store failure and tell the user the data is unavailable
pub async fn report_store_error(ctx: &BotContext, chat_id: ChatId, err: &(impl Display + Sync)) -> Result<()> {
    error!(chat_id = %chat_id, error = %err, "Data store failure");
    ctx.reply(chat_id, t("error-data-unavailable")).await?;
    Ok(())
}

/// Start an admin flow from its command, discarding any previous session
pub async fn start_admin_flow(ctx: &BotContext, sender: &Sender, chat_id: ChatId, flow: AdminFlow) -> Result<()> {
    ctx.clear_session(sender.id).await?;

    let categories = match Catalog::new(&ctx.store).categories() {
        Ok(categories) => categories,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    let (state, prompt) = match flow {
        AdminFlow::Add => (
            DialogueState::AddChoosingCategory,
            format!("{}\n\n{}", t("add-intro"), with_cancel_hint(t("add-step-category"))),
        ),
        AdminFlow::Delete | AdminFlow::Edit if categories.is_empty() => {
            let key = if flow == AdminFlow::Delete {
                "delete-no-categories"
            } else {
                "edit-no-categories"
            };
            ctx.reply(chat_id, t(key)).await?;
            return Ok(());
        }
        AdminFlow::Delete => (
            DialogueState::DeleteChoosingCategory,
            format!("{}\n\n{}", t("delete-intro"), t("delete-step-category")),
        ),
        AdminFlow::Edit => (
            DialogueState::EditChoosingCategory,
            format!("{}\n\n{}", t("edit-intro"), t("edit-step-category")),
        ),
    };

    info!(user_id = %sender.id, ?flow, "Admin flow started");
    ctx.set_session(sender.id, state).await?;
    ctx.reply_with(chat_id, prompt, admin_categories_keyboard(flow, &categories))
        .await?;
    Ok(())
}

/// Start lead capture, discarding any previous session
pub async fn start_lead(ctx: &BotContext, sender: &Sender, chat_id: ChatId, source: Option<String>) -> Result<()> {
    ctx.clear_session(sender.id).await?;
    debug!(user_id = %sender.id, source = ?source, "Lead capture started");
    ctx.set_session(sender.id, DialogueState::LeadAwaitingContact { source })
        .await?;
    ctx.reply_with(chat_id, contact_prompt(), lead_contact_keyboard())
        .await?;
    Ok(())
}

fn contact_prompt() -> String {
    [
        t("lead-prompt-intro"),
        [
            t("lead-prompt-ways"),
            t("lead-prompt-phone"),
            t("lead-prompt-telegram"),
            t("lead-prompt-plain"),
            t("lead-prompt-comment"),
        ]
        .join("\n"),
        t("lead-prompt-privacy"),
    ]
    .join("\n\n")
}

/// A category was picked on an admin keyboard
pub async fn choose_category(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    flow: AdminFlow,
    category: String,
) -> Result<()> {
    if flow == AdminFlow::Add {
        let prompt = format!(
            "{}\n\n{}",
            t_args("chosen-category", &[("category", &html::escape(&category))]),
            with_cancel_hint(t("add-step-title"))
        );
        ctx.set_session(sender.id, DialogueState::AddAwaitingTitle { category })
            .await?;
        ctx.reply(chat_id, prompt).await?;
        return Ok(());
    }

    let articles = match Catalog::new(&ctx.store).list(&category) {
        Ok(articles) => articles,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };
    if articles.is_empty() {
        ctx.reply(chat_id, format_category_items(&category, &articles, ITEMS_LIST_LIMIT))
            .await?;
        return Ok(());
    }

    let listing = format_category_items(&category, &articles, ITEMS_LIST_LIMIT);
    if flow == AdminFlow::Delete {
        let shown = articles.len();
        ctx.set_session(sender.id, DialogueState::DeleteAwaitingIndex { category, shown })
            .await?;
        ctx.reply(chat_id, format!("{}\n\n{}", listing, t("delete-step-number")))
            .await?;
    } else {
        ctx.set_session(sender.id, DialogueState::EditAwaitingIndex { category })
            .await?;
        ctx.reply(chat_id, format!("{}\n\n{}", listing, t("edit-step-number")))
            .await?;
    }
    Ok(())
}

/// "New category" was pressed in the add flow
pub async fn choose_new_category(ctx: &BotContext, sender: &Sender, chat_id: ChatId) -> Result<()> {
    ctx.set_session(sender.id, DialogueState::AddAwaitingCategory).await?;
    ctx.reply(
        chat_id,
        with_cancel_hint(format!("{}\n{}", t("add-step-new-category"), t("add-new-category-note"))),
    )
    .await?;
    Ok(())
}

/// The field to edit was picked
pub async fn choose_field(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    category: String,
    index: usize,
    field: ArticleField,
) -> Result<()> {
    ctx.set_session(sender.id, DialogueState::EditAwaitingValue { category, index, field })
        .await?;
    ctx.reply(chat_id, with_cancel_hint(t("edit-step-value"))).await?;
    Ok(())
}

/// Cancel whatever the user is doing.
///
/// Admins can cancel any flow; everyone else only the lead capture. Returns
/// whether a cancellation took place.
pub async fn cancel(ctx: &BotContext, sender: &Sender, chat_id: ChatId) -> Result<bool> {
    let state = ctx.session_state(sender.id).await?;

    if ctx.is_admin(sender.id) {
        ctx.clear_session(sender.id).await?;
        debug!(user_id = %sender.id, state = ?state, "Flow cancelled");
        ctx.reply(chat_id, t("cancelled")).await?;
        return Ok(true);
    }

    if let DialogueState::LeadAwaitingContact { .. } = state {
        ctx.clear_session(sender.id).await?;
        ctx.reply_with(chat_id, t("main-menu"), main_menu_keyboard())
            .await?;
        return Ok(true);
    }

    Ok(false)
}

/// Feed a text message to the active session
pub async fn handle_input(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    state: DialogueState,
    text: &str,
) -> Result<()> {
    if state.is_admin_flow() && !ctx.is_admin(sender.id) {
        debug!(user_id = %sender.id, "Ignoring admin flow input from non-admin");
        return Ok(());
    }

    match state {
        DialogueState::Idle => Ok(()),
        DialogueState::LeadAwaitingContact { source } => handle_contact_input(ctx, sender, chat_id, source, text).await,

        DialogueState::AddChoosingCategory
        | DialogueState::DeleteChoosingCategory
        | DialogueState::EditChoosingCategory => {
            ctx.reply(chat_id, with_cancel_hint(t("choose-category-by-button")))
                .await?;
            Ok(())
        }
        DialogueState::AddAwaitingCategory => match validate_text(text) {
            Ok(category) => {
                let prompt = format!(
                    "{}\n\n{}",
                    t_args("chosen-category", &[("category", &html::escape(&category))]),
                    with_cancel_hint(t("add-step-title"))
                );
                ctx.set_session(sender.id, DialogueState::AddAwaitingTitle { category })
                    .await?;
                ctx.reply(chat_id, prompt).await?;
                Ok(())
            }
            Err(_) => {
                ctx.reply(chat_id, t("empty-category")).await?;
                Ok(())
            }
        },
        DialogueState::AddAwaitingTitle { category } => match validate_text(text) {
            Ok(title) => {
                ctx.set_session(sender.id, DialogueState::AddAwaitingText { category, title })
                    .await?;
                ctx.reply(chat_id, with_cancel_hint(t("add-step-text"))).await?;
                Ok(())
            }
            Err(_) => {
                ctx.reply(chat_id, t("empty-title")).await?;
                Ok(())
            }
        },
        DialogueState::AddAwaitingText { category, title } => match validate_text(text) {
            Ok(body) => finish_add(ctx, sender, chat_id, category, title, body).await,
            Err(_) => {
                ctx.reply(chat_id, t("empty-text")).await?;
                Ok(())
            }
        },

        DialogueState::DeleteAwaitingIndex { category, shown } => match parse_position(text, shown) {
            Ok(index) => finish_delete(ctx, sender, chat_id, category, index).await,
            Err(err) => reprompt_number(ctx, chat_id, err, "2").await,
        },

        DialogueState::EditAwaitingIndex { category } => {
            handle_edit_index_input(ctx, sender, chat_id, category, text).await
        }
        DialogueState::EditAwaitingField { .. } => {
            ctx.reply_with(
                chat_id,
                with_cancel_hint(t("choose-field-by-button")),
                admin_field_keyboard(),
            )
            .await?;
            Ok(())
        }
        DialogueState::EditAwaitingValue { category, index, field } => match validate_text(text) {
            Ok(value) => finish_edit(ctx, sender, chat_id, category, index, field, value).await,
            Err(_) => {
                ctx.reply(chat_id, t("empty-value")).await?;
                Ok(())
            }
        },
    }
}

async fn reprompt_number(ctx: &BotContext, chat_id: ChatId, err: InputError, example: &str) -> Result<()> {
    let text = match err {
        InputError::OutOfRange => t("number-not-found"),
        InputError::Empty | InputError::NotANumber => t_args("number-required", &[("example", example)]),
    };
    ctx.reply(chat_id, with_cancel_hint(text)).await?;
    Ok(())
}

async fn finish_add(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    category: String,
    title: String,
    body: String,
) -> Result<()> {
    let result = Catalog::new(&ctx.store)
        .append(&category, Article::new(title.clone(), body))
        .await;
    ctx.clear_session(sender.id).await?;

    match result {
        Ok(count) => {
            info!(user_id = %sender.id, category = %category, count, "Card added");
            let text = [
                t("add-done"),
                [
                    t_args("summary-category", &[("category", &html::escape(&category))]),
                    t_args("summary-title", &[("title", &html::escape(&title))]),
                    t_args("summary-count", &[("count", &count.to_string())]),
                ]
                .join("\n"),
            ]
            .join("\n\n");
            ctx.reply(chat_id, text).await?;
            Ok(())
        }
        Err(e) => report_store_error(ctx, chat_id, &e).await,
    }
}

async fn finish_delete(ctx: &BotContext, sender: &Sender, chat_id: ChatId, category: String, index: usize) -> Result<()> {
    let result = Catalog::new(&ctx.store).remove_at(&category, index).await;
    ctx.clear_session(sender.id).await?;

    match result {
        Ok((removed, remaining)) => {
            info!(user_id = %sender.id, category = %category, index, "Card deleted");
            let text = [
                t("delete-done"),
                [
                    t_args("summary-category", &[("category", &html::escape(&category))]),
                    t_args("summary-removed", &[("title", &untitled_or(&removed.title))]),
                    t_args("summary-remaining", &[("count", &remaining.to_string())]),
                ]
                .join("\n"),
            ]
            .join("\n\n");
            ctx.reply(chat_id, text).await?;
            Ok(())
        }
        Err(CatalogError::Store(e)) => report_store_error(ctx, chat_id, &e).await,
        Err(e) => {
            warn!(user_id = %sender.id, error = %e, "Catalog changed during delete");
            ctx.reply(chat_id, t("delete-state-error")).await?;
            Ok(())
        }
    }
}

async fn handle_edit_index_input(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    category: String,
    text: &str,
) -> Result<()> {
    let articles = match Catalog::new(&ctx.store).list(&category) {
        Ok(articles) => articles,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    if articles.is_empty() {
        warn!(user_id = %sender.id, category = %category, "Category vanished during edit");
        ctx.clear_session(sender.id).await?;
        ctx.reply(chat_id, t("edit-state-error")).await?;
        return Ok(());
    }

    match parse_position(text, articles.len()) {
        Ok(index) => {
            let title = untitled_or(&articles[index].title);
            ctx.set_session(sender.id, DialogueState::EditAwaitingField { category, index })
                .await?;
            ctx.reply_with(
                chat_id,
                format!(
                    "{}\n\n{}",
                    t_args("edit-picked", &[("title", &title)]),
                    t("edit-step-field")
                ),
                admin_field_keyboard(),
            )
            .await?;
            Ok(())
        }
        Err(err) => reprompt_number(ctx, chat_id, err, "3").await,
    }
}

async fn finish_edit(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    category: String,
    index: usize,
    field: ArticleField,
    value: String,
) -> Result<()> {
    let result = Catalog::new(&ctx.store)
        .update_field(&category, index, field, &value)
        .await;
    ctx.clear_session(sender.id).await?;

    match result {
        Ok(old) => {
            info!(user_id = %sender.id, category = %category, index, field = %field, "Card updated");
            let text = [
                t("edit-done"),
                [
                    t_args("summary-category", &[("category", &html::escape(&category))]),
                    t_args("summary-field", &[("field", &field_label(field))]),
                    t_args(
                        "summary-old",
                        &[("value", &html::escape(&clip(old.trim(), CONFIRM_CLIP)))],
                    ),
                    t_args(
                        "summary-new",
                        &[("value", &html::escape(&clip(&value, CONFIRM_CLIP)))],
                    ),
                ]
                .join("\n"),
            ]
            .join("\n\n");
            ctx.reply(chat_id, text).await?;
            Ok(())
        }
        Err(CatalogError::Store(e)) => report_store_error(ctx, chat_id, &e).await,
        Err(e) => {
            warn!(user_id = %sender.id, error = %e, "Catalog changed during edit");
            ctx.reply(chat_id, t("edit-state-error")).await?;
            Ok(())
        }
    }
}

async fn handle_contact_input(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    source: Option<String>,
    text: &str,
) -> Result<()> {
    let contact = match validate_text(text) {
        Ok(contact) if contact != WRITE_CONTACT => contact,
        _ => {
            ctx.reply_with(chat_id, contact_prompt(), lead_contact_keyboard())
                .await?;
            return Ok(());
        }
    };

    let lead = Lead {
        ts: msk_now().to_rfc3339(),
        user_id: sender.id.0,
        username: sender.username.clone(),
        name: sender.full_name.clone(),
        contact_text: contact,
        source,
    };

    let result = Leads::new(&ctx.store).append(lead.clone()).await;
    ctx.clear_session(sender.id).await?;
    if let Err(e) = result {
        return report_store_error(ctx, chat_id, &e).await;
    }

    info!(user_id = %sender.id, source = ?lead.source, "Lead captured");
    notify_admins(ctx, &lead).await;

    ctx.reply_with(
        chat_id,
        format!("{}\n\n{}", t("lead-thanks"), t("lead-thanks-followup")),
        main_menu_keyboard(),
    )
    .await?;
    Ok(())
}

/// Tell every administrator about a new lead. Failed deliveries are logged
/// and skipped.
async fn notify_admins(ctx: &BotContext, lead: &Lead) {
    let mut text = format!(
        "{}\n\n<b>{}:</b> {}\n<b>{}:</b> {}",
        t("lead-notification-title"),
        t("label-who"),
        describe_person(&lead.name, lead.username.as_deref(), lead.user_id),
        t("label-contact"),
        html::escape(&lead.contact_text),
    );
    if let Some(source) = &lead.source {
        text.push_str(&format!(
            "\n<b>{}:</b> {}",
            t("label-source"),
            html::escape(source)
        ));
    }

    let mut admins: Vec<u64> = ctx.settings.admin_ids.iter().copied().collect();
    admins.sort_unstable();

    for admin_id in admins {
        if let Err(e) = ctx.gateway.send(ChatId(admin_id as i64), text.clone(), None).await {
            warn!(admin_id, error = %e, "Failed to notify admin about lead");
        }
    }
}
