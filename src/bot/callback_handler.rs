//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{debug, warn};

// Import localization
use crate::localization::t;

// Import dialogue types
use crate::catalog::Catalog;
use crate::dialogue::DialogueState;
use crate::token::ADMIN_TOKENS;

use super::actions::{Action, ActionParseError, AdminFlow};
use super::context::{BotContext, Sender};
use super::dialogue_manager::{self, report_store_error};
use super::sections;

/// Handle a button press.
///
/// `chat_id` is the chat the button was pressed in and `message_id` the
/// message carrying it, when Telegram still gives access to it. Every handled
/// action is acknowledged exactly once; data of an unknown namespace is left
/// alone.
pub async fn handle_callback(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    action_id: &str,
    data: &str,
) -> Result<()> {
    debug!(user_id = %sender.id, data, "Received callback query from user");

    let action = match Action::parse(data) {
        Ok(action) => action,
        Err(ActionParseError::UnknownNamespace) => {
            debug!(user_id = %sender.id, data, "Ignoring callback of unknown namespace");
            return Ok(());
        }
        Err(e @ ActionParseError::Malformed(_)) => {
            warn!(user_id = %sender.id, data, error = %e, "Malformed callback data");
            ctx.gateway
                .acknowledge(action_id, Some(t("toast-navigation-error")))
                .await?;
            return Ok(());
        }
    };

    match action {
        Action::Navigate { token, index } => {
            sections::navigate(ctx, chat_id, message_id, action_id, &token, index).await
        }
        Action::AdminCategory { .. } | Action::AdminNewCategory | Action::AdminField(_) | Action::Cancel => {
            handle_admin_action(ctx, sender, chat_id, action_id, action).await
        }
        action => {
            ctx.gateway.acknowledge(action_id, None).await?;
            handle_public_action(ctx, sender, chat_id, action).await
        }
    }
}

/// Browsing actions; the callback is already acknowledged
async fn handle_public_action(ctx: &BotContext, sender: &Sender, chat_id: ChatId, action: Action) -> Result<()> {
    match action {
        Action::BrowseMenu | Action::ServicesMenu | Action::CoursesMenu => {
            sections::show_main_menu(ctx, chat_id).await
        }
        Action::BrowseCategories => sections::show_symptom_categories(ctx, chat_id).await,
        Action::BrowseCategory(token) => sections::open_category(ctx, chat_id, &token).await,
        Action::ServicesBack => sections::show_services_root(ctx, chat_id).await,
        Action::ServiceGroup(group) => sections::show_service_group(ctx, chat_id, group).await,
        Action::Service(id) => sections::show_service(ctx, chat_id, &id).await,
        Action::CoursesBack => sections::show_courses(ctx, chat_id).await,
        Action::Course(id) => sections::show_course(ctx, chat_id, &id).await,
        Action::LeadStart { source } => dialogue_manager::start_lead(ctx, sender, chat_id, source).await,
        Action::Navigate { .. }
        | Action::AdminCategory { .. }
        | Action::AdminNewCategory
        | Action::AdminField(_)
        | Action::Cancel => Ok(()),
    }
}

/// Whether a category keyboard of `flow` belongs to the session's current step
fn accepts_category(flow: AdminFlow, state: &DialogueState) -> bool {
    match flow {
        AdminFlow::Add => matches!(
            state,
            DialogueState::AddChoosingCategory | DialogueState::AddAwaitingCategory
        ),
        AdminFlow::Delete => matches!(
            state,
            DialogueState::DeleteChoosingCategory | DialogueState::DeleteAwaitingIndex { .. }
        ),
        AdminFlow::Edit => matches!(
            state,
            DialogueState::EditChoosingCategory | DialogueState::EditAwaitingIndex { .. }
        ),
    }
}

async fn handle_admin_action(
    ctx: &BotContext,
    sender: &Sender,
    chat_id: ChatId,
    action_id: &str,
    action: Action,
) -> Result<()> {
    if !ctx.is_admin(sender.id) {
        debug!(user_id = %sender.id, "Ignoring admin callback from non-admin");
        ctx.gateway.acknowledge(action_id, None).await?;
        return Ok(());
    }

    let state = ctx.session_state(sender.id).await?;

    match action {
        Action::Cancel => {
            ctx.gateway
                .acknowledge(action_id, Some(t("toast-cancelled")))
                .await?;
            dialogue_manager::cancel(ctx, sender, chat_id).await?;
            Ok(())
        }
        Action::AdminNewCategory if accepts_category(AdminFlow::Add, &state) => {
            ctx.gateway.acknowledge(action_id, Some(t("toast-ok"))).await?;
            dialogue_manager::choose_new_category(ctx, sender, chat_id).await
        }
        Action::AdminCategory { flow, token } if accepts_category(flow, &state) => {
            let categories = match Catalog::new(&ctx.store).categories() {
                Ok(categories) => categories,
                Err(e) => {
                    ctx.gateway.acknowledge(action_id, None).await?;
                    return report_store_error(ctx, chat_id, &e).await;
                }
            };

            let category = ADMIN_TOKENS
                .decode(categories.iter().map(String::as_str), &token)
                .map(str::to_string);
            match category {
                Some(category) => {
                    ctx.gateway.acknowledge(action_id, Some(t("toast-ok"))).await?;
                    dialogue_manager::choose_category(ctx, sender, chat_id, flow, category).await
                }
                None => {
                    debug!(user_id = %sender.id, token = %token, "Admin token matches no category");
                    ctx.gateway
                        .acknowledge(action_id, Some(t("toast-category-not-found")))
                        .await?;
                    ctx.clear_session(sender.id).await?;
                    ctx.reply(chat_id, t("category-not-found")).await?;
                    Ok(())
                }
            }
        }
        Action::AdminField(field) => match state {
            DialogueState::EditAwaitingField { category, index } => {
                ctx.gateway.acknowledge(action_id, Some(t("toast-ok"))).await?;
                dialogue_manager::choose_field(ctx, sender, chat_id, category, index, field).await
            }
            _ => acknowledge_outdated(ctx, sender, action_id).await,
        },
        _ => acknowledge_outdated(ctx, sender, action_id).await,
    }
}

/// A button of a step the session is no longer at
async fn acknowledge_outdated(ctx: &BotContext, sender: &Sender, action_id: &str) -> Result<()> {
    debug!(user_id = %sender.id, "Outdated admin button pressed");
    ctx.gateway
        .acknowledge(action_id, Some(t("toast-outdated")))
        .await?;
    Ok(())
}
