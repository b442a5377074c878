//! Public browsing sections: symptom cards, services and courses

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::content::{Content, AUDIT_GROUP, SUPPORT_GROUP};
use crate::localization::t;
use crate::token::BROWSE_TOKENS;

use super::actions::ServiceGroup;
use super::context::BotContext;
use super::dialogue_manager::report_store_error;
use super::ui_builder::{
    article_nav_keyboard, categories_keyboard, course_keyboard, courses_list_keyboard, main_menu_keyboard,
    render_article, render_course, render_service, service_lead_keyboard, services_list_keyboard,
    services_root_keyboard, wide,
};

pub async fn show_main_menu(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    ctx.reply_with(chat_id, t("main-menu"), main_menu_keyboard()).await?;
    Ok(())
}

/// Category list of "Симптомы и решения"
pub async fn show_symptom_categories(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    let categories = match Catalog::new(&ctx.store).categories() {
        Ok(categories) => categories,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    if categories.is_empty() {
        ctx.reply_with(chat_id, t("symptoms-empty"), main_menu_keyboard())
            .await?;
        return Ok(());
    }

    ctx.reply_with(chat_id, t("choose-category"), categories_keyboard(&categories))
        .await?;
    Ok(())
}

/// First card of the category behind a browse token
pub async fn open_category(ctx: &BotContext, chat_id: ChatId, token: &str) -> Result<()> {
    let mut catalog = match Catalog::new(&ctx.store).snapshot() {
        Ok(catalog) => catalog,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    let category = match BROWSE_TOKENS.decode(catalog.keys().map(String::as_str), token) {
        Some(category) => category.to_string(),
        None => {
            debug!(token, "Browse token matches no category");
            ctx.reply(chat_id, t("category-not-found")).await?;
            return Ok(());
        }
    };

    let articles = catalog.remove(&category).unwrap_or_default();
    match articles.first() {
        Some(first) => {
            ctx.reply_with(
                chat_id,
                render_article(first, 0, articles.len()),
                article_nav_keyboard(&category, 0, articles.len()),
            )
            .await?;
        }
        None => {
            ctx.reply(chat_id, t("category-no-cards")).await?;
        }
    }
    Ok(())
}

/// Show card `index` of a category, editing the message the button sits on.
///
/// This acknowledges the callback itself so a missing card can be reported
/// with a toast.
pub async fn navigate(
    ctx: &BotContext,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    action_id: &str,
    token: &str,
    index: usize,
) -> Result<()> {
    let mut catalog = match Catalog::new(&ctx.store).snapshot() {
        Ok(catalog) => catalog,
        Err(e) => {
            ctx.gateway.acknowledge(action_id, None).await?;
            return report_store_error(ctx, chat_id, &e).await;
        }
    };

    let category = match BROWSE_TOKENS.decode(catalog.keys().map(String::as_str), token) {
        Some(category) => category.to_string(),
        None => {
            ctx.gateway.acknowledge(action_id, None).await?;
            ctx.reply(chat_id, t("category-not-found")).await?;
            return Ok(());
        }
    };

    let articles = catalog.remove(&category).unwrap_or_default();
    let Some(article) = articles.get(index) else {
        ctx.gateway
            .acknowledge(action_id, Some(t("toast-card-not-found")))
            .await?;
        return Ok(());
    };

    ctx.gateway.acknowledge(action_id, None).await?;

    let text = render_article(article, index, articles.len());
    let keyboard = article_nav_keyboard(&category, index, articles.len());

    if let Some(message_id) = message_id {
        match ctx
            .gateway
            .edit(chat_id, message_id, text.clone(), Some(keyboard.clone()))
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) => warn!(chat_id = %chat_id, error = %e, "Edit failed, sending the card anew"),
        }
    }

    ctx.reply_with(chat_id, text, keyboard).await?;
    Ok(())
}

pub async fn show_services_root(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    ctx.reply_with(chat_id, t("choose-direction"), services_root_keyboard())
        .await?;
    Ok(())
}

pub async fn show_service_group(ctx: &BotContext, chat_id: ChatId, group: ServiceGroup) -> Result<()> {
    let (key, empty_key, prompt) = match group {
        ServiceGroup::Audit => (AUDIT_GROUP, "audits-empty", t("choose-audit")),
        ServiceGroup::Support => (SUPPORT_GROUP, "support-empty", wide(t("choose-support"))),
    };

    let services = match Content::new(&ctx.store).services_in_group(key) {
        Ok(services) => services,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    if services.is_empty() {
        ctx.reply(chat_id, t(empty_key)).await?;
        return Ok(());
    }

    ctx.reply_with(chat_id, prompt, services_list_keyboard(&services))
        .await?;
    Ok(())
}

/// Service card followed by a lead offer
pub async fn show_service(ctx: &BotContext, chat_id: ChatId, service_id: &str) -> Result<()> {
    let service = match Content::new(&ctx.store).service(service_id) {
        Ok(Some(service)) => service,
        Ok(None) => {
            ctx.reply(chat_id, t("service-not-found")).await?;
            return Ok(());
        }
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    ctx.reply(chat_id, render_service(&service)).await?;
    ctx.reply_with(chat_id, t("service-lead-offer"), service_lead_keyboard(service_id))
        .await?;
    Ok(())
}

pub async fn show_courses(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    let courses = match Content::new(&ctx.store).courses() {
        Ok(courses) => courses,
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    };

    if courses.is_empty() {
        ctx.reply_with(chat_id, t("courses-empty"), main_menu_keyboard())
            .await?;
        return Ok(());
    }

    ctx.reply_with(chat_id, wide(t("choose-course")), courses_list_keyboard(&courses))
        .await?;
    Ok(())
}

pub async fn show_course(ctx: &BotContext, chat_id: ChatId, course_id: &str) -> Result<()> {
    match Content::new(&ctx.store).course(course_id) {
        Ok(Some(course)) => {
            ctx.reply_with(chat_id, render_course(&course), course_keyboard(course_id))
                .await?;
        }
        Ok(None) => {
            ctx.reply(chat_id, t("course-not-found")).await?;
        }
        Err(e) => return report_store_error(ctx, chat_id, &e).await,
    }
    Ok(())
}
