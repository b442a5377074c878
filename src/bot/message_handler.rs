//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, warn};

// Import localization
use crate::localization::t;

// Import dialogue types
use crate::dialogue::DialogueState;
use crate::subscribers::Subscribers;

use super::actions::AdminFlow;
use super::admin_commands;
use super::context::{BotContext, Sender};
use super::dialogue_manager;
use super::sections;
use super::ui_builder::{main_menu_keyboard, MenuButton};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Команды бота:")]
pub enum Command {
    #[command(description = "начать и подписаться на дайджест")]
    Start,
    #[command(description = "главное меню")]
    Menu,
    #[command(description = "админ-панель")]
    Admin,
    #[command(description = "отмена текущего действия")]
    Cancel,
    #[command(description = "добавить карточку")]
    AddSymptom,
    #[command(description = "список категорий")]
    ListSymptoms,
    #[command(description = "удалить карточку по номеру")]
    DelSymptom,
    #[command(description = "редактировать заголовок или текст")]
    EditSymptom,
    #[command(description = "последние заявки, например /list_leads 20")]
    ListLeads(String),
    #[command(description = "очистить заявки")]
    ClearLeads,
    #[command(description = "состояние дайджеста")]
    DigestStatus,
    #[command(description = "предпросмотр дайджеста")]
    DigestPreview,
    #[command(description = "разослать дайджест")]
    DigestBroadcast,
    #[command(description = "очистить пункты дайджеста")]
    DigestClear,
}

impl Command {
    /// Commands only administrators may run
    pub fn is_admin_only(&self) -> bool {
        !matches!(self, Command::Start | Command::Menu | Command::Cancel)
    }
}

/// Handle a text message from a private chat
pub async fn handle_text(ctx: &BotContext, sender: &Sender, chat_id: ChatId, text: &str) -> Result<()> {
    let text = text.trim();

    if text.starts_with('/') {
        if let Ok(command) = Command::parse(text, &ctx.bot_username) {
            return handle_command(ctx, sender, chat_id, command).await;
        }
    }

    if let Some(button) = MenuButton::parse(text) {
        return handle_menu_button(ctx, sender, chat_id, button).await;
    }

    let state = ctx.session_state(sender.id).await?;
    if state != DialogueState::Idle {
        return dialogue_manager::handle_input(ctx, sender, chat_id, state, text).await;
    }

    debug!(user_id = %sender.id, "Text outside of any flow");
    ctx.reply_with(chat_id, t("use-menu"), main_menu_keyboard()).await?;
    Ok(())
}

/// Main keyboard buttons navigate away from whatever flow was active
async fn handle_menu_button(ctx: &BotContext, sender: &Sender, chat_id: ChatId, button: MenuButton) -> Result<()> {
    debug!(user_id = %sender.id, ?button, "Menu button pressed");

    if button == MenuButton::Lead {
        return dialogue_manager::start_lead(ctx, sender, chat_id, None).await;
    }

    ctx.clear_session(sender.id).await?;
    match button {
        MenuButton::Symptoms => sections::show_symptom_categories(ctx, chat_id).await,
        MenuButton::Courses => sections::show_courses(ctx, chat_id).await,
        MenuButton::Services => sections::show_services_root(ctx, chat_id).await,
        MenuButton::Menu | MenuButton::Lead => sections::show_main_menu(ctx, chat_id).await,
    }
}

async fn handle_command(ctx: &BotContext, sender: &Sender, chat_id: ChatId, command: Command) -> Result<()> {
    debug!(user_id = %sender.id, ?command, "Command received");

    if command.is_admin_only() && !ctx.is_admin(sender.id) {
        debug!(user_id = %sender.id, "Ignoring admin command from non-admin");
        return Ok(());
    }

    match command {
        Command::Start => {
            ctx.clear_session(sender.id).await?;
            if let Err(e) = Subscribers::new(&ctx.store).add(sender.id.0).await {
                warn!(user_id = %sender.id, error = %e, "Failed to record subscriber");
            }
            let welcome = [t("welcome-hello"), t("welcome-about"), t("welcome-choose")].join("\n\n");
            ctx.reply_with(chat_id, welcome, main_menu_keyboard()).await?;
            Ok(())
        }
        Command::Menu => {
            ctx.clear_session(sender.id).await?;
            sections::show_main_menu(ctx, chat_id).await
        }
        Command::Cancel => {
            dialogue_manager::cancel(ctx, sender, chat_id).await?;
            Ok(())
        }
        Command::Admin => admin_commands::admin_help(ctx, chat_id).await,
        Command::AddSymptom => dialogue_manager::start_admin_flow(ctx, sender, chat_id, AdminFlow::Add).await,
        Command::DelSymptom => dialogue_manager::start_admin_flow(ctx, sender, chat_id, AdminFlow::Delete).await,
        Command::EditSymptom => dialogue_manager::start_admin_flow(ctx, sender, chat_id, AdminFlow::Edit).await,
        Command::ListSymptoms => admin_commands::list_symptoms(ctx, chat_id).await,
        Command::ListLeads(arg) => admin_commands::list_leads(ctx, chat_id, &arg).await,
        Command::ClearLeads => admin_commands::clear_leads(ctx, chat_id).await,
        Command::DigestStatus => admin_commands::digest_status(ctx, chat_id).await,
        Command::DigestPreview => admin_commands::digest_preview(ctx, chat_id).await,
        Command::DigestBroadcast => admin_commands::digest_broadcast(ctx, chat_id).await,
        Command::DigestClear => admin_commands::digest_clear(ctx, chat_id).await,
    }
}
