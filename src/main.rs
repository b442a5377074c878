use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::MaybeInaccessibleMessage;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dairybot::bot::{handle_callback, handle_channel_post, handle_text, BotContext, Command, Sender};
use dairybot::config::Settings;
use dairybot::localization::init_localization;
use dairybot::storage::DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging; `log` records from the store and teloxide are bridged in
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting dairy union Telegram bot");

    init_localization()?;
    let settings = Settings::from_env().context("Invalid configuration")?;
    info!(
        data_dir = %settings.data_dir.display(),
        admins = settings.admin_ids.len(),
        digest_channel = settings.digest_channel_id,
        "Configuration loaded"
    );

    let store = DocumentStore::open(settings.data_dir.clone());
    let bot = Bot::new(settings.bot_token.clone());

    let me = bot.get_me().await.context("Failed to reach Telegram")?;
    let username = me.user.username.clone().unwrap_or_default();
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let ctx = Arc::new(
        BotContext::new(settings, store, Arc::new(bot.clone())).with_bot_username(username),
    );

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback_query))
        .branch(Update::filter_channel_post().endpoint(on_channel_post));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn on_message(msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    handle_text(&ctx, &Sender::from(user), msg.chat.id, text).await
}

async fn on_callback_query(q: CallbackQuery, ctx: Arc<BotContext>) -> Result<()> {
    let sender = Sender::from(&q.from);
    let (chat_id, message_id) = match &q.message {
        Some(MaybeInaccessibleMessage::Regular(message)) => (message.chat.id, Some(message.id)),
        Some(message) => (message.chat().id, None),
        None => (ChatId(q.from.id.0 as i64), None),
    };
    let data = q.data.as_deref().unwrap_or_default();

    handle_callback(&ctx, &sender, chat_id, message_id, &q.id.0, data).await
}

async fn on_channel_post(msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let text = msg.text().or_else(|| msg.caption());
    handle_channel_post(&ctx, msg.chat.id, msg.id, text).await
}
