// Entry point of the chain bot.
//
// **Architecture Overview:**
// - `core/` = Chain interpreter, dispatchers, mods (platform-agnostic)
// - `infra/` = Implementations of core traits (JSON files on disk)
// - `discord/` = Discord-specific adapters (events, outbound messages)
//
// This file's job is to:
// 1. Load configuration from the data directory
// 2. Build the bot context (dependency injection)
// 3. Set up the Discord framework
// 4. Run until the host or the user asks us to stop

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::context::{BotContext, Ports, TracingSpamGuard};
use crate::core::dispatch::GuildInitScheduler;
use crate::core::mods::builtin_mods;
use crate::discord::events::event_handler;
use crate::discord::gateway::DiscordGateway;
use crate::discord::lifecycle::wait_for_stop;
use crate::discord::{Data, Error};
use crate::infra::config::{load_config, DataLayout};
use crate::infra::users::JsonUserStore;
use crate::infra::variables::JsonVariableStore;
use dashmap::DashSet;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

const DEFAULT_DATA_DIR: &str = "BotData";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let data_dir = std::env::var("BOT_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let layout = DataLayout::new(&data_dir);
    let config = load_config(&layout)?;
    let token = config.settings.token.clone();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let http = Arc::new(serenity::Http::new(&token));
    let ports = Ports {
        gateway: Arc::new(DiscordGateway::new(Arc::clone(&http))),
        spam_guard: Arc::new(TracingSpamGuard),
        variables: Arc::new(JsonVariableStore::new(
            layout.server_vars(),
            layout.global_vars(),
        )),
        users: Arc::new(JsonUserStore::new(layout.user_file())),
    };

    let bot = Arc::new(BotContext::load(config, ports).await);
    let loaded = bot.register_mods(builtin_mods::manifest());
    tracing::info!(mods = loaded, data_dir = %data_dir, "Bot context ready");

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MODERATION; // Ban events

    let data_bot = Arc::clone(&bot);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Commands come from commands.json and are parsed by the core,
            // not registered as slash commands.
            commands: Vec::<poise::Command<Data, Error>>::new(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |_ctx, _ready, _framework| {
            Box::pin(async move {
                tracing::info!("Framework ready");
                Ok(Data {
                    bot: data_bot,
                    expected_guilds: Arc::new(DashSet::new()),
                    guild_init: Arc::new(GuildInitScheduler::default()),
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;
    let shard_manager = client.shard_manager.clone();

    // A failed login leaves the process idle until it is told to stop.
    tokio::spawn(async move {
        if let Err(e) = client.start().await {
            tracing::error!("Discord client stopped: {e}");
        }
    });

    let reason = wait_for_stop().await;
    tracing::info!(?reason, "Shutting down");
    shard_manager.shutdown_all().await;
    bot.persist().await;

    std::process::exit(0);
}
