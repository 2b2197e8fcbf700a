// This is the entry point of the moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::antiraid::{RaidConfig, RaidGuard};
use crate::core::moderation::{AbuseEngine, ModerationConfig};
use crate::discord::{abuse_handler, commands, raid_handler, Data, Error};
use crate::infra::moderation::SqliteRecordSink;
use poise::serenity_prelude as serenity;
use serde::Deserialize;
use std::sync::Arc;

/// On-disk configuration: moderation thresholds plus the raid guard.
/// Every field is optional; anything missing or out of range falls back
/// to the documented defaults at load time.
#[derive(Debug, Default, Deserialize)]
struct WardenConfig {
    #[serde(flatten)]
    moderation: ModerationConfig,
    #[serde(default)]
    antiraid: RaidConfig,
}

fn load_config() -> WardenConfig {
    let path =
        std::env::var("WARDEN_CONFIG").unwrap_or_else(|_| "data/moderation.json".to_string());

    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<WardenConfig>(&raw) {
            Ok(cfg) => {
                tracing::info!(path, "loaded moderation config");
                cfg
            }
            Err(e) => {
                tracing::warn!(path, "config unparsable ({}); using defaults", e);
                WardenConfig::default()
            }
        },
        Err(_) => {
            tracing::info!(path, "no config file; using defaults");
            WardenConfig::default()
        }
    }
}

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            match abuse_handler::handle_message(ctx, new_message, data).await {
                Ok(true) => {
                    tracing::debug!(message_id = new_message.id.get(), "message enforced");
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Error handling message for abuse: {}", e);
                }
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = raid_handler::handle_member_join(ctx, new_member, data).await {
                tracing::error!("Error handling member join: {}", e);
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory for SQLite files");
    let records_db_path = format!("{}/records.db", data_dir);

    let config = load_config();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", records_db_path))
        .await
        .expect("Failed to connect to records DB");
    let records = SqliteRecordSink::new(pool);
    records.migrate().await.expect("Failed to migrate records DB");
    let records = Arc::new(records);

    let engine = Arc::new(AbuseEngine::new(config.moderation));
    let raid = Arc::new(RaidGuard::new(config.antiraid));

    let alert_channel_id = std::env::var("ALERT_CHANNEL_ID")
        .ok()
        .and_then(|v| v.parse::<u64>().ok());

    let data = Data {
        engine,
        raid,
        records,
        alert_channel_id,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::automod(),
                commands::raid(),
                commands::clear_strikes(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered, bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
