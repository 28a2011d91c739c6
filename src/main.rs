// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, stores)
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

use crate::core::triggers::{DispatchConfig, DispatchEngine, TriggerService};
use crate::discord::{trigger_handler, Data, Error};
use crate::infra::triggers::{NoopImageTextReader, SqliteTriggerStore};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
/// New and edited messages both flow into the trigger engine; the engine
/// decides per trigger whether edits count.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) =
                trigger_handler::handle_message(ctx, framework, new_message, data, false).await
            {
                tracing::error!("Error handling message for triggers: {e}");
            }
        }
        serenity::FullEvent::MessageUpdate {
            old_if_available: _,
            new,
            event: _,
        } => {
            if let Some(updated) = new {
                if let Err(e) =
                    trigger_handler::handle_message(ctx, framework, updated, data, true).await
                {
                    tracing::error!("Error handling edited message for triggers: {e}");
                }
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
    let db_path = std::env::var("TRIGGER_DB_PATH")
        .unwrap_or_else(|_| format!("{data_dir}/triggers.db"));

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{db_path}?mode=rwc"))
        .await
        .expect("Failed to connect to trigger DB");
    let store = SqliteTriggerStore::new(pool);
    store.migrate().await.expect("Failed to migrate trigger DB");

    let triggers = Arc::new(TriggerService::new(store));
    let dispatch = Arc::new(DispatchEngine::new(
        Arc::clone(&triggers),
        Arc::new(NoopImageTextReader),
        DispatchConfig::default(),
    ));

    let data = Data { triggers, dispatch };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![discord::commands::triggers::trigger()],
            // Prefix invocations are kept alive so command/mock responses can
            // re-dispatch through the text pipeline.
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(discord::COMMAND_PREFIX.to_string()),
                ..Default::default()
            },
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                // Register slash commands globally (can take up to an hour to
                // propagate); use register_in_guild for faster development.
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered, bot is ready");
                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
