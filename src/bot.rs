//! Framework wiring: configuration, persistence, gateway client and the
//! background tasks that live for the whole process.

use crate::clopen::{self, ClopenHandle, ClopenRegistry};
use crate::commands;
use crate::config::Config;
use crate::discord::{self, SerenityGate};
use crate::health;
use crate::lang::LanguageStore;
use crate::store::{self, GuildStore};
use crate::types::{Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;

    store::init_db(&config.db_path).await?;
    let guild_store = GuildStore::new(config.db_path.clone());

    health::spawn(config.http_port, config.external_url.clone()).await?;

    let rows = guild_store.load_clopen_rows().await?;
    let registry = ClopenRegistry::from_rows(rows);
    tracing::info!(guilds = registry.len(), "Loaded clopen configurations");

    let languages = Arc::new(LanguageStore::new(guild_store.clone()));
    let http_client = reqwest::Client::new();
    let api_base_url = config.api_base_url.clone();
    let command_prefix = config.command_prefix.clone();

    // Prefix commands and the builder-reply renderer need message content;
    // the clopen manager needs reactions. Everything else is non-privileged.
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::help(),
                commands::equipment(),
                commands::weapon(),
                commands::talent(),
                commands::mantra(),
                commands::outfit(),
                commands::kit(),
                commands::ehp(),
                commands::language(),
                commands::clopen(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(discord::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |context, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(context, &framework.options().commands).await?;
                tracing::info!(user = %ready.user.name, "Bot connected");

                let gate = Arc::new(SerenityGate::new(context.http.clone()));
                let clopen =
                    ClopenHandle::spawn(registry, guild_store, gate, clopen::TICK_INTERVAL);

                Ok(Data {
                    http_client,
                    api_base_url,
                    command_prefix,
                    languages,
                    clopen,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    client.start().await?;

    Ok(())
}
