//! Gateway event fan-out and the Discord side of the clopen channel gate.

use crate::clopen::ChannelGate;
use crate::commands;
use crate::deepwoken;
use crate::error::{DeepdexError, Result};
use crate::types::{Data, Error};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Applies clopen transitions through the Discord REST API. Closing a
/// channel denies Send Messages for @everyone; opening removes the
/// overwrite again.
pub struct SerenityGate {
    http: Arc<serenity::Http>,
}

impl SerenityGate {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChannelGate for SerenityGate {
    async fn set_closed(&self, guild_id: u64, channel_id: u64, closed: bool) -> Result<()> {
        let channel = serenity::ChannelId::new(channel_id);
        // The @everyone role id equals the guild id.
        let everyone = serenity::model::id::RoleId::new(guild_id);

        let result = if closed {
            channel
                .create_permission(
                    &self.http,
                    serenity::PermissionOverwrite {
                        allow: serenity::Permissions::empty(),
                        deny: serenity::Permissions::SEND_MESSAGES,
                        kind: serenity::PermissionOverwriteType::Role(everyone),
                    },
                )
                .await
        } else {
            channel
                .delete_permission(&self.http, serenity::PermissionOverwriteType::Role(everyone))
                .await
        };
        result.map_err(|e| DeepdexError::Discord(e.to_string()))
    }

    async fn announce(&self, channel_id: u64, message: &str) -> Result<()> {
        serenity::ChannelId::new(channel_id)
            .say(&self.http, message)
            .await
            .map(|_| ())
            .map_err(|e| DeepdexError::Discord(e.to_string()))
    }
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> std::result::Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!(user = %data_about_bot.user.name, "Gateway session ready");
        }
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot {
                return Ok(());
            }
            data.clopen
                .on_message(
                    new_message.channel_id.get(),
                    new_message.id.get(),
                    new_message.content.clone(),
                )
                .await;

            // A plain reply to a message carrying a builder link gets the
            // same breakdown as /ehp. Prefix commands go through poise.
            if !new_message.content.starts_with(&data.command_prefix) {
                handle_builder_reply(ctx, data, new_message).await;
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            let Some(user_id) = add_reaction.user_id else {
                return Ok(());
            };
            if user_id == framework.bot_id {
                return Ok(());
            }
            data.clopen
                .on_reaction(
                    add_reaction.channel_id.get(),
                    add_reaction.message_id.get(),
                    user_id.get(),
                    add_reaction.emoji.to_string(),
                )
                .await;
        }
        _ => {}
    }
    Ok(())
}

async fn handle_builder_reply(ctx: &serenity::Context, data: &Data, message: &serenity::Message) {
    let Some(replied) = message.referenced_message.as_deref() else {
        return;
    };
    let Some(build_id) = deepwoken::find_build_link(&replied.content) else {
        return;
    };

    let reply = match deepwoken::fetch_build(&data.http_client, &data.api_base_url, &build_id).await
    {
        Ok(Some(build)) => commands::ehp::render_build_breakdown(&build, 0, None).await,
        Ok(None) => {
            tracing::debug!(%build_id, "Replied builder link no longer resolves");
            return;
        }
        Err(error) => {
            tracing::warn!(%error, %build_id, "Build fetch failed for reply render");
            Err(error)
        }
    };

    let lang = data.languages.get(message.guild_id.map(|g| g.get())).await;
    let send = match reply {
        Ok(breakdown) => {
            message
                .channel_id
                .send_message(
                    &ctx.http,
                    serenity::CreateMessage::new()
                        .embed(breakdown.embed)
                        .add_file(breakdown.attachment)
                        .reference_message(message),
                )
                .await
        }
        Err(_) => {
            message
                .channel_id
                .send_message(
                    &ctx.http,
                    serenity::CreateMessage::new()
                        .embed(commands::ehp::load_failed_embed(lang))
                        .reference_message(message),
                )
                .await
        }
    };
    if let Err(error) = send {
        tracing::debug!(%error, "Could not send breakdown reply");
    }
}
