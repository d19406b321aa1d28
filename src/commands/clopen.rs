//! Administration of the scheduled open/close channel.

use crate::clopen::{
    ChannelState, ClopenSettings, DailySchedule, DEFAULT_EMOJI, DEFAULT_THRESHOLD,
};
use crate::commands::{reply_lang, send_notice, COLOR_INFO};
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

/// Manage this server's scheduled open/close channel.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("setup", "status", "disable"),
    check = "crate::commands::ensure_admin"
)]
pub async fn clopen(context: Context<'_>) -> Result<(), Error> {
    // Bare `.clopen` on the prefix surface falls through to the status view.
    show_status(context).await
}

/// Configure the managed channel and its daily schedule.
#[poise::command(slash_command, prefix_command)]
pub async fn setup(
    context: Context<'_>,
    #[description = "Channel to open and close"] channel: serenity::GuildChannel,
    #[description = "Daily opening time, HH:MM UTC"] open: String,
    #[description = "Daily closing time, HH:MM UTC"] close: String,
    #[description = "Reactions needed to close early"]
    #[min = 1]
    threshold: Option<u32>,
    #[description = "Emoji counted as a close vote"] emoji: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = context.guild_id().map(|g| g.get()) else {
        return Ok(());
    };
    let lang = reply_lang(&context).await;

    let schedule = match DailySchedule::parse(&open, &close) {
        Ok(schedule) => schedule,
        Err(error) => return send_notice(context, error.to_string()).await,
    };

    let settings = ClopenSettings {
        guild_id,
        channel_id: channel.id.get(),
        schedule,
        threshold: threshold.unwrap_or(DEFAULT_THRESHOLD),
        emoji: emoji
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
    };

    match context.data().clopen.configure(settings).await {
        Ok(()) => {
            context.say(lang.clopen_saved()).await?;
            Ok(())
        }
        Err(error) => send_notice(context, error.to_string()).await,
    }
}

/// Show the managed channel's current state and schedule.
#[poise::command(slash_command, prefix_command)]
pub async fn status(context: Context<'_>) -> Result<(), Error> {
    show_status(context).await
}

/// Stop managing this server's channel.
#[poise::command(slash_command, prefix_command)]
pub async fn disable(context: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = context.guild_id().map(|g| g.get()) else {
        return Ok(());
    };
    let lang = reply_lang(&context).await;

    if context.data().clopen.remove(guild_id).await? {
        context.say(lang.clopen_removed()).await?;
        Ok(())
    } else {
        send_notice(context, lang.clopen_missing()).await
    }
}

async fn show_status(context: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = context.guild_id().map(|g| g.get()) else {
        return Ok(());
    };
    let lang = reply_lang(&context).await;

    let Some(status) = context.data().clopen.status(guild_id).await? else {
        return send_notice(context, lang.clopen_missing()).await;
    };

    let state = match status.state {
        ChannelState::Open => lang.state_open(),
        ChannelState::Closed => lang.state_closed(),
        ChannelState::PendingClose => lang.state_pending_close(),
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(lang.clopen_status_title())
        .description(format!("<#{}>", status.channel_id))
        .colour(serenity::Colour::new(COLOR_INFO))
        .field(lang.label_state(), state, true)
        .field(lang.label_opens(), status.open_time, true)
        .field(lang.label_closes(), status.close_time, true)
        .field(
            lang.label_votes(),
            format!("{}/{} {}", status.votes, status.threshold, status.emoji),
            true,
        );
    if let Some(next_change) = status.next_change {
        embed = embed.field(
            lang.label_next_change(),
            next_change.format("%Y-%m-%d %H:%M").to_string(),
            true,
        );
    }

    context.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
