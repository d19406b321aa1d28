//! Discord bot commands.
//!
//! Every command is registered on both surfaces (prefix and slash) and runs
//! through the same handler, so the two surfaces format responses
//! identically. The helpers here are the shared notice path and the
//! administrator check used by the management commands.

pub mod clopen;
pub mod ehp;
pub mod help;
pub mod kit;
pub mod language;
pub mod lookup;

pub use clopen::clopen;
pub use ehp::ehp;
pub use help::help;
pub use kit::kit;
pub use language::language;
pub use lookup::{equipment, mantra, outfit, talent, weapon};

use crate::lang::Lang;
use crate::types::{Context, Error};
use std::time::Duration;

/// How long transient notices stay visible on the prefix surface.
const NOTICE_TTL: Duration = Duration::from_secs(10);

/// Embed accent used for informational responses.
pub(crate) const COLOR_INFO: u32 = 0x5865F2;
/// Embed accent used for failures.
pub(crate) const COLOR_ERROR: u32 = 0xED4245;

/// Sends a transient notice: ephemeral on the slash surface; on the prefix
/// surface the notice and the triggering message are deleted after a short
/// delay. Delete failures mean someone beat us to it and are swallowed.
pub(crate) async fn send_notice(context: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    let text = text.into();
    match context {
        Context::Application(_) => {
            context
                .send(poise::CreateReply::default().content(text).ephemeral(true))
                .await?;
        }
        Context::Prefix(prefix) => {
            let sent = context.say(text).await?;
            let reply = sent.into_message().await?;
            let trigger = prefix.msg.clone();
            let http = context.serenity_context().http.clone();
            tokio::spawn(async move {
                tokio::time::sleep(NOTICE_TTL).await;
                let _ = reply.delete(&http).await;
                let _ = trigger.delete(&http).await;
            });
        }
    }
    Ok(())
}

/// The reply language for the invoking guild (English in direct messages).
pub(crate) async fn reply_lang(context: &Context<'_>) -> Lang {
    context
        .data()
        .languages
        .get(context.guild_id().map(|g| g.get()))
        .await
}

/// Command check for guild-only, administrator-only commands. Denials are
/// reported as localized notices; no state changes.
pub(crate) async fn ensure_admin(context: Context<'_>) -> Result<bool, Error> {
    let lang = reply_lang(&context).await;

    if context.guild_id().is_none() {
        send_notice(context, lang.guild_only()).await?;
        return Ok(false);
    }

    let is_admin = match context.author_member().await {
        Some(member) => member
            .permissions(&context.serenity_context().cache)
            .map(|permissions| permissions.administrator())
            .unwrap_or(false),
        None => false,
    };
    if !is_admin {
        send_notice(context, lang.admin_only()).await?;
        return Ok(false);
    }
    Ok(true)
}
