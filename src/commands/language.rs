//! Per-guild language configuration.

use crate::commands::{reply_lang, send_notice, COLOR_INFO};
use crate::lang::Lang;
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum LanguageChoice {
    #[name = "English"]
    English,
    #[name = "Spanish"]
    Spanish,
}

impl From<LanguageChoice> for Lang {
    fn from(choice: LanguageChoice) -> Self {
        match choice {
            LanguageChoice::English => Lang::En,
            LanguageChoice::Spanish => Lang::Es,
        }
    }
}

/// Configure the bot language for this server.
#[poise::command(
    slash_command,
    prefix_command,
    check = "crate::commands::ensure_admin"
)]
pub async fn language(
    context: Context<'_>,
    #[description = "Language to apply"] choice: Option<LanguageChoice>,
) -> Result<(), Error> {
    // ensure_admin rejects direct messages, so a guild id is present.
    let Some(guild_id) = context.guild_id().map(|g| g.get()) else {
        return Ok(());
    };

    match choice {
        None => {
            let lang = reply_lang(&context).await;
            let embed = serenity::CreateEmbed::new()
                .title(lang.language_title())
                .description(lang.language_info())
                .colour(serenity::Colour::new(COLOR_INFO));
            context
                .send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
        Some(choice) => {
            let lang = Lang::from(choice);
            context.data().languages.set(guild_id, lang).await?;
            tracing::info!(guild_id, language = lang.tag(), "Guild language updated");
            // Confirm in the language that was just selected.
            send_notice(context, lang.language_set()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_maps_to_lang() {
        assert_eq!(Lang::from(LanguageChoice::English), Lang::En);
        assert_eq!(Lang::from(LanguageChoice::Spanish), Lang::Es);
    }
}
