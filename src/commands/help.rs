//! Localized help menu.

use crate::commands::{reply_lang, COLOR_INFO};
use crate::lang::Lang;
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

/// Show the Deepdex help menu.
#[poise::command(slash_command, prefix_command)]
pub async fn help(context: Context<'_>) -> Result<(), Error> {
    let lang = reply_lang(&context).await;
    let prefix = &context.data().command_prefix;

    let intro = match lang {
        Lang::En => format!(
            "Every command works as a slash command (`/name`) and as a prefix command (`{prefix}name`)."
        ),
        Lang::Es => format!(
            "Todos los comandos funcionan como slash (`/nombre`) y con prefijo (`{prefix}nombre`)."
        ),
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(lang.help_title())
        .description(intro)
        .colour(serenity::Colour::new(COLOR_INFO));
    for (name, description) in command_lines(lang) {
        embed = embed.field(name, description, false);
    }

    context
        .send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

fn command_lines(lang: Lang) -> Vec<(&'static str, &'static str)> {
    match lang {
        Lang::En => vec![
            ("equipment <name>", "Look up equipment by full or partial name."),
            ("weapon <name>", "Look up a weapon by full or partial name."),
            ("talent <name>", "Look up a talent by full or partial name."),
            ("mantra <name>", "Look up a mantra by full or partial name."),
            ("outfit <name>", "Look up an outfit by full or partial name."),
            ("kit <share id>", "Look up a kit by its planner share id."),
            (
                "ehp [build] [kit]",
                "Effective-health breakdown for a builder link or build id. Also works by replying to a message with a builder link.",
            ),
            ("language [choice]", "Set the bot language for this server (admin)."),
            (
                "clopen setup|status|disable",
                "Manage the scheduled open/close channel (admin).",
            ),
        ],
        Lang::Es => vec![
            ("equipment <nombre>", "Busca equipamiento por nombre completo o parcial."),
            ("weapon <nombre>", "Busca un arma por nombre completo o parcial."),
            ("talent <nombre>", "Busca un talento por nombre completo o parcial."),
            ("mantra <nombre>", "Busca un mantra por nombre completo o parcial."),
            ("outfit <nombre>", "Busca un atuendo por nombre completo o parcial."),
            ("kit <id>", "Busca un kit por su id del planner."),
            (
                "ehp [build] [kit]",
                "Desglose de vida efectiva para un enlace del builder o id de build. También funciona respondiendo a un mensaje con un enlace del builder.",
            ),
            ("language [idioma]", "Cambia el idioma del bot en este servidor (admin)."),
            (
                "clopen setup|status|disable",
                "Gestiona el canal con horario de apertura y cierre (admin).",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_languages_list_the_same_commands() {
        let en = command_lines(Lang::En);
        let es = command_lines(Lang::Es);
        assert_eq!(en.len(), es.len());
        // Command tokens match even though descriptions are localized.
        for ((en_name, _), (es_name, _)) in en.iter().zip(es.iter()) {
            assert_eq!(
                en_name.split_whitespace().next(),
                es_name.split_whitespace().next()
            );
        }
    }
}
