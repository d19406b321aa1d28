//! Kit lookup by planner share id.

use crate::commands::{reply_lang, send_notice, COLOR_INFO};
use crate::lookup;
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

/// Look up kit details by share id.
#[poise::command(slash_command, prefix_command)]
pub async fn kit(
    context: Context<'_>,
    #[description = "Kit share id from the Deepwoken planner"] share_id: String,
) -> Result<(), Error> {
    let lang = reply_lang(&context).await;
    let share_id = share_id.trim();
    if share_id.is_empty() {
        return send_notice(context, lang.empty_query()).await;
    }

    context.defer().await?;
    let Some(kit) = lookup::find_kit(share_id) else {
        return send_notice(context, lang.not_found(share_id)).await;
    };

    let items = if kit.items.is_empty() {
        "—".to_string()
    } else {
        kit.items
            .iter()
            .map(|item| {
                if item.hp > 0 {
                    format!("{} (+{} HP)", item.name, item.hp)
                } else {
                    item.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title(kit.name.clone())
        .colour(serenity::Colour::new(COLOR_INFO))
        .field("Share id", format!("`{}`", kit.kit_share_id), true)
        .field("Bonus HP", format!("+{}", kit.total_hp()), true)
        .field("Items", items, false);

    context.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
