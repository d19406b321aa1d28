//! Game-data lookup commands: equipment, weapons, talents, mantras, outfits.
//!
//! All five share one shape: defer, match the query against the bundled
//! table, reply with a record embed or a localized not-found notice.

use crate::commands::{reply_lang, send_notice, COLOR_INFO};
use crate::lookup;
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

/// Look up equipment details by name.
#[poise::command(slash_command, prefix_command)]
pub async fn equipment(
    context: Context<'_>,
    #[description = "Full or partial equipment name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    respond(context, &name, |query| {
        lookup::find_equipment(query).map(equipment_embed)
    })
    .await
}

/// Look up weapon details by name.
#[poise::command(slash_command, prefix_command)]
pub async fn weapon(
    context: Context<'_>,
    #[description = "Full or partial weapon name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    respond(context, &name, |query| {
        lookup::find_weapon(query).map(weapon_embed)
    })
    .await
}

/// Look up talent details by name.
#[poise::command(slash_command, prefix_command)]
pub async fn talent(
    context: Context<'_>,
    #[description = "Full or partial talent name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    respond(context, &name, |query| {
        lookup::find_talent(query).map(talent_embed)
    })
    .await
}

/// Look up mantra details by name.
#[poise::command(slash_command, prefix_command)]
pub async fn mantra(
    context: Context<'_>,
    #[description = "Full or partial mantra name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    respond(context, &name, |query| {
        lookup::find_mantra(query).map(mantra_embed)
    })
    .await
}

/// Look up outfit details by name.
#[poise::command(slash_command, prefix_command)]
pub async fn outfit(
    context: Context<'_>,
    #[description = "Full or partial outfit name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    respond(context, &name, |query| {
        lookup::find_outfit(query).map(outfit_embed)
    })
    .await
}

async fn respond(
    context: Context<'_>,
    query: &str,
    find: impl FnOnce(&str) -> Option<serenity::CreateEmbed>,
) -> Result<(), Error> {
    let lang = reply_lang(&context).await;
    let query = query.trim();
    if query.is_empty() {
        return send_notice(context, lang.empty_query()).await;
    }

    context.defer().await?;
    match find(query) {
        Some(embed) => {
            context.send(poise::CreateReply::default().embed(embed)).await?;
            Ok(())
        }
        None => send_notice(context, lang.not_found(query)).await,
    }
}

fn base_embed(name: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(name.to_string())
        .colour(serenity::Colour::new(COLOR_INFO))
}

fn equipment_embed(record: &lookup::Equipment) -> serenity::CreateEmbed {
    let mut embed = base_embed(&record.name)
        .field("Slot", record.slot.clone(), true)
        .field("Rarity", record.rarity.clone(), true);
    if !record.stats.is_empty() {
        embed = embed.field("Stats", record.stats.join("\n"), false);
    }
    if let Some(requirements) = &record.requirements {
        embed = embed.field("Requirements", requirements.clone(), false);
    }
    if let Some(obtained) = &record.obtained {
        embed = embed.field("Obtained", obtained.clone(), false);
    }
    embed
}

fn weapon_embed(record: &lookup::Weapon) -> serenity::CreateEmbed {
    let mut embed = base_embed(&record.name)
        .field("Category", record.category.clone(), true)
        .field("Damage", format!("{}", record.damage), true)
        .field("Penetration", format!("{}%", record.penetration), true)
        .field("Swing speed", format!("{}", record.swing_speed), true);
    if let Some(requirements) = &record.requirements {
        embed = embed.field("Requirements", requirements.clone(), false);
    }
    if let Some(obtained) = &record.obtained {
        embed = embed.field("Obtained", obtained.clone(), false);
    }
    embed
}

fn talent_embed(record: &lookup::Talent) -> serenity::CreateEmbed {
    let mut embed = base_embed(&record.name)
        .description(record.description.clone())
        .field("Rarity", record.rarity.clone(), true)
        .field("Category", record.category.clone(), true);
    if let Some(requirements) = &record.requirements {
        embed = embed.field("Requirements", requirements.clone(), false);
    }
    embed
}

fn mantra_embed(record: &lookup::Mantra) -> serenity::CreateEmbed {
    let mut embed = base_embed(&record.name)
        .description(record.description.clone())
        .field("Attunement", record.attunement.clone(), true)
        .field("Category", record.category.clone(), true);
    if let Some(requirements) = &record.requirements {
        embed = embed.field("Requirements", requirements.clone(), false);
    }
    embed
}

fn outfit_embed(record: &lookup::Outfit) -> serenity::CreateEmbed {
    let mut embed = base_embed(&record.name)
        .field("Rarity", record.rarity.clone(), true)
        .field("Durability", record.durability.to_string(), true);
    if !record.resistances.is_empty() {
        embed = embed.field("Resistances", record.resistances.join("\n"), false);
    }
    if let Some(requirements) = &record.requirements {
        embed = embed.field("Requirements", requirements.clone(), false);
    }
    if let Some(cost) = &record.cost {
        embed = embed.field("Cost", cost.clone(), false);
    }
    embed
}
