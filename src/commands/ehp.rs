//! The `/ehp` command: fetches a shared build from the planner and replies
//! with a two-panel effective-health breakdown chart.

use crate::commands::{reply_lang, send_notice, COLOR_ERROR, COLOR_INFO};
use crate::deepwoken::{self, Build};
use crate::ehp::{breakdown, hp_kit, phys_kit, EhpBreakdown};
use crate::error::Result as DeepdexResult;
use crate::lang::Lang;
use crate::lookup;
use crate::render;
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;
use std::fmt::Write as _;

/// A rendered breakdown, ready to attach to a reply.
pub struct BreakdownReply {
    pub embed: serenity::CreateEmbed,
    pub attachment: serenity::CreateAttachment,
}

/// Calculate the effective health of a Deepwoken build.
///
/// Takes a builder link or bare build id; on the prefix surface the link may
/// be omitted when the command message replies to a message containing one.
/// An optional kit share id adds the kit's flat health to both panels.
#[poise::command(slash_command, prefix_command)]
pub async fn ehp(
    context: Context<'_>,
    #[description = "Builder link or build id"] build: Option<String>,
    #[description = "Kit share id granting extra HP"] kit: Option<String>,
) -> Result<(), Error> {
    let lang = reply_lang(&context).await;

    let build_id = match build {
        Some(input) => match deepwoken::extract_build_id(&input) {
            Some(id) => id,
            None => return send_notice(context, lang.invalid_build_link()).await,
        },
        None => match replied_build_link(&context) {
            Some(id) => id,
            None => return send_notice(context, lang.missing_build_link()).await,
        },
    };

    context.defer().await?;

    let data = context.data();
    let build = match deepwoken::fetch_build(&data.http_client, &data.api_base_url, &build_id).await
    {
        Ok(Some(build)) => build,
        Ok(None) => return send_notice(context, lang.build_not_found(&build_id)).await,
        Err(error) => {
            tracing::warn!(%error, %build_id, "Build fetch failed");
            context
                .send(
                    poise::CreateReply::default()
                        .embed(load_failed_embed(lang))
                        .ephemeral(true),
                )
                .await?;
            return Ok(());
        }
    };

    // An unknown kit id contributes nothing, same as no kit at all.
    let kit = kit
        .as_deref()
        .and_then(lookup::find_kit)
        .filter(|kit| kit.total_hp() > 0);
    let extra_hp = kit.map(|kit| kit.total_hp()).unwrap_or(0);
    let kit_note = kit.map(|kit| kit.kit_share_id.as_str());

    match render_build_breakdown(&build, extra_hp, kit_note).await {
        Ok(reply) => {
            context
                .send(
                    poise::CreateReply::default()
                        .embed(reply.embed)
                        .attachment(reply.attachment),
                )
                .await?;
        }
        Err(error) => {
            tracing::warn!(%error, %build_id, "Breakdown render failed");
            let embed = serenity::CreateEmbed::new()
                .title(lang.ehp_failed_title())
                .description(error.to_string())
                .colour(serenity::Colour::new(COLOR_ERROR));
            context
                .send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
    }
    Ok(())
}

/// On the prefix surface, a build id can come from the replied-to message.
fn replied_build_link(context: &Context<'_>) -> Option<String> {
    match context {
        Context::Prefix(prefix) => prefix
            .msg
            .referenced_message
            .as_deref()
            .and_then(|replied| deepwoken::find_build_link(&replied.content)),
        Context::Application(_) => None,
    }
}

/// Computes both kit panels for a build and renders them into an embed plus
/// a PNG attachment. Shared by `/ehp` and the builder-link reply path.
pub async fn render_build_breakdown(
    build: &Build,
    extra_hp: u32,
    kit_note: Option<&str>,
) -> DeepdexResult<BreakdownReply> {
    let panels = vec![
        breakdown(build, phys_kit(extra_hp)),
        breakdown(build, hp_kit(extra_hp)),
    ];

    let chart_panels = panels.clone();
    let png = tokio::task::spawn_blocking(move || render::render_breakdown(&chart_panels)).await??;

    let mut title = format!("EHP Breakdown — {}", build.display_name());
    if let Some(kit_id) = kit_note {
        let _ = write!(title, " (+{extra_hp} HP from kit {kit_id})");
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .url(build.builder_url())
        .description(breakdown_lines(&panels))
        .colour(serenity::Colour::new(COLOR_INFO))
        .image(format!("attachment://{}", render::ATTACHMENT_NAME));
    if !build.author.trim().is_empty() {
        embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
            "Build by {} · Power {}",
            build.author, build.power
        )));
    }

    Ok(BreakdownReply {
        embed,
        attachment: serenity::CreateAttachment::bytes(png, render::ATTACHMENT_NAME),
    })
}

/// The chart carries no text, so the numbers travel in the embed body.
fn breakdown_lines(panels: &[EhpBreakdown]) -> String {
    panels
        .iter()
        .map(|panel| {
            format!(
                "**{}** — {:.0} HP → {:.0} EHP ({:.1}% resisted, ~{:.1}s vs {:.0} DPS)",
                panel.label,
                panel.total_hp,
                panel.ehp,
                panel.effective_resist * 100.0,
                panel.seconds_to_live(),
                panel.dps,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn load_failed_embed(lang: Lang) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(lang.build_load_failed_title())
        .description(lang.build_load_failed())
        .colour(serenity::Colour::new(COLOR_ERROR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepwoken::Traits;

    fn sample_build() -> Build {
        Build {
            id: "AbC123".to_string(),
            name: "Cloudway Duelist".to_string(),
            author: "rovaa".to_string(),
            power: 20,
            traits: Traits {
                vitality: 10,
                ..Traits::default()
            },
            talents: vec!["Exoskeleton".to_string()],
        }
    }

    #[test]
    fn test_breakdown_lines_carry_both_kits() {
        let build = sample_build();
        let panels = vec![
            breakdown(&build, phys_kit(0)),
            breakdown(&build, hp_kit(0)),
        ];

        let lines = breakdown_lines(&panels);
        assert!(lines.contains("Phys Kit"));
        assert!(lines.contains("HP Kit"));
        assert!(lines.contains("100 DPS"));
        assert_eq!(lines.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_render_build_breakdown_produces_png_attachment() {
        let reply = render_build_breakdown(&sample_build(), 9, Some("Xq3vR1"))
            .await
            .unwrap();
        assert_eq!(reply.attachment.filename, render::ATTACHMENT_NAME);
        assert_eq!(&reply.attachment.data[..8], b"\x89PNG\r\n\x1a\n");
    }
}
