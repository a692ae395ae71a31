use serenity::all::{ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage};

use crate::commands::quickstart::learning_channel_mentions;
use crate::handlers::state_from_ctx;
use crate::ui::{embeds, menus, paginate, PAGE_LEN};
use crate::utils::parse_component_id;

pub async fn handle_component(ctx: &Context, it: &ComponentInteraction) -> anyhow::Result<()> {
    let Some((kind, page)) = parse_component_id(&it.data.custom_id) else { return Ok(()); };

    match kind {
        "qs:ch" => quickstart_channels_page(ctx, it, page).await?,
        _ => {}
    }

    Ok(())
}

/* Prev/next on the Quickstart channel list; the list is rebuilt on every click */
async fn quickstart_channels_page(ctx: &Context, it: &ComponentInteraction, page: usize) -> anyhow::Result<()> {
    let Some(guild_id) = it.guild_id else { return Ok(()); };
    let state = state_from_ctx(ctx).await?;
    let entries = learning_channel_mentions(ctx, &state, guild_id).await?;
    let page = paginate(&entries, PAGE_LEN, page);

    it.create_response(
        &ctx.http,
        CreateInteractionResponse::UpdateMessage(
            CreateInteractionResponseMessage::new()
                .embed(embeds::quickstart_channels_embed(&page))
                .components(vec![menus::quickstart_channels_row(&page)]),
        ),
    )
    .await?;
    Ok(())
}
