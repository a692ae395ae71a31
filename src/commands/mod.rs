pub mod channel;
pub mod quickstart;
pub mod registration;

use serenity::all::{
    CommandInteraction, Context, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage,
};
use tracing::{error, warn};

use crate::error::ParrotError;
use crate::handlers::state_from_ctx;
use crate::ui::embeds;

pub async fn register_commands(ctx: &Context) -> anyhow::Result<()> {
    quickstart::register(ctx).await?;
    registration::register(ctx).await?;
    channel::register(ctx).await?;
    Ok(())
}

pub async fn handle(ctx: &Context, cmd: &CommandInteraction) -> anyhow::Result<()> {
    let state = state_from_ctx(ctx).await?;
    match cmd.data.name.as_str() {
        "quickstart" => quickstart::handle(ctx, cmd, &state).await,
        "register" => registration::handle_register(ctx, cmd, &state).await,
        "unregister" => registration::handle_unregister(ctx, cmd, &state).await,
        "forget" => registration::handle_forget(ctx, cmd, &state).await,
        "channel" => channel::handle(ctx, cmd, &state).await,
        _ => Ok(()),
    }
}

pub async fn respond(ctx: &Context, cmd: &CommandInteraction, embed: CreateEmbed, ephemeral: bool) -> anyhow::Result<()> {
    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed).ephemeral(ephemeral)),
    )
    .await?;
    Ok(())
}

/// Shows user-facing errors to the invoker; anything else is logged and
/// reported generically. Falls back to a followup when the command already
/// responded before failing.
pub async fn report_error(ctx: &Context, cmd: &CommandInteraction, err: &anyhow::Error) {
    let text = match ParrotError::from_anyhow(err) {
        Some(e) => e.to_string(),
        None => {
            error!(command = %cmd.data.name, user_id = cmd.user.id.get(), "command failed: {err:#}");
            "Something went wrong. Please try again later.".to_string()
        }
    };
    let embed = embeds::error_embed(text);

    if respond(ctx, cmd, embed.clone(), true).await.is_ok() {
        return;
    }
    let followup = CreateInteractionResponseFollowup::new().embed(embed).ephemeral(true);
    if let Err(e) = cmd.create_followup(&ctx.http, followup).await {
        warn!(command = %cmd.data.name, "could not report error to user: {e}");
    }
}
