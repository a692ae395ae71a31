use serenity::all::{Command, CommandInteraction, Context, CreateCommand};
use tracing::info;

use crate::commands::respond;
use crate::handlers::BotState;
use crate::ui::embeds;

pub async fn register(ctx: &Context) -> anyhow::Result<()> {
    Command::create_global_command(
        &ctx.http,
        CreateCommand::new("register").description("Let Parrot learn from your messages."),
    )
    .await?;
    Command::create_global_command(
        &ctx.http,
        CreateCommand::new("unregister").description("Stop Parrot from learning from your messages."),
    )
    .await?;
    Command::create_global_command(
        &ctx.http,
        CreateCommand::new("forget").description("Delete every message Parrot has collected from you."),
    )
    .await?;
    Ok(())
}

pub async fn handle_register(ctx: &Context, cmd: &CommandInteraction, state: &BotState) -> anyhow::Result<()> {
    state.users.register(cmd.user.id.get()).await?;
    info!(user_id = cmd.user.id.get(), "user registered");
    let text = "✅ You are now registered. Parrot will learn from your messages in channels where it's allowed to.\n\
                Run `/quickstart` to teach it your older messages too.";
    respond(ctx, cmd, embeds::notice_embed(text), true).await
}

pub async fn handle_unregister(ctx: &Context, cmd: &CommandInteraction, state: &BotState) -> anyhow::Result<()> {
    let text = if state.users.unregister(cmd.user.id.get()).await? {
        info!(user_id = cmd.user.id.get(), "user unregistered");
        "You are no longer registered. Parrot won't learn from your new messages.\n\
         What it already collected is kept; run `/forget` to delete it."
    } else {
        "You weren't registered in the first place."
    };
    respond(ctx, cmd, embeds::notice_embed(text), true).await
}

pub async fn handle_forget(ctx: &Context, cmd: &CommandInteraction, state: &BotState) -> anyhow::Result<()> {
    // NoData surfaces to the user as is
    state.corpora.delete(cmd.user.id.get()).await?;
    info!(user_id = cmd.user.id.get(), "corpus deleted on request");
    respond(ctx, cmd, embeds::notice_embed("🗑️ Parrot has forgotten all of your messages."), true).await
}
