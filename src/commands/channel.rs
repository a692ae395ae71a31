use serenity::all::{
    Command, CommandDataOptionValue, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, Permissions,
};
use tracing::info;

use crate::commands::respond;
use crate::error::ParrotError;
use crate::handlers::BotState;
use crate::ui::embeds;
use crate::utils::mention_channel;

pub async fn register(ctx: &Context) -> anyhow::Result<()> {
    Command::create_global_command(
        &ctx.http,
        CreateCommand::new("channel")
            .description("Choose whether Parrot may learn or speak in this channel")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "permission", "What to allow or forbid")
                    .required(true)
                    .add_string_choice("learn", "learn")
                    .add_string_choice("speak", "speak"),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Boolean, "enabled", "Allow (true) or forbid (false)")
                    .required(true),
            ),
    )
    .await?;
    Ok(())
}

pub async fn handle(ctx: &Context, cmd: &CommandInteraction, state: &BotState) -> anyhow::Result<()> {
    let permissions = cmd.member.as_ref().and_then(|m| m.permissions);
    if cmd.guild_id.is_none() || !state.is_admin(cmd.user.id.get(), permissions) {
        return Err(ParrotError::UserPermission("Only server administrators can change channel permissions.".into()).into());
    }

    let mut permission = String::new();
    let mut enabled = false;
    for opt in &cmd.data.options {
        match opt.name.as_str() {
            "permission" => if let CommandDataOptionValue::String(s) = &opt.value { permission = s.clone(); },
            "enabled" => if let CommandDataOptionValue::Boolean(b) = &opt.value { enabled = *b; },
            _ => {}
        }
    }

    let channel_id = cmd.channel_id.get();
    let verb = match permission.as_str() {
        "learn" => {
            state.channels.set_learning(channel_id, enabled).await?;
            "learn"
        }
        "speak" => {
            state.channels.set_speaking(channel_id, enabled).await?;
            "speak"
        }
        other => anyhow::bail!("unknown channel permission `{other}`"),
    };
    info!(channel_id, verb, enabled, by = cmd.user.id.get(), "channel permission changed");

    let text = if enabled {
        format!("✅ Parrot can now {verb} in {}.", mention_channel(channel_id))
    } else {
        format!("🚫 Parrot can no longer {verb} in {}.", mention_channel(channel_id))
    };
    respond(ctx, cmd, embeds::notice_embed(text), false).await
}
