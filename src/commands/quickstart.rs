use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serenity::all::{
    Command, CommandDataOptionValue, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, CreateInteractionResponse, CreateInteractionResponseMessage, GuildChannel, GuildId, User,
    UserId,
};
use serenity::prelude::Mentionable;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::commands::respond;
use crate::error::ParrotError;
use crate::handlers::BotState;
use crate::quickstart::{run_with_status, ChannelCrawler, DiscordHistory, DmStatus, HistoryPager};
use crate::ui::{embeds, menus, paginate, PAGE_LEN};
use crate::utils::{mention_channel, snowflake_at};

pub async fn register(ctx: &Context) -> anyhow::Result<()> {
    Command::create_global_command(
        &ctx.http,
        CreateCommand::new("quickstart")
            .description("Scan your past messages to get started using Parrot right away.")
            .add_option(CreateCommandOption::new(
                CommandOptionType::User,
                "user",
                "Bot to scan for (admins only). Defaults to you.",
            )),
    )
    .await?;
    Ok(())
}

pub async fn handle(ctx: &Context, cmd: &CommandInteraction, state: &BotState) -> anyhow::Result<()> {
    let author = &cmd.user;
    if let Err(wait) = state.quickstart_cooldown.check(author.id.get()) {
        return Err(ParrotError::Cooldown(wait.as_secs_f64()).into());
    }

    let target = resolve_target(ctx, cmd, state).await?;
    let for_self = target.id == author.id;

    let Some(guild_id) = cmd.guild_id else {
        let text = "Quickstart is only available in servers. Try running Quickstart again in a server that Parrot is in.";
        return respond(ctx, cmd, embeds::notice_embed(text), false).await;
    };

    let registered = target.bot || state.users.is_registered(target.id.get()).await?;
    check_registration(&target.name, target.bot, registered)?;

    let channel_id = cmd.channel_id;
    if !state.channels.can_learn(channel_id.get()).await? {
        return show_quickstart_channels(ctx, cmd, state, guild_id).await;
    }

    // held until the scan is over, however it ends
    let Some(_scan) = state.scans.try_begin(channel_id.get(), target.id.get()) else {
        return Err(ParrotError::AlreadyScanning(already_scanning_text(for_self, &target.name)).into());
    };

    let status = DmStatus::open(ctx.http.clone(), author.id, channel_id, target.clone()).await?;
    let whose = if for_self { "your".to_string() } else { format!("{}'s", target.mention()) };
    respond(ctx, cmd, embeds::scanning_notice_embed(&whose), false).await?;

    let after = joined_at(ctx, cmd, guild_id, &target).await.map(snowflake_at).unwrap_or(0);
    let history = DiscordHistory::new(ctx.http.clone(), channel_id);
    let pager = HistoryPager::new(history, after, state.config.quickstart_limit);
    let mut crawler = ChannelCrawler::new(pager, state.corpora.clone(), target.id.get());

    info!(channel_id = channel_id.get(), user_id = target.id.get(), invoker = author.id.get(), "quickstart started");
    let result = run_with_status(&mut crawler, &status, state.config.status_interval).await;
    let progress = crawler.progress();

    match result {
        Ok(collected) => {
            info!(
                channel_id = channel_id.get(),
                user_id = target.id.get(),
                scanned = progress.scanned(),
                collected,
                "quickstart finished"
            );
            let who = if for_self { "you".to_string() } else { target.name.clone() };
            status.complete(collected, &who).await
        }
        Err(e) => {
            if let Err(report) = status.fail(progress.collected()).await {
                warn!("could not report failed quickstart: {report:#}");
            }
            Err(e.context("quickstart crawl"))
        }
    }
}

/// The invoker, unless an admin asked to scan for a bot.
async fn resolve_target(ctx: &Context, cmd: &CommandInteraction, state: &BotState) -> anyhow::Result<User> {
    let author = &cmd.user;
    let requested = cmd.data.options.iter().find_map(|opt| match (opt.name.as_str(), &opt.value) {
        ("user", CommandDataOptionValue::User(id)) => Some(*id),
        _ => None,
    });

    let Some(uid) = other_target(requested, author.id) else {
        return Ok(author.clone());
    };

    let permissions = cmd.member.as_ref().and_then(|m| m.permissions);
    let is_admin = state.is_admin(author.id.get(), permissions);
    // no lookup for someone who isn't allowed to pick a target anyway
    if !is_admin {
        check_target(false, is_admin, false)?;
    }

    let user = match cmd.data.resolved.users.get(&uid) {
        Some(u) => u.clone(),
        None => uid.to_user(&ctx.http).await.context("resolve quickstart target")?,
    };
    check_target(false, is_admin, user.bot)?;
    Ok(user)
}

/// The requested target when it isn't the invoker; `None` means scan for yourself.
fn other_target(requested: Option<UserId>, invoker: UserId) -> Option<UserId> {
    requested.filter(|uid| *uid != invoker)
}

/// Anyone may scan for themselves; only admins may scan for someone else, and only for bots.
fn check_target(for_self: bool, is_admin: bool, target_is_bot: bool) -> Result<(), ParrotError> {
    if for_self {
        return Ok(());
    }
    if !is_admin {
        return Err(ParrotError::UserPermission("You can only run Quickstart on yourself.".into()));
    }
    if !target_is_bot {
        return Err(ParrotError::UserPermission("Quickstart can only be run on behalf of bots.".into()));
    }
    Ok(())
}

/// Bots can't register, so only human targets need to have opted in.
fn check_registration(name: &str, target_is_bot: bool, registered: bool) -> Result<(), ParrotError> {
    if target_is_bot || registered {
        return Ok(());
    }
    Err(ParrotError::NotRegistered(name.to_string()))
}

fn already_scanning_text(for_self: bool, name: &str) -> String {
    if for_self {
        "❌ You are already currently running Quickstart in this channel!".to_string()
    } else {
        format!("❌ Quickstart is already running for {name} in this channel!")
    }
}

/// When the target joined the guild; history before that can't contain their messages.
async fn joined_at(ctx: &Context, cmd: &CommandInteraction, guild_id: GuildId, target: &User) -> Option<DateTime<Utc>> {
    let stamp = if target.id == cmd.user.id {
        cmd.member.as_ref().and_then(|m| m.joined_at)
    } else {
        match guild_id.member(&ctx.http, target.id).await {
            Ok(member) => member.joined_at,
            Err(e) => {
                warn!(user_id = target.id.get(), "could not look up guild member: {e}");
                None
            }
        }
    }?;
    DateTime::from_timestamp(stamp.unix_timestamp(), 0)
}

async fn show_quickstart_channels(
    ctx: &Context,
    cmd: &CommandInteraction,
    state: &BotState,
    guild_id: GuildId,
) -> anyhow::Result<()> {
    let entries = learning_channel_mentions(ctx, state, guild_id).await?;
    let page = paginate(&entries, PAGE_LEN, 0);
    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .embed(embeds::quickstart_channels_embed(&page))
                .components(vec![menus::quickstart_channels_row(&page)])
                .ephemeral(true),
        ),
    )
    .await?;
    Ok(())
}

/// Mentions of this guild's channels where Parrot can learn, in sidebar order.
pub async fn learning_channel_mentions(ctx: &Context, state: &BotState, guild_id: GuildId) -> anyhow::Result<Vec<String>> {
    let learning: HashSet<u64> = state.channels.learning_channels().await?.into_iter().collect();
    let channels = guild_id.channels(&ctx.http).await.context("list guild channels")?;

    let mut found: Vec<&GuildChannel> = channels
        .values()
        .filter(|c| learning.contains(&c.id.get()))
        .collect();
    found.sort_by_key(|c| (c.position, c.id));
    Ok(found.into_iter().map(|c| mention_channel(c.id.get())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_defaults_to_the_invoker() {
        let me = UserId::new(10);
        assert_eq!(other_target(None, me), None);
        assert_eq!(other_target(Some(me), me), None);
        assert_eq!(other_target(Some(UserId::new(11)), me), Some(UserId::new(11)));
    }

    #[test]
    fn anyone_may_scan_for_themselves() {
        assert!(check_target(true, false, false).is_ok());
        assert!(check_target(true, true, false).is_ok());
    }

    #[test]
    fn non_admins_cannot_pick_a_target() {
        let err = check_target(false, false, true).unwrap_err();
        assert_eq!(err.to_string(), "You can only run Quickstart on yourself.");
    }

    #[test]
    fn admins_may_only_target_bots() {
        let err = check_target(false, true, false).unwrap_err();
        assert_eq!(err.to_string(), "Quickstart can only be run on behalf of bots.");
        assert!(check_target(false, true, true).is_ok());
    }

    #[test]
    fn humans_must_be_registered_bots_are_exempt() {
        let err = check_registration("alice", false, false).unwrap_err();
        assert!(matches!(err, ParrotError::NotRegistered(ref name) if name == "alice"));
        assert!(check_registration("alice", false, true).is_ok());
        assert!(check_registration("helperbot", true, false).is_ok());
    }

    #[test]
    fn already_scanning_wording() {
        assert_eq!(already_scanning_text(true, "alice"), "❌ You are already currently running Quickstart in this channel!");
        assert_eq!(
            already_scanning_text(false, "helperbot"),
            "❌ Quickstart is already running for helperbot in this channel!"
        );
    }
}
