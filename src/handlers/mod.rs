pub mod components;
pub mod messages;

use serenity::all::{ChannelId, Context, EventHandler, GuildId, Interaction, Message, MessageId, Permissions, Ready};
use serenity::async_trait;
use serenity::prelude::TypeMapKey;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{ChannelManager, CorpusManager, UserManager};
use crate::quickstart::{Cooldown, ScanRegistry};

/// Everything the event handlers share.
pub struct BotState {
    pub config: Config,
    pub users: UserManager,
    pub corpora: CorpusManager,
    pub channels: ChannelManager,
    pub scans: ScanRegistry,
    pub quickstart_cooldown: Cooldown,
}

impl BotState {
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        Self {
            config,
            users: UserManager::new(pool.clone()),
            corpora: CorpusManager::new(pool.clone()),
            channels: ChannelManager::new(pool),
            scans: ScanRegistry::new(),
            quickstart_cooldown: Cooldown::default(),
        }
    }

    /// Configured bot admins, plus anyone with Administrator in the current guild.
    pub fn is_admin(&self, user_id: u64, permissions: Option<Permissions>) -> bool {
        self.config.admin_user_ids.contains(&user_id) || permissions.is_some_and(|p| p.administrator())
    }
}

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        if let Err(e) = crate::commands::register_commands(&ctx).await {
            error!("failed to register commands: {e:#}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(cmd) => {
                if let Err(e) = crate::commands::handle(&ctx, &cmd).await {
                    crate::commands::report_error(&ctx, &cmd, &e).await;
                }
            }
            Interaction::Component(comp) => {
                if let Err(e) = components::handle_component(&ctx, &comp).await {
                    error!(custom_id = %comp.data.custom_id, "component error: {e:#}");
                }
            }
            _ => {}
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.guild_id.is_none() || msg.author.id == ctx.cache.current_user().id {
            return;
        }
        let state = match state_from_ctx(&ctx).await {
            Ok(s) => s,
            Err(e) => {
                error!("{e:#}");
                return;
            }
        };
        if let Err(e) = messages::learn_from_message(&state, &msg).await {
            warn!(message_id = msg.id.get(), "learning from message failed: {e:#}");
        }
    }

    async fn message_delete(&self, ctx: Context, _channel_id: ChannelId, deleted_message_id: MessageId, _guild_id: Option<GuildId>) {
        forget_messages(&ctx, &[deleted_message_id]).await;
    }

    async fn message_delete_bulk(&self, ctx: Context, _channel_id: ChannelId, deleted: Vec<MessageId>, _guild_id: Option<GuildId>) {
        forget_messages(&ctx, &deleted).await;
    }
}

async fn forget_messages(ctx: &Context, ids: &[MessageId]) {
    let state = match state_from_ctx(ctx).await {
        Ok(s) => s,
        Err(e) => {
            error!("{e:#}");
            return;
        }
    };
    for id in ids {
        if let Err(e) = messages::forget_message(&state, id.get()).await {
            warn!(message_id = id.get(), "forgetting deleted message failed: {e:#}");
        }
    }
}

/* Context data access */
pub struct StateKey;
impl TypeMapKey for StateKey { type Value = Arc<BotState>; }

pub async fn state_from_ctx(ctx: &Context) -> anyhow::Result<Arc<BotState>> {
    let data = ctx.data.read().await;
    data.get::<StateKey>()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("bot state missing from client data"))
}

#[cfg(test)]
pub(crate) fn test_state(pool: SqlitePool) -> BotState {
    let config = Config {
        discord_token: String::new(),
        database_url: "sqlite::memory:".into(),
        admin_user_ids: [42].into_iter().collect(),
        quickstart_limit: crate::config::DEFAULT_QUICKSTART_LIMIT,
        status_interval: std::time::Duration::from_millis(10),
    };
    BotState::new(config, pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn admins_come_from_config_or_permissions() {
        let state = test_state(test_pool().await);
        assert!(state.is_admin(42, None));
        assert!(!state.is_admin(7, None));
        assert!(!state.is_admin(7, Some(Permissions::MANAGE_MESSAGES)));
        assert!(state.is_admin(7, Some(Permissions::ADMINISTRATOR)));
    }
}
