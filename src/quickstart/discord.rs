use anyhow::Context;
use serenity::all::{ChannelId, CreateMessage, EditMessage, GetMessages, Http, MessageId, User, UserId};
use serenity::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::db::models::CorpusMessage;
use crate::quickstart::crawler::{HistorySource, StatusSink};
use crate::ui::embeds;

/// A guild channel's history over the REST API.
pub struct DiscordHistory {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordHistory {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self { Self { http, channel_id } }
}

#[async_trait]
impl HistorySource for DiscordHistory {
    async fn page_after(&self, after: u64, limit: u8) -> anyhow::Result<Vec<CorpusMessage>> {
        let builder = GetMessages::new().after(MessageId::new(after.max(1))).limit(limit);
        let page = self
            .channel_id
            .messages(&self.http, builder)
            .await
            .context("fetch channel history")?;
        Ok(page.iter().map(CorpusMessage::from_discord).collect())
    }
}

/// The status embed Quickstart keeps up to date in the invoker's DMs.
pub struct DmStatus {
    http: Arc<Http>,
    dm_channel: ChannelId,
    message_id: MessageId,
    source: ChannelId,
    target: User,
}

impl DmStatus {
    /// DMs the initial "Collected 0 new messages" embed to `recipient`.
    pub async fn open(http: Arc<Http>, recipient: UserId, source: ChannelId, target: User) -> anyhow::Result<Self> {
        let dm = recipient.create_dm_channel(&http).await.context("open DM channel")?;
        let message = dm
            .id
            .send_message(&http, CreateMessage::new().embed(embeds::scan_status_embed(source, 0, &target)))
            .await
            .context("send quickstart status")?;
        Ok(Self { http, dm_channel: dm.id, message_id: message.id, source, target })
    }

    /// Replaces the status message with a fresh one so the invoker gets a notification.
    pub async fn complete(&self, collected: u64, who: &str) -> anyhow::Result<()> {
        let embed = embeds::scan_complete_embed(self.source, collected, &self.target, who);
        self.replace(embed).await
    }

    pub async fn fail(&self, collected: u64) -> anyhow::Result<()> {
        let embed = embeds::scan_failed_embed(self.source, collected, &self.target);
        self.replace(embed).await
    }

    /// Only a failed send is an error; a stale status message left behind is just logged.
    async fn replace(&self, embed: serenity::all::CreateEmbed) -> anyhow::Result<()> {
        let delete = self.dm_channel.delete_message(&self.http, self.message_id);
        let send = self.dm_channel.send_message(&self.http, CreateMessage::new().embed(embed));
        let (deleted, sent) = tokio::join!(delete, send);
        log_stale_status(deleted, self.message_id);
        sent.context("send quickstart result")?;
        Ok(())
    }
}

fn log_stale_status<E: std::fmt::Display>(deleted: Result<(), E>, message_id: MessageId) -> bool {
    match deleted {
        Ok(()) => true,
        Err(e) => {
            warn!(message_id = message_id.get(), "could not delete quickstart status: {e}");
            false
        }
    }
}

#[async_trait]
impl StatusSink for DmStatus {
    async fn update(&self, collected: u64) -> anyhow::Result<()> {
        let embed = embeds::scan_status_embed(self.source, collected, &self.target);
        self.dm_channel
            .edit_message(&self.http, self.message_id, EditMessage::new().embed(embed))
            .await
            .context("edit quickstart status")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_status_delete_is_not_fatal() {
        assert!(log_stale_status::<String>(Ok(()), MessageId::new(1)));
        assert!(!log_stale_status(Err("Unknown Message".to_string()), MessageId::new(1)));
    }
}
