use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::all::Message;

use crate::utils::{from_db_id, to_db_id};

/// A message as Parrot records it in a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusMessage {
    pub id: u64,
    pub author_id: u64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl CorpusMessage {
    pub fn from_discord(message: &Message) -> Self {
        let content = learnable_content(
            &message.content,
            message.author.bot,
            message.embeds.iter().filter_map(|e| e.description.as_deref()),
            message.attachments.iter().map(|a| a.url.as_str()),
        );
        Self {
            id: message.id.get(),
            author_id: message.author.id.get(),
            timestamp: DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0).unwrap_or_default(),
            content,
        }
    }
}

/// Text Parrot learns from a message.
///
/// Bots often put their real output in embeds, so embed descriptions are
/// appended for bot authors only (for humans they are mostly link previews).
/// Attachment URLs are appended for everyone.
pub fn learnable_content<'a>(
    content: &str,
    author_is_bot: bool,
    embed_descriptions: impl IntoIterator<Item = &'a str>,
    attachment_urls: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut out = content.to_string();
    if author_is_bot {
        for desc in embed_descriptions {
            out.push('\n');
            out.push_str(desc);
        }
    }
    for url in attachment_urls {
        out.push(' ');
        out.push_str(url);
    }
    out
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub timestamp: i64,
    pub content: String,
}

impl From<MessageRow> for CorpusMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: from_db_id(row.id),
            author_id: from_db_id(row.user_id),
            timestamp: DateTime::from_timestamp(row.timestamp, 0).unwrap_or_default(),
            content: row.content,
        }
    }
}

/// Where a user's original avatar lives and where Parrot re-hosted its modified copy.
/// Field names match the JSON stored in the legacy Redis `avatars` hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AvatarLedger {
    pub original_avatar_url: String,
    pub modified_avatar_url: String,
    pub source_message_id: u64,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AvatarRow {
    pub id: i64,
    pub original_avatar_url: Option<String>,
    pub modified_avatar_url: Option<String>,
    pub modified_avatar_message_id: Option<i64>,
}

impl AvatarRow {
    /// Partially filled rows don't count as a ledger.
    pub fn into_ledger(self) -> Option<(u64, AvatarLedger)> {
        let ledger = AvatarLedger {
            original_avatar_url: self.original_avatar_url?,
            modified_avatar_url: self.modified_avatar_url?,
            source_message_id: from_db_id(self.modified_avatar_message_id?),
        };
        Some((from_db_id(self.id), ledger))
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ChannelRow {
    pub can_speak_here: bool,
    pub can_learn_here: bool,
    pub webhook_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelPermissions {
    pub can_speak_here: bool,
    pub can_learn_here: bool,
    pub webhook_id: Option<u64>,
}

impl From<ChannelRow> for ChannelPermissions {
    fn from(row: ChannelRow) -> Self {
        Self {
            can_speak_here: row.can_speak_here,
            can_learn_here: row.can_learn_here,
            webhook_id: row.webhook_id.map(from_db_id),
        }
    }
}

pub(crate) fn ledger_params(ledger: &AvatarLedger) -> (&str, &str, i64) {
    (
        ledger.original_avatar_url.as_str(),
        ledger.modified_avatar_url.as_str(),
        to_db_id(ledger.source_message_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_embeds_are_learned() {
        let text = learnable_content("daily report", true, ["all green", "2 warnings"], Vec::<&str>::new());
        assert_eq!(text, "daily report\nall green\n2 warnings");
    }

    #[test]
    fn human_embeds_are_ignored_but_attachments_kept() {
        let text = learnable_content(
            "look at this",
            false,
            ["YouTube video description"],
            ["https://cdn.example/cat.png"],
        );
        assert_eq!(text, "look at this https://cdn.example/cat.png");
    }

    #[test]
    fn ledger_json_uses_legacy_field_names() {
        let raw = r#"{"original_avatar_url":"https://a/1.png","modified_avatar_url":"https://a/2.png","source_message_id":99}"#;
        let ledger: AvatarLedger = serde_json::from_str(raw).unwrap();
        assert_eq!(ledger.source_message_id, 99);
        assert_eq!(ledger.modified_avatar_url, "https://a/2.png");
    }

    #[test]
    fn half_filled_avatar_row_is_not_a_ledger() {
        let row = AvatarRow {
            id: 7,
            original_avatar_url: Some("https://a/1.png".into()),
            modified_avatar_url: None,
            modified_avatar_message_id: Some(3),
        };
        assert!(row.into_ledger().is_none());
    }
}
