use serenity::all::Message;
use tracing::debug;

use crate::db::models::CorpusMessage;
use crate::error::ParrotError;
use crate::handlers::BotState;

pub async fn learn_from_message(state: &BotState, msg: &Message) -> anyhow::Result<bool> {
    learn(state, msg.channel_id.get(), CorpusMessage::from_discord(msg)).await
}

/// Records a freshly posted message if its channel allows learning and its
/// author is registered. Returns whether anything new was recorded.
pub async fn learn(state: &BotState, channel_id: u64, message: CorpusMessage) -> anyhow::Result<bool> {
    if !state.channels.can_learn(channel_id).await? {
        return Ok(false);
    }
    if !state.users.is_registered(message.author_id).await? {
        return Ok(false);
    }
    let author_id = message.author_id;
    let added = state.corpora.add(author_id, &[message]).await?;
    Ok(added > 0)
}

/// Deleted messages leave the corpus too. Messages Parrot never learned are fine.
pub async fn forget_message(state: &BotState, message_id: u64) -> anyhow::Result<()> {
    match state.corpora.delete_message(message_id).await {
        Ok(()) => {
            debug!(message_id, "forgot deleted message");
            Ok(())
        }
        Err(e) if matches!(ParrotError::from_anyhow(&e), Some(ParrotError::MessageNotFound(_))) => Ok(()),
        Err(e) => Err(e),
    }
}
