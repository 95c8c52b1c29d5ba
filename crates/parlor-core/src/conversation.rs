//! The DM mutation pipeline. Every inbound `ConversationEvent` passes through
//! [`apply`]: authorization first, then persistence, and the canonical
//! re-fetched message is what the caller broadcasts. The client payload is
//! never forwarded as-is.

use crate::error::CoreError;
use chrono::Utc;
use parlor_db::{conversations, messages, reactions, users, DbPool};
use parlor_models::event::{ConversationAction, ConversationEvent};
use parlor_models::message::Message;
use parlor_models::user::UserSummary;
use tracing::debug;

/// Validate and persist one DM mutation, returning the canonical message
/// with reactions resolved.
pub async fn apply(
    pool: &DbPool,
    actor: &UserSummary,
    event: &ConversationEvent,
) -> Result<Message, CoreError> {
    // The transport-bound identity is authoritative; a payload claiming to be
    // someone else is rejected outright.
    if event.user_id != actor.id {
        return Err(CoreError::Forbidden);
    }

    if event.broadcast_to.len() != 2 {
        return Err(CoreError::BadRequest(
            "broadcastTo must name exactly two participants".to_string(),
        ));
    }
    let peer = match event.broadcast_to.iter().find(|&&id| id != actor.id) {
        Some(&peer) if event.broadcast_to.contains(&actor.id) => peer,
        _ => {
            return Err(CoreError::BadRequest(
                "broadcastTo must include the sender and one peer".to_string(),
            ))
        }
    };

    // Friendship gates every mutation, before anything touches the database.
    if !users::are_friends(pool, actor.id, peer).await? {
        return Err(CoreError::Forbidden);
    }

    match &event.action {
        ConversationAction::Create(draft) => {
            // The conversation is derived from the authenticated pair, not
            // from anything the client sent.
            let conversation_id = conversations::find_or_create(pool, actor.id, peer).await?;
            messages::insert_message(
                pool,
                &draft.id,
                &draft.content,
                conversation_id,
                actor.id,
                Utc::now(),
                draft.reply_to_id.as_deref(),
            )
            .await?;
            debug!(message_id = %draft.id, conversation_id, "message created");
        }
        ConversationAction::Edit { id, content } => {
            let current = messages::get_message(pool, id)
                .await?
                .ok_or(CoreError::NotFound)?;
            if current.user_id != actor.id {
                return Err(CoreError::Forbidden);
            }
            if current.is_deleted {
                return Err(CoreError::BadRequest(
                    "cannot edit a deleted message".to_string(),
                ));
            }
            messages::update_message(pool, id, content, false, true).await?;
        }
        ConversationAction::Delete { id } => {
            let current = messages::get_message(pool, id)
                .await?
                .ok_or(CoreError::NotFound)?;
            if current.user_id != actor.id {
                return Err(CoreError::Forbidden);
            }
            // Soft delete; the content stays in the row.
            messages::update_message(pool, id, &current.content, true, current.is_edited).await?;
        }
        ConversationAction::Reaction(change) => {
            if messages::get_message(pool, &change.id).await?.is_none() {
                return Err(CoreError::NotFound);
            }
            if change.to_remove {
                reactions::delete(pool, &change.reaction, &change.id, actor.id).await?;
            } else {
                reactions::insert(pool, &change.reaction, &change.id, actor.id).await?;
            }
        }
    }

    messages::get_message(pool, event.action.message_id())
        .await?
        .ok_or(CoreError::NotFound)
}
