//! Room moderation transitions. These are pure functions over the metadata
//! blob; the HTTP layer persists the whole structure through the provider
//! after every transition. There is no compare-and-swap at that boundary, so
//! two moderators acting at once can lose one update (see DESIGN.md).

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use parlor_models::room::{KickRecord, RoomMetadata};
use parlor_models::user::UserSummary;

#[derive(Debug, Clone, PartialEq)]
pub enum KickOutcome {
    /// Record appended; the caller should remove the live participant via
    /// the provider.
    Recorded,
    /// An active record already exists; nothing changed.
    AlreadyKicked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejoinDecision {
    Granted {
        /// True when an expired record was removed and the metadata needs
        /// persisting.
        record_removed: bool,
    },
    Denied {
        record: KickRecord,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoOwnerChange {
    Added,
    Removed,
}

/// Record a kick. Kicker must be owner or co-owner; a repeat kick of a user
/// with an active record is a no-op.
pub fn kick(
    meta: &mut RoomMetadata,
    kicker_id: i64,
    record: KickRecord,
) -> Result<KickOutcome, CoreError> {
    if !meta.is_moderator(kicker_id) {
        return Err(CoreError::Forbidden);
    }
    if meta
        .kicked_participants
        .iter()
        .any(|existing| existing.kicked == record.kicked)
    {
        return Ok(KickOutcome::AlreadyKicked);
    }
    meta.kicked_participants.push(record);
    Ok(KickOutcome::Recorded)
}

/// Decide whether a user may rejoin. Expired records are removed here, on the
/// rejoin attempt; there is no background sweep. The timeout boundary is
/// exclusive: at exactly `timeout` seconds elapsed the user is still denied.
pub fn evaluate_rejoin(meta: &mut RoomMetadata, user_id: i64, now: DateTime<Utc>) -> RejoinDecision {
    let Some(index) = meta
        .kicked_participants
        .iter()
        .position(|record| record.kicked == user_id)
    else {
        return RejoinDecision::Granted {
            record_removed: false,
        };
    };

    let record = &meta.kicked_participants[index];
    if record.is_permanent() {
        return RejoinDecision::Denied {
            record: record.clone(),
        };
    }

    let elapsed = (now - record.kicked_at).num_seconds();
    if elapsed <= record.timeout {
        return RejoinDecision::Denied {
            record: record.clone(),
        };
    }

    meta.kicked_participants.remove(index);
    RejoinDecision::Granted {
        record_removed: true,
    }
}

/// Add or remove a co-owner. Self-inverse: toggling twice restores the
/// original membership. The owner can never be a co-owner.
pub fn toggle_co_owner(
    meta: &mut RoomMetadata,
    actor_id: i64,
    target: UserSummary,
) -> Result<CoOwnerChange, CoreError> {
    if !meta.is_moderator(actor_id) {
        return Err(CoreError::Forbidden);
    }
    if meta.owner.as_ref().is_some_and(|owner| owner.id == target.id) {
        return Err(CoreError::BadRequest(
            "the owner cannot be a co-owner".to_string(),
        ));
    }

    if let Some(index) = meta.co_owners.iter().position(|co| co.id == target.id) {
        meta.co_owners.remove(index);
        Ok(CoOwnerChange::Removed)
    } else {
        meta.co_owners.push(target);
        Ok(CoOwnerChange::Added)
    }
}

pub fn set_welcome_message(
    meta: &mut RoomMetadata,
    actor_id: i64,
    text: &str,
) -> Result<(), CoreError> {
    if !meta.is_moderator(actor_id) {
        return Err(CoreError::Forbidden);
    }
    meta.welcome_message = text.to_string();
    Ok(())
}
