//! Match state store.
//!
//! Each user owns at most one [`MatchState`] row. A pending or matched pair
//! is two rows pointing at each other; every transition here rewrites both
//! rows inside the caller's transaction, never one without the other.

use chrono::{DateTime, Utc};

use crate::core::errors::MatchError;
use crate::models::{Direction, MatchState, Relation, UserId};
use crate::services::store::StoreTx;

/// Create an unmatched row for `user` unless one exists
pub async fn ensure_initialized(
    tx: &mut dyn StoreTx,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<MatchState, MatchError> {
    let fresh = MatchState::unmatched(user, now);
    if tx.insert_state_if_absent(&fresh).await? {
        tracing::debug!("Initialized match state for {}", user);
        return Ok(fresh);
    }
    get_state(tx, user).await
}

/// Current row of `user`
pub async fn get_state(tx: &mut dyn StoreTx, user: UserId) -> Result<MatchState, MatchError> {
    tx.fetch_state(user)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("no match state for user {}", user)))
}

/// Lock the rows of `a` and `b`, creating missing ones first when
/// `create_missing` is set. A row that is still missing comes back as `None`.
pub async fn lock_pair(
    tx: &mut dyn StoreTx,
    a: UserId,
    b: UserId,
    create_missing: bool,
    now: DateTime<Utc>,
) -> Result<(Option<MatchState>, Option<MatchState>), MatchError> {
    if create_missing {
        // Same order as the lock below so concurrent inserts queue up cleanly.
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        tx.insert_state_if_absent(&MatchState::unmatched(first, now)).await?;
        tx.insert_state_if_absent(&MatchState::unmatched(second, now)).await?;
    }

    let rows = tx.lock_states(&[a, b]).await?;
    let pick = |id: UserId| rows.iter().find(|s| s.subject == id).cloned();
    Ok((pick(a), pick(b)))
}

/// Compute the rows for `sender` requesting `receiver`
///
/// A matched party cannot be targeted or send, and a party already pending
/// with someone else cannot take a second request. Re-planning an identical
/// pending pair is allowed.
pub fn plan_pending(
    sender: &MatchState,
    receiver: &MatchState,
    now: DateTime<Utc>,
) -> Result<(MatchState, MatchState), MatchError> {
    if sender.subject == receiver.subject {
        return Err(MatchError::InvalidRequest(
            "cannot send a match request to yourself".into(),
        ));
    }

    for (side, other) in [(sender, receiver), (receiver, sender)] {
        match side.relation {
            Relation::Unmatched => {}
            Relation::Matched { .. } => {
                return Err(MatchError::Conflict(format!(
                    "user {} is already matched",
                    side.subject
                )))
            }
            Relation::Pending { counterpart, .. } if counterpart != other.subject => {
                return Err(MatchError::Conflict(format!(
                    "user {} already has a pending request",
                    side.subject
                )))
            }
            Relation::Pending { .. } => {}
        }
    }

    if sender.is_incoming_from(receiver.subject) {
        return Err(MatchError::Conflict(format!(
            "a request from {} to {} is already pending",
            receiver.subject, sender.subject
        )));
    }

    let pending = |subject: UserId, counterpart: UserId, direction: Direction| MatchState {
        subject,
        relation: Relation::Pending {
            counterpart,
            direction,
        },
        updated_at: now,
    };

    Ok((
        pending(sender.subject, receiver.subject, Direction::Outgoing),
        pending(receiver.subject, sender.subject, Direction::Incoming),
    ))
}

/// Compute the rows for a pending pair becoming matched
///
/// Both rows must be pending towards each other from opposite sides;
/// anything else is a stale or forged accept.
pub fn plan_matched(
    a: &MatchState,
    b: &MatchState,
    now: DateTime<Utc>,
) -> Result<(MatchState, MatchState), MatchError> {
    let consistent = match (a.relation, b.relation) {
        (
            Relation::Pending {
                counterpart: a_cp,
                direction: a_dir,
            },
            Relation::Pending {
                counterpart: b_cp,
                direction: b_dir,
            },
        ) => a_cp == b.subject && b_cp == a.subject && a_dir == b_dir.reverse(),
        _ => false,
    };

    if !consistent {
        return Err(MatchError::Conflict(format!(
            "users {} and {} are not pending with each other",
            a.subject, b.subject
        )));
    }

    let matched = |subject: UserId, counterpart: UserId| MatchState {
        subject,
        relation: Relation::Matched { counterpart },
        updated_at: now,
    };

    Ok((matched(a.subject, b.subject), matched(b.subject, a.subject)))
}

/// Set `a` and `b` pending, `a` being the sender. Creates missing rows.
pub async fn transition_to_pending(
    tx: &mut dyn StoreTx,
    a: UserId,
    b: UserId,
    now: DateTime<Utc>,
) -> Result<(MatchState, MatchState), MatchError> {
    let (sender, receiver) = match lock_pair(tx, a, b, true, now).await? {
        (Some(sender), Some(receiver)) => (sender, receiver),
        _ => {
            return Err(MatchError::NotFound(format!(
                "match state rows for {} and {} could not be created",
                a, b
            )))
        }
    };

    let (sender, receiver) = plan_pending(&sender, &receiver, now)?;
    tx.save_state(&sender).await?;
    tx.save_state(&receiver).await?;

    Ok((sender, receiver))
}

/// Set a pending pair to matched
pub async fn transition_to_matched(
    tx: &mut dyn StoreTx,
    a: UserId,
    b: UserId,
    now: DateTime<Utc>,
) -> Result<(MatchState, MatchState), MatchError> {
    let (a_row, b_row) = match lock_pair(tx, a, b, false, now).await? {
        (Some(a_row), Some(b_row)) => (a_row, b_row),
        _ => {
            return Err(MatchError::Conflict(format!(
                "users {} and {} are not pending with each other",
                a, b
            )))
        }
    };

    let (a_row, b_row) = plan_matched(&a_row, &b_row, now)?;
    tx.save_state(&a_row).await?;
    tx.save_state(&b_row).await?;

    Ok((a_row, b_row))
}

/// Reset one user to unmatched
///
/// The counterpart's row is left alone; callers that break a pair reset
/// both sides themselves.
pub async fn transition_to_unmatched(
    tx: &mut dyn StoreTx,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<MatchState, MatchError> {
    let rows = tx.lock_states(&[user]).await?;
    if rows.is_empty() {
        return Err(MatchError::NotFound(format!("no match state for user {}", user)));
    }

    let reset = MatchState::unmatched(user, now);
    tx.save_state(&reset).await?;

    Ok(reset)
}
