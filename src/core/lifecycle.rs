use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::criteria::{get_criteria, set_criteria};
use crate::core::errors::MatchError;
use crate::core::selector::CandidateSelector;
use crate::core::states::{
    ensure_initialized, get_state, lock_pair, transition_to_matched, transition_to_pending,
    transition_to_unmatched,
};
use crate::models::{
    AgeRange, DeclineRecord, Direction, MatchState, MatchStatus, MatchingCriteria, Relation,
    RequestOutcome, UserId, UserSummary,
};
use crate::services::store::{MatchStore, StoreTx};

/// Snapshot of a user's matching situation
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: MatchStatus,
    /// The other party while pending or matched
    pub counterpart: Option<UserSummary>,
    /// Present only while unmatched
    pub candidates: Option<HashSet<UserSummary>>,
}

/// Request lifecycle engine
///
/// Owns the Unmatched -> Pending -> {Matched, Unmatched} state machine.
/// Each public operation runs in exactly one store transaction; an error
/// anywhere drops the transaction uncommitted.
#[derive(Clone)]
pub struct RequestEngine {
    store: Arc<dyn MatchStore>,
    selector: CandidateSelector,
}

impl RequestEngine {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            store,
            selector: CandidateSelector::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    /// Store the age range `user` wants candidates from
    pub async fn set_preferences(
        &self,
        user: UserId,
        min_age: u8,
        max_age: u8,
    ) -> Result<MatchingCriteria, MatchError> {
        AgeRange::new(min_age, max_age)?;

        let mut tx = self.store.begin().await?;
        require_user(tx.as_mut(), user).await?;
        let criteria = set_criteria(tx.as_mut(), user, min_age, max_age, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!("Preferences for {} set to [{}, {}]", user, min_age, max_age);

        Ok(criteria)
    }

    /// First-contact entry point: store criteria, create the state row and
    /// report candidates if the user is free
    pub async fn suggest_matches(
        &self,
        user: UserId,
        min_age: u8,
        max_age: u8,
    ) -> Result<StatusReport, MatchError> {
        AgeRange::new(min_age, max_age)?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        require_user(tx.as_mut(), user).await?;
        let criteria = set_criteria(tx.as_mut(), user, min_age, max_age, now).await?;
        let state = ensure_initialized(tx.as_mut(), user, now).await?;
        let report = self.report(tx.as_mut(), user, &state, Some(criteria.range)).await?;
        tx.commit().await?;

        tracing::info!(
            "Suggestions for {}: status {:?}, {} candidates",
            user,
            report.status,
            report.candidates.as_ref().map_or(0, HashSet::len)
        );

        Ok(report)
    }

    /// Candidates for `user` under their stored criteria
    pub async fn get_candidates(&self, user: UserId) -> Result<HashSet<UserSummary>, MatchError> {
        let mut tx = self.store.begin().await?;
        let criteria = get_criteria(tx.as_mut(), user).await?;
        let candidates = self
            .selector
            .select_candidates(tx.as_mut(), user, criteria.range)
            .await?;
        tx.commit().await?;

        Ok(candidates)
    }

    /// Current state row of `user`
    pub async fn get_state(&self, user: UserId) -> Result<MatchState, MatchError> {
        let mut tx = self.store.begin().await?;
        let state = get_state(tx.as_mut(), user).await?;
        tx.commit().await?;
        Ok(state)
    }

    /// Send a match request from `sender` to `receiver`
    ///
    /// Re-sending to the receiver of an already pending request returns the
    /// existing state unchanged.
    pub async fn send_request(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<MatchState, MatchError> {
        if sender == receiver {
            return Err(MatchError::InvalidRequest(
                "cannot send a match request to yourself".into(),
            ));
        }
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        require_user(tx.as_mut(), sender).await?;
        require_user(tx.as_mut(), receiver).await?;

        let (sender_row, receiver_row) = lock_pair(tx.as_mut(), sender, receiver, true, now).await?;

        // Read the ledger only once both rows are locked: a decline of this
        // pair commits before the locks are released to us.
        let declines = tx.declines_involving(sender).await?;
        if declines.iter().any(|d| d.other_party(sender) == Some(receiver)) {
            tracing::warn!("Rejected request {} -> {}: pair has declined before", sender, receiver);
            return Err(MatchError::Conflict(format!(
                "users {} and {} have declined each other",
                sender, receiver
            )));
        }

        if let Some(row) = receiver_row.as_ref().filter(|r| r.status() == MatchStatus::Matched) {
            tracing::warn!("Rejected request {} -> {}: receiver is matched", sender, receiver);
            return Err(MatchError::Conflict(format!("user {} is already matched", row.subject)));
        }

        if let (Some(s), Some(r)) = (&sender_row, &receiver_row) {
            if s.is_outgoing_to(receiver) && r.is_incoming_from(sender) {
                tracing::debug!("Request {} -> {} already pending", sender, receiver);
                tx.commit().await?;
                return Ok(s.clone());
            }
        }

        let (sender_row, _) = transition_to_pending(tx.as_mut(), sender, receiver, now)
            .await
            .inspect_err(|e| tracing::warn!("Rejected request {} -> {}: {}", sender, receiver, e))?;
        tx.commit().await?;

        tracing::info!("Match request sent: {} -> {}", sender, receiver);

        Ok(sender_row)
    }

    /// Senders of pending requests targeting `user`
    pub async fn list_incoming_requests(&self, user: UserId) -> Result<Vec<UserSummary>, MatchError> {
        let mut tx = self.store.begin().await?;
        let senders = tx.incoming_requests(user).await?;
        tx.commit().await?;
        Ok(senders)
    }

    /// Accept the pending request `sender` sent to `receiver`
    pub async fn accept_request(
        &self,
        receiver: UserId,
        sender: UserId,
    ) -> Result<MatchState, MatchError> {
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        let (receiver_row, _) = lock_pair(tx.as_mut(), receiver, sender, false, now).await?;
        require_incoming(receiver_row.as_ref(), receiver, sender)?;

        let (receiver_row, _) = transition_to_matched(tx.as_mut(), receiver, sender, now).await?;
        tx.commit().await?;

        tracing::info!("Match request accepted: {} <-> {}", sender, receiver);

        Ok(receiver_row)
    }

    /// Decline the pending request `sender` sent to `receiver`
    ///
    /// Records the decline permanently and resets both users.
    pub async fn decline_request(
        &self,
        receiver: UserId,
        sender: UserId,
    ) -> Result<MatchState, MatchError> {
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        let (receiver_row, sender_row) = lock_pair(tx.as_mut(), receiver, sender, false, now).await?;
        require_incoming(receiver_row.as_ref(), receiver, sender)?;

        if !sender_row.as_ref().is_some_and(|s| s.is_outgoing_to(receiver)) {
            return Err(MatchError::Conflict(format!(
                "user {} is not pending towards {}",
                sender, receiver
            )));
        }

        tx.append_decline(&DeclineRecord {
            sender,
            receiver,
            declined_at: now,
        })
        .await?;
        let receiver_row = transition_to_unmatched(tx.as_mut(), receiver, now).await?;
        transition_to_unmatched(tx.as_mut(), sender, now).await?;
        tx.commit().await?;

        tracing::info!("Match request declined: {} by {}", sender, receiver);

        Ok(receiver_row)
    }

    /// Break the current pending or matched relation of `user`
    ///
    /// Both sides return to unmatched; no decline is recorded.
    pub async fn unmatch(&self, user: UserId) -> Result<MatchState, MatchError> {
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        let counterpart = tx
            .fetch_state(user)
            .await?
            .and_then(|s| s.counterpart())
            .ok_or_else(|| MatchError::NotFound(format!("user {} has no active match", user)))?;

        let (user_row, counterpart_row) = lock_pair(tx.as_mut(), user, counterpart, false, now).await?;
        if user_row.and_then(|s| s.counterpart()) != Some(counterpart) {
            return Err(MatchError::Conflict(format!(
                "match state of {} changed concurrently",
                user
            )));
        }
        if counterpart_row.and_then(|s| s.counterpart()) != Some(user) {
            return Err(MatchError::Conflict(format!(
                "user {} does not point back at {}",
                counterpart, user
            )));
        }

        let user_row = transition_to_unmatched(tx.as_mut(), user, now).await?;
        transition_to_unmatched(tx.as_mut(), counterpart, now).await?;
        tx.commit().await?;

        tracing::info!("Unmatched {} and {}", user, counterpart);

        Ok(user_row)
    }

    /// Outcome of the latest request `user` sent
    pub async fn request_status(&self, user: UserId) -> Result<RequestOutcome, MatchError> {
        let mut tx = self.store.begin().await?;
        let state = tx.fetch_state(user).await?;

        let outcome = match state.as_ref().map(|s| s.relation) {
            None => RequestOutcome::None,
            Some(Relation::Pending { direction: Direction::Outgoing, .. }) => RequestOutcome::Pending,
            Some(Relation::Matched { .. }) => RequestOutcome::Accepted,
            Some(_) => {
                let changed_at = state.as_ref().map(|s| s.updated_at);
                match tx.latest_decline_sent(user).await? {
                    Some(decline) if Some(decline.declined_at) >= changed_at => {
                        RequestOutcome::Declined
                    }
                    _ => RequestOutcome::None,
                }
            }
        };
        tx.commit().await?;

        Ok(outcome)
    }

    /// Status of `user`, with candidates while unmatched
    ///
    /// A user without a state row is reported as unmatched. Fails with
    /// `NotFound` when candidates are needed but no criteria are stored.
    pub async fn get_status(&self, user: UserId) -> Result<StatusReport, MatchError> {
        let mut tx = self.store.begin().await?;
        let state = tx
            .fetch_state(user)
            .await?
            .unwrap_or_else(|| MatchState::unmatched(user, Utc::now()));
        let report = self.report(tx.as_mut(), user, &state, None).await?;
        tx.commit().await?;

        Ok(report)
    }

    async fn report(
        &self,
        tx: &mut dyn StoreTx,
        user: UserId,
        state: &MatchState,
        range: Option<AgeRange>,
    ) -> Result<StatusReport, MatchError> {
        match state.counterpart() {
            Some(counterpart) => Ok(StatusReport {
                status: state.status(),
                counterpart: tx.find_user(counterpart).await?,
                candidates: None,
            }),
            None => {
                let range = match range {
                    Some(range) => range,
                    None => get_criteria(tx, user).await?.range,
                };
                let candidates = self.selector.select_candidates(tx, user, range).await?;
                Ok(StatusReport {
                    status: MatchStatus::Unmatched,
                    counterpart: None,
                    candidates: Some(candidates),
                })
            }
        }
    }
}

async fn require_user(tx: &mut dyn StoreTx, user: UserId) -> Result<UserSummary, MatchError> {
    tx.find_user(user)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("user {} does not exist", user)))
}

fn require_incoming(
    receiver_row: Option<&MatchState>,
    receiver: UserId,
    sender: UserId,
) -> Result<(), MatchError> {
    if receiver_row.is_some_and(|r| r.is_incoming_from(sender)) {
        Ok(())
    } else {
        Err(MatchError::NotFound(format!(
            "no pending request from {} to {}",
            sender, receiver
        )))
    }
}
