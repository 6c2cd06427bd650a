use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{
    AgeRange, DeclineRecord, Direction, MatchState, MatchingCriteria, PoolEntry, Relation,
    UserId, UserSummary,
};
use crate::services::store::{MatchStore, StoreError, StoreTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<UserId, UserSummary>,
    criteria: HashMap<UserId, MatchingCriteria>,
    states: HashMap<UserId, MatchState>,
    declines: Vec<DeclineRecord>,
}

/// In-process store
///
/// A transaction holds the table lock from `begin` until it is committed or
/// dropped, so transactions are fully serialized. Writes go to a staged copy
/// that only replaces the tables on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user directory entry
    pub async fn put_user(&self, user: UserSummary) {
        let mut tables = self.tables.lock().await;
        tables.users.insert(user.id, user);
    }

    /// Snapshot of the decline ledger
    pub async fn decline_records(&self) -> Vec<DeclineRecord> {
        self.tables.lock().await.declines.clone()
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_user(&mut self, id: UserId) -> Result<Option<UserSummary>, StoreError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn upsert_criteria(&mut self, criteria: &MatchingCriteria) -> Result<(), StoreError> {
        self.staged.criteria.insert(criteria.user_id, criteria.clone());
        Ok(())
    }

    async fn fetch_criteria(&mut self, user: UserId) -> Result<Option<MatchingCriteria>, StoreError> {
        Ok(self.staged.criteria.get(&user).cloned())
    }

    async fn fetch_state(&mut self, user: UserId) -> Result<Option<MatchState>, StoreError> {
        Ok(self.staged.states.get(&user).cloned())
    }

    async fn insert_state_if_absent(&mut self, state: &MatchState) -> Result<bool, StoreError> {
        if self.staged.states.contains_key(&state.subject) {
            return Ok(false);
        }
        self.staged.states.insert(state.subject, state.clone());
        Ok(true)
    }

    async fn lock_states(&mut self, users: &[UserId]) -> Result<Vec<MatchState>, StoreError> {
        // The whole table set is already held by this transaction.
        Ok(users
            .iter()
            .filter_map(|id| self.staged.states.get(id).cloned())
            .collect())
    }

    async fn save_state(&mut self, state: &MatchState) -> Result<(), StoreError> {
        match self.staged.states.get_mut(&state.subject) {
            Some(row) => {
                *row = state.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!(
                "no match state row for {}",
                state.subject
            ))),
        }
    }

    async fn append_decline(&mut self, record: &DeclineRecord) -> Result<(), StoreError> {
        self.staged.declines.push(record.clone());
        Ok(())
    }

    async fn declines_involving(&mut self, user: UserId) -> Result<Vec<DeclineRecord>, StoreError> {
        Ok(self
            .staged
            .declines
            .iter()
            .filter(|d| d.sender == user || d.receiver == user)
            .cloned()
            .collect())
    }

    async fn latest_decline_sent(
        &mut self,
        user: UserId,
    ) -> Result<Option<DeclineRecord>, StoreError> {
        // Ledger is append-only, so the last match is the latest.
        Ok(self
            .staged
            .declines
            .iter()
            .rev()
            .find(|d| d.sender == user)
            .cloned())
    }

    async fn candidate_pool(&mut self, range: AgeRange) -> Result<Vec<PoolEntry>, StoreError> {
        let states = &self.staged.states;
        Ok(self
            .staged
            .users
            .values()
            .filter(|u| u.age.is_some_and(|age| range.contains(age)))
            .map(|u| PoolEntry {
                user: u.clone(),
                status: states.get(&u.id).map(MatchState::status),
            })
            .collect())
    }

    async fn incoming_requests(&mut self, user: UserId) -> Result<Vec<UserSummary>, StoreError> {
        Ok(self
            .staged
            .states
            .values()
            .filter(|s| {
                matches!(
                    s.relation,
                    Relation::Pending { counterpart, direction: Direction::Outgoing } if counterpart == user
                )
            })
            .filter_map(|s| self.staged.users.get(&s.subject).cloned())
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
