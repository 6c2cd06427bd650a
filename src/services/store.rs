//! Storage abstraction for match state.
//!
//! Every engine operation opens one [`StoreTx`], performs all of its reads
//! and writes through it and commits at the end. Dropping a transaction
//! without committing discards everything it wrote.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    AgeRange, DeclineRecord, MatchState, MatchingCriteria, PoolEntry, UserId, UserSummary,
};

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// A storage backend able to open transactions
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    /// Cheap liveness probe for the health endpoint
    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// One open transaction
///
/// Row-level primitives only; match rules live in `core`.
#[async_trait]
pub trait StoreTx: Send {
    /// Look up a user in the directory
    async fn find_user(&mut self, id: UserId) -> Result<Option<UserSummary>, StoreError>;

    /// Insert or overwrite the criteria row for `criteria.user_id`
    async fn upsert_criteria(&mut self, criteria: &MatchingCriteria) -> Result<(), StoreError>;

    async fn fetch_criteria(&mut self, user: UserId) -> Result<Option<MatchingCriteria>, StoreError>;

    /// Read a state row without locking it
    async fn fetch_state(&mut self, user: UserId) -> Result<Option<MatchState>, StoreError>;

    /// Insert `state` unless a row for its subject exists. Returns whether
    /// a row was inserted.
    async fn insert_state_if_absent(&mut self, state: &MatchState) -> Result<bool, StoreError>;

    /// Lock the existing rows of `users` until the transaction ends and
    /// return them. Missing rows are skipped.
    async fn lock_states(&mut self, users: &[UserId]) -> Result<Vec<MatchState>, StoreError>;

    /// Overwrite an existing state row
    async fn save_state(&mut self, state: &MatchState) -> Result<(), StoreError>;

    async fn append_decline(&mut self, record: &DeclineRecord) -> Result<(), StoreError>;

    /// All decline records where `user` is sender or receiver
    async fn declines_involving(&mut self, user: UserId) -> Result<Vec<DeclineRecord>, StoreError>;

    /// Most recent decline of a request that `user` sent
    async fn latest_decline_sent(&mut self, user: UserId)
        -> Result<Option<DeclineRecord>, StoreError>;

    /// Users whose age lies in `range`, with their current status
    async fn candidate_pool(&mut self, range: AgeRange) -> Result<Vec<PoolEntry>, StoreError>;

    /// Senders of pending requests targeting `user`
    async fn incoming_requests(&mut self, user: UserId) -> Result<Vec<UserSummary>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
