use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::time::Duration;

use crate::models::{
    AgeRange, DeclineRecord, Direction, MatchState, MatchStatus, MatchingCriteria, PoolEntry,
    Relation, UserId, UserSummary,
};
use crate::services::store::{MatchStore, StoreError, StoreTx};

/// Match state column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "match_state", rename_all = "lowercase")]
pub enum StateColumn {
    Unmatched,
    Pending,
    Matched,
}

impl From<MatchStatus> for StateColumn {
    fn from(value: MatchStatus) -> Self {
        match value {
            MatchStatus::Unmatched => StateColumn::Unmatched,
            MatchStatus::Pending => StateColumn::Pending,
            MatchStatus::Matched => StateColumn::Matched,
        }
    }
}

impl From<StateColumn> for MatchStatus {
    fn from(value: StateColumn) -> Self {
        match value {
            StateColumn::Unmatched => MatchStatus::Unmatched,
            StateColumn::Pending => MatchStatus::Pending,
            StateColumn::Matched => MatchStatus::Matched,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    age: Option<i16>,
}

impl TryFrom<UserRow> for UserSummary {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let age = row
            .age
            .map(|a| {
                u8::try_from(a)
                    .map_err(|_| StoreError::Corrupt(format!("user {} has age {}", row.id, a)))
            })
            .transpose()?;
        Ok(UserSummary {
            id: row.id,
            username: row.username,
            age,
        })
    }
}

#[derive(Debug, FromRow)]
struct StateRow {
    subject_id: UserId,
    counterpart_id: Option<UserId>,
    state: StateColumn,
    outgoing: Option<bool>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StateRow> for MatchState {
    type Error = StoreError;

    fn try_from(row: StateRow) -> Result<Self, Self::Error> {
        let relation = match (row.state, row.counterpart_id, row.outgoing) {
            (StateColumn::Unmatched, None, _) => Relation::Unmatched,
            (StateColumn::Pending, Some(counterpart), Some(outgoing)) => Relation::Pending {
                counterpart,
                direction: if outgoing {
                    Direction::Outgoing
                } else {
                    Direction::Incoming
                },
            },
            (StateColumn::Matched, Some(counterpart), _) => Relation::Matched { counterpart },
            (state, counterpart, _) => {
                return Err(StoreError::Corrupt(format!(
                    "match state {} is {:?} with counterpart {:?}",
                    row.subject_id, state, counterpart
                )))
            }
        };
        Ok(MatchState {
            subject: row.subject_id,
            relation,
            updated_at: row.updated_at,
        })
    }
}

/// Column values for a state row: (state, counterpart, outgoing)
fn state_columns(state: &MatchState) -> (StateColumn, Option<UserId>, Option<bool>) {
    let outgoing = match state.relation {
        Relation::Pending { direction, .. } => Some(direction == Direction::Outgoing),
        _ => None,
    };
    (state.status().into(), state.counterpart(), outgoing)
}

#[derive(Debug, FromRow)]
struct CriteriaRow {
    user_id: UserId,
    min_age: i16,
    max_age: i16,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CriteriaRow> for MatchingCriteria {
    type Error = StoreError;

    fn try_from(row: CriteriaRow) -> Result<Self, Self::Error> {
        let corrupt = || {
            StoreError::Corrupt(format!(
                "criteria for {} is [{}, {}]",
                row.user_id, row.min_age, row.max_age
            ))
        };
        let min_age = u8::try_from(row.min_age).map_err(|_| corrupt())?;
        let max_age = u8::try_from(row.max_age).map_err(|_| corrupt())?;
        let range = AgeRange::new(min_age, max_age).map_err(|_| corrupt())?;
        Ok(MatchingCriteria {
            user_id: row.user_id,
            range,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DeclineRow {
    sender_id: UserId,
    receiver_id: UserId,
    declined_at: DateTime<Utc>,
}

impl From<DeclineRow> for DeclineRecord {
    fn from(row: DeclineRow) -> Self {
        DeclineRecord {
            sender: row.sender_id,
            receiver: row.receiver_id,
            declined_at: row.declined_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PoolRow {
    id: UserId,
    username: String,
    age: Option<i16>,
    state: Option<StateColumn>,
}

/// PostgreSQL-backed match store
///
/// Users live in the `users` table maintained by the user directory; this
/// service owns `matching_criteria`, `match_states` and `decline_records`.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store from settings, falling back to pool defaults
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert or update a user directory entry
    pub async fn put_user(&self, user: &UserSummary) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO users (id, username, age)
            VALUES ($1, $2, $3)
            ON CONFLICT (id)
            DO UPDATE SET username = EXCLUDED.username, age = EXCLUDED.age
        "#;

        sqlx::query(query)
            .bind(user.id)
            .bind(&user.username)
            .bind(user.age.map(i16::from))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTx { tx }))
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn find_user(&mut self, id: UserId) -> Result<Option<UserSummary>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, username, age FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(UserSummary::try_from).transpose()
    }

    async fn upsert_criteria(&mut self, criteria: &MatchingCriteria) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO matching_criteria (user_id, min_age, max_age, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id)
            DO UPDATE SET
                min_age = EXCLUDED.min_age,
                max_age = EXCLUDED.max_age,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(criteria.user_id)
            .bind(i16::from(criteria.range.min_age()))
            .bind(i16::from(criteria.range.max_age()))
            .bind(criteria.updated_at)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn fetch_criteria(&mut self, user: UserId) -> Result<Option<MatchingCriteria>, StoreError> {
        let row: Option<CriteriaRow> = sqlx::query_as(
            "SELECT user_id, min_age, max_age, updated_at FROM matching_criteria WHERE user_id = $1",
        )
        .bind(user)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(MatchingCriteria::try_from).transpose()
    }

    async fn fetch_state(&mut self, user: UserId) -> Result<Option<MatchState>, StoreError> {
        let row: Option<StateRow> = sqlx::query_as(
            r#"
            SELECT subject_id, counterpart_id, state, outgoing, updated_at
            FROM match_states
            WHERE subject_id = $1
            "#,
        )
        .bind(user)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(MatchState::try_from).transpose()
    }

    async fn insert_state_if_absent(&mut self, state: &MatchState) -> Result<bool, StoreError> {
        let (column, counterpart, outgoing) = state_columns(state);
        let query = r#"
            INSERT INTO match_states (subject_id, counterpart_id, state, outgoing, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (subject_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(state.subject)
            .bind(counterpart)
            .bind(column)
            .bind(outgoing)
            .bind(state.updated_at)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn lock_states(&mut self, users: &[UserId]) -> Result<Vec<MatchState>, StoreError> {
        // Ascending id order keeps concurrent lockers from deadlocking.
        let rows: Vec<StateRow> = sqlx::query_as(
            r#"
            SELECT subject_id, counterpart_id, state, outgoing, updated_at
            FROM match_states
            WHERE subject_id = ANY($1)
            ORDER BY subject_id
            FOR UPDATE
            "#,
        )
        .bind(users)
        .fetch_all(&mut *self.tx)
        .await?;

        tracing::debug!("Locked {} of {} match state rows", rows.len(), users.len());

        rows.into_iter().map(MatchState::try_from).collect()
    }

    async fn save_state(&mut self, state: &MatchState) -> Result<(), StoreError> {
        let (column, counterpart, outgoing) = state_columns(state);
        let query = r#"
            UPDATE match_states
            SET counterpart_id = $2, state = $3, outgoing = $4, updated_at = $5
            WHERE subject_id = $1
        "#;

        let result = sqlx::query(query)
            .bind(state.subject)
            .bind(counterpart)
            .bind(column)
            .bind(outgoing)
            .bind(state.updated_at)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "no match state row for {}",
                state.subject
            )));
        }

        Ok(())
    }

    async fn append_decline(&mut self, record: &DeclineRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO decline_records (sender_id, receiver_id, declined_at) VALUES ($1, $2, $3)",
        )
        .bind(record.sender)
        .bind(record.receiver)
        .bind(record.declined_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn declines_involving(&mut self, user: UserId) -> Result<Vec<DeclineRecord>, StoreError> {
        let rows: Vec<DeclineRow> = sqlx::query_as(
            r#"
            SELECT sender_id, receiver_id, declined_at
            FROM decline_records
            WHERE sender_id = $1 OR receiver_id = $1
            "#,
        )
        .bind(user)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(DeclineRecord::from).collect())
    }

    async fn latest_decline_sent(
        &mut self,
        user: UserId,
    ) -> Result<Option<DeclineRecord>, StoreError> {
        let row: Option<DeclineRow> = sqlx::query_as(
            r#"
            SELECT sender_id, receiver_id, declined_at
            FROM decline_records
            WHERE sender_id = $1
            ORDER BY declined_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(DeclineRecord::from))
    }

    async fn candidate_pool(&mut self, range: AgeRange) -> Result<Vec<PoolEntry>, StoreError> {
        let rows: Vec<PoolRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.age, s.state
            FROM users u
            LEFT JOIN match_states s ON s.subject_id = u.id
            WHERE u.age IS NOT NULL AND u.age BETWEEN $1 AND $2
            "#,
        )
        .bind(i16::from(range.min_age()))
        .bind(i16::from(range.max_age()))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status = row.state.map(MatchStatus::from);
                let user = UserSummary::try_from(UserRow {
                    id: row.id,
                    username: row.username,
                    age: row.age,
                })?;
                Ok::<_, StoreError>(PoolEntry { user, status })
            })
            .collect()
    }

    async fn incoming_requests(&mut self, user: UserId) -> Result<Vec<UserSummary>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.age
            FROM match_states s
            JOIN users u ON u.id = s.subject_id
            WHERE s.counterpart_id = $1 AND s.state = 'pending' AND s.outgoing
            "#,
        )
        .bind(user)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(UserSummary::try_from).collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
