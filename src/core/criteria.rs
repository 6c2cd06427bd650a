//! Preference store: one age range per user, overwritten on resubmission.

use chrono::{DateTime, Utc};

use crate::core::errors::MatchError;
use crate::models::{AgeRange, MatchingCriteria, UserId, MAX_AGE, MIN_AGE};
use crate::services::store::StoreTx;

impl AgeRange {
    /// Build a range, rejecting bounds outside `[MIN_AGE, MAX_AGE]` or an
    /// inverted range
    pub fn new(min_age: u8, max_age: u8) -> Result<Self, MatchError> {
        if !(MIN_AGE..=MAX_AGE).contains(&min_age) || !(MIN_AGE..=MAX_AGE).contains(&max_age) {
            return Err(MatchError::Validation(format!(
                "ages must lie within [{}, {}], got [{}, {}]",
                MIN_AGE, MAX_AGE, min_age, max_age
            )));
        }
        if min_age > max_age {
            return Err(MatchError::Validation(format!(
                "min_age {} is greater than max_age {}",
                min_age, max_age
            )));
        }
        Ok(Self { min_age, max_age })
    }
}

/// Insert or overwrite the criteria of `user`
pub async fn set_criteria(
    tx: &mut dyn StoreTx,
    user: UserId,
    min_age: u8,
    max_age: u8,
    now: DateTime<Utc>,
) -> Result<MatchingCriteria, MatchError> {
    let range = AgeRange::new(min_age, max_age)?;
    let criteria = MatchingCriteria {
        user_id: user,
        range,
        updated_at: now,
    };
    tx.upsert_criteria(&criteria).await?;

    tracing::debug!("Stored criteria for {}: [{}, {}]", user, min_age, max_age);

    Ok(criteria)
}

/// Stored criteria of `user`
pub async fn get_criteria(tx: &mut dyn StoreTx, user: UserId) -> Result<MatchingCriteria, MatchError> {
    tx.fetch_criteria(user)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("no matching criteria for user {}", user)))
}
