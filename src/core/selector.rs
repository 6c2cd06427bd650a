use std::collections::HashSet;

use crate::core::errors::MatchError;
use crate::core::filters::{exclusion_set, matches_query_constraints, CandidateQuery};
use crate::models::{AgeRange, DeclineRecord, PoolEntry, UserId, UserSummary};
use crate::services::store::StoreTx;

/// Result of a candidate selection
#[derive(Debug)]
pub struct SelectionResult {
    pub candidates: HashSet<UserSummary>,
    /// Size of the pool before filtering
    pub total_pool: usize,
}

/// Candidate selector - decides who may be suggested to whom
///
/// # Pipeline Stages
/// 1. Exclusion set from the decline ledger (both directions) plus self
/// 2. Age range and null-age filtering
/// 3. Availability: only users holding an unmatched state row
///
/// The result is a set; ordering is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateSelector;

impl CandidateSelector {
    pub fn new() -> Self {
        Self
    }

    /// Select candidates for `requester` from an already fetched pool
    pub fn select(
        &self,
        requester: UserId,
        range: AgeRange,
        pool: Vec<PoolEntry>,
        declines: &[DeclineRecord],
    ) -> SelectionResult {
        let total_pool = pool.len();

        let query = CandidateQuery {
            range,
            excluded: exclusion_set(requester, declines),
        };

        let candidates = pool
            .into_iter()
            .filter(|entry| matches_query_constraints(entry, &query))
            .map(|entry| entry.user)
            .collect();

        SelectionResult {
            candidates,
            total_pool,
        }
    }

    /// Fetch the pool and ledger through `tx` and select candidates
    pub async fn select_candidates(
        &self,
        tx: &mut dyn StoreTx,
        requester: UserId,
        range: AgeRange,
    ) -> Result<HashSet<UserSummary>, MatchError> {
        let declines = tx.declines_involving(requester).await?;
        let pool = tx.candidate_pool(range).await?;

        let result = self.select(requester, range, pool, &declines);

        tracing::debug!(
            "Selected {} candidates for {} from a pool of {} ({} declines)",
            result.candidates.len(),
            requester,
            result.total_pool,
            declines.len()
        );

        Ok(result.candidates)
    }
}
