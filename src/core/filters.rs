use std::collections::HashSet;

use crate::models::{AgeRange, DeclineRecord, MatchStatus, PoolEntry, UserId, UserSummary};

/// Constraints a pool entry must satisfy to become a candidate
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub range: AgeRange,
    pub excluded: HashSet<UserId>,
}

/// Users that must never be suggested to `requester`
///
/// The requester plus everyone on either side of a decline involving them.
pub fn exclusion_set(requester: UserId, declines: &[DeclineRecord]) -> HashSet<UserId> {
    let mut excluded: HashSet<UserId> = declines
        .iter()
        .filter_map(|d| d.other_party(requester))
        .collect();
    excluded.insert(requester);
    excluded
}

/// Check that a user has an age and that it lies within the range
#[inline]
pub fn is_within_age_range(user: &UserSummary, range: &AgeRange) -> bool {
    user.age.is_some_and(|age| range.contains(age))
}

/// Only users that have entered matching and are currently free.
/// A user without a state row has never asked for suggestions.
#[inline]
pub fn is_available(status: Option<MatchStatus>) -> bool {
    status == Some(MatchStatus::Unmatched)
}

/// Check a pool entry against every candidate rule
#[inline]
pub fn matches_query_constraints(entry: &PoolEntry, query: &CandidateQuery) -> bool {
    if query.excluded.contains(&entry.user.id) {
        return false;
    }

    if !is_within_age_range(&entry.user, &query.range) {
        return false;
    }

    is_available(entry.status)
}
