use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a user in the external user directory
pub type UserId = Uuid;

/// Youngest age a criteria range may start at
pub const MIN_AGE: u8 = 18;
/// Oldest age a criteria range may end at
pub const MAX_AGE: u8 = 100;

/// Projection of a user record owned by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    /// Users without an age are never suggested to anyone
    pub age: Option<u8>,
}

/// Inclusive age range a user wants candidates drawn from
///
/// Only constructible through `AgeRange::new` (see `core::criteria`), so a
/// value in hand always satisfies `MIN_AGE <= min_age <= max_age <= MAX_AGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeRange {
    #[serde(rename = "minAge")]
    pub(crate) min_age: u8,
    #[serde(rename = "maxAge")]
    pub(crate) max_age: u8,
}

impl AgeRange {
    pub fn min_age(&self) -> u8 {
        self.min_age
    }

    pub fn max_age(&self) -> u8 {
        self.max_age
    }

    /// Whether an age falls inside the range (bounds included)
    #[inline]
    pub fn contains(&self, age: u8) -> bool {
        age >= self.min_age && age <= self.max_age
    }
}

/// Stored age preference of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchingCriteria {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(flatten)]
    pub range: AgeRange,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Matching status of a single user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    Unmatched,
    Pending,
    Matched,
}

/// Which side of a pending request a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The subject sent the request
    Outgoing,
    /// The subject received the request
    Incoming,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
        }
    }
}

/// Relationship a user currently holds with another user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Unmatched,
    Pending {
        counterpart: UserId,
        direction: Direction,
    },
    Matched {
        counterpart: UserId,
    },
}

impl Relation {
    pub fn status(&self) -> MatchStatus {
        match self {
            Relation::Unmatched => MatchStatus::Unmatched,
            Relation::Pending { .. } => MatchStatus::Pending,
            Relation::Matched { .. } => MatchStatus::Matched,
        }
    }

    pub fn counterpart(&self) -> Option<UserId> {
        match self {
            Relation::Unmatched => None,
            Relation::Pending { counterpart, .. } | Relation::Matched { counterpart } => {
                Some(*counterpart)
            }
        }
    }
}

/// Per-user match record
///
/// Two matched or pending users each hold their own row pointing at the
/// other. Both rows are always written in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    pub subject: UserId,
    pub relation: Relation,
    pub updated_at: DateTime<Utc>,
}

impl MatchState {
    pub fn unmatched(subject: UserId, at: DateTime<Utc>) -> Self {
        Self {
            subject,
            relation: Relation::Unmatched,
            updated_at: at,
        }
    }

    pub fn status(&self) -> MatchStatus {
        self.relation.status()
    }

    pub fn counterpart(&self) -> Option<UserId> {
        self.relation.counterpart()
    }

    /// True when this row is a pending request received from `sender`
    pub fn is_incoming_from(&self, sender: UserId) -> bool {
        matches!(
            self.relation,
            Relation::Pending { counterpart, direction: Direction::Incoming } if counterpart == sender
        )
    }

    /// True when this row is a pending request sent to `receiver`
    pub fn is_outgoing_to(&self, receiver: UserId) -> bool {
        matches!(
            self.relation,
            Relation::Pending { counterpart, direction: Direction::Outgoing } if counterpart == receiver
        )
    }
}

/// Permanent record that `receiver` declined a request from `sender`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclineRecord {
    pub sender: UserId,
    pub receiver: UserId,
    #[serde(rename = "declinedAt")]
    pub declined_at: DateTime<Utc>,
}

impl DeclineRecord {
    /// The other party of the decline, seen from `user`
    pub fn other_party(&self, user: UserId) -> Option<UserId> {
        if self.sender == user {
            Some(self.receiver)
        } else if self.receiver == user {
            Some(self.sender)
        } else {
            None
        }
    }
}

/// Outcome of a user's most recent outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOutcome {
    None,
    Pending,
    Accepted,
    Declined,
}

/// A user in the candidate pool with its current match status, if any
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub user: UserSummary,
    /// `None` when the user has never requested suggestions
    pub status: Option<MatchStatus>,
}
