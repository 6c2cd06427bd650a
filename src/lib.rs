//! Lume Match - match request state machine for Lume dating app
//!
//! Users store an age range, receive candidate suggestions that exclude
//! declined and already engaged users, and move through
//! Unmatched -> Pending -> Matched (or back to Unmatched on decline).

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{CandidateSelector, MatchError, RequestEngine, StatusReport};
pub use models::{AgeRange, DeclineRecord, MatchState, MatchStatus, MatchingCriteria, UserId, UserSummary};
pub use services::{InMemoryStore, MatchStore, PostgresStore};
