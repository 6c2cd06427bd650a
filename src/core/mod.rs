// Core matching exports
pub mod criteria;
pub mod errors;
pub mod filters;
pub mod lifecycle;
pub mod selector;
pub mod states;

pub use errors::MatchError;
pub use filters::{exclusion_set, is_available, is_within_age_range, matches_query_constraints, CandidateQuery};
pub use lifecycle::{RequestEngine, StatusReport};
pub use selector::{CandidateSelector, SelectionResult};
