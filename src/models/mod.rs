// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AgeRange, DeclineRecord, Direction, MatchState, MatchStatus, MatchingCriteria, PoolEntry,
    Relation, RequestOutcome, UserId, UserSummary, MAX_AGE, MIN_AGE,
};
pub use requests::{PreferencesRequest, RespondRequest, SendRequestRequest, UserQuery};
pub use responses::{
    CandidatesResponse, ErrorResponse, HealthResponse, MessageResponse, RequestStatusResponse,
    SendRequestResponse, StatusResponse, SuggestionsResponse,
};
