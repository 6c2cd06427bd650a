use serde::{Deserialize, Serialize};
use crate::models::domain::{MatchStatus, RequestOutcome, UserId, UserSummary};

/// Response for the suggest endpoint
///
/// `possible_matches` is present only while the user is unmatched;
/// `counterpart` only while pending or matched.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionsResponse {
    pub status: MatchStatus,
    #[serde(rename = "possibleMatches", skip_serializing_if = "Option::is_none")]
    pub possible_matches: Option<Vec<UserSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart: Option<UserSummary>,
}

/// Response for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<UserSummary>>,
    /// Set when candidates could not be computed, e.g. no criteria stored yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Candidate list response
#[derive(Debug, Clone, Serialize)]
pub struct CandidatesResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub candidates: Vec<UserSummary>,
    pub count: usize,
}

/// Response after sending a match request
#[derive(Debug, Clone, Serialize)]
pub struct SendRequestResponse {
    pub state: MatchStatus,
    #[serde(rename = "receiverId")]
    pub receiver_id: UserId,
}

/// Outcome of the caller's latest outgoing request
#[derive(Debug, Clone, Serialize)]
pub struct RequestStatusResponse {
    pub status: RequestOutcome,
}

/// Plain confirmation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
