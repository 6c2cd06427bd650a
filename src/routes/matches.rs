use actix_web::{web, HttpResponse};
use std::collections::HashSet;
use validator::Validate;

use crate::core::{MatchError, RequestEngine};
use crate::models::{
    CandidatesResponse, HealthResponse, MatchStatus, MessageResponse, PreferencesRequest,
    RequestStatusResponse, RespondRequest, SendRequestRequest, SendRequestResponse,
    StatusResponse, SuggestionsResponse, UserQuery, UserSummary,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: RequestEngine,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/preferences", web::put().to(set_preferences))
        .route("/matches/suggest", web::post().to(suggest_matches))
        .route("/matches/candidates", web::get().to(get_candidates))
        .route("/matches/status", web::get().to(get_status))
        .route("/matches/requests", web::post().to(send_request))
        .route("/matches/requests/incoming", web::get().to(list_incoming))
        .route("/matches/requests/status", web::get().to(request_status))
        .route("/matches/requests/accept", web::post().to(accept_request))
        .route("/matches/requests/decline", web::post().to(decline_request))
        .route("/matches/unmatch", web::post().to(unmatch));
}

/// Candidate sets carry no order; render them by username for stable output.
fn render(candidates: HashSet<UserSummary>) -> Vec<UserSummary> {
    let mut list: Vec<UserSummary> = candidates.into_iter().collect();
    list.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.id.cmp(&b.id)));
    list
}

fn validate(req: &PreferencesRequest) -> Result<(), MatchError> {
    req.validate().map_err(|errors| {
        tracing::info!("Validation failed for preferences of {}: {:?}", req.user_id, errors);
        MatchError::Validation(errors.to_string())
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let healthy = state.engine.store().health_check().await.unwrap_or(false);

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Store age preferences
///
/// PUT /api/v1/preferences
///
/// Request body:
/// ```json
/// { "userId": "uuid", "minAge": 18, "maxAge": 30 }
/// ```
async fn set_preferences(
    state: web::Data<AppState>,
    req: web::Json<PreferencesRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&req)?;

    let criteria = state
        .engine
        .set_preferences(req.user_id, req.min_age, req.max_age)
        .await?;

    Ok(HttpResponse::Ok().json(criteria))
}

/// Store preferences and get suggestions in one call
///
/// POST /api/v1/matches/suggest
///
/// Same body as `PUT /preferences`. Responds with the caller's status and,
/// while unmatched, the possible matches.
async fn suggest_matches(
    state: web::Data<AppState>,
    req: web::Json<PreferencesRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&req)?;

    let report = state
        .engine
        .suggest_matches(req.user_id, req.min_age, req.max_age)
        .await?;

    Ok(HttpResponse::Created().json(SuggestionsResponse {
        status: report.status,
        possible_matches: report.candidates.map(render),
        counterpart: report.counterpart,
    }))
}

/// GET /api/v1/matches/candidates?userId={userId}
async fn get_candidates(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, MatchError> {
    let candidates = render(state.engine.get_candidates(query.user_id).await?);

    Ok(HttpResponse::Ok().json(CandidatesResponse {
        user_id: query.user_id,
        count: candidates.len(),
        candidates,
    }))
}

/// GET /api/v1/matches/status?userId={userId}
///
/// Missing criteria is not an error here: the caller gets its status with
/// an advisory instead of a candidate list.
async fn get_status(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, MatchError> {
    let response = match state.engine.get_status(query.user_id).await {
        Ok(report) => StatusResponse {
            status: report.status,
            counterpart: report.counterpart,
            candidates: report.candidates.map(render),
            advisory: None,
        },
        Err(MatchError::NotFound(message)) => StatusResponse {
            status: MatchStatus::Unmatched,
            counterpart: None,
            candidates: None,
            advisory: Some(message),
        },
        Err(e) => return Err(e),
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Send a match request
///
/// POST /api/v1/matches/requests
///
/// Request body:
/// ```json
/// { "userId": "uuid", "receiverId": "uuid" }
/// ```
async fn send_request(
    state: web::Data<AppState>,
    req: web::Json<SendRequestRequest>,
) -> Result<HttpResponse, MatchError> {
    let sender_state = state.engine.send_request(req.user_id, req.receiver_id).await?;

    Ok(HttpResponse::Created().json(SendRequestResponse {
        state: sender_state.status(),
        receiver_id: req.receiver_id,
    }))
}

/// GET /api/v1/matches/requests/incoming?userId={userId}
async fn list_incoming(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, MatchError> {
    let senders = state.engine.list_incoming_requests(query.user_id).await?;
    Ok(HttpResponse::Ok().json(senders))
}

/// GET /api/v1/matches/requests/status?userId={userId}
async fn request_status(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, MatchError> {
    let status = state.engine.request_status(query.user_id).await?;
    Ok(HttpResponse::Ok().json(RequestStatusResponse { status }))
}

/// POST /api/v1/matches/requests/accept
async fn accept_request(
    state: web::Data<AppState>,
    req: web::Json<RespondRequest>,
) -> Result<HttpResponse, MatchError> {
    state.engine.accept_request(req.user_id, req.sender_id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Match request Accepted successfully".to_string(),
    }))
}

/// POST /api/v1/matches/requests/decline
async fn decline_request(
    state: web::Data<AppState>,
    req: web::Json<RespondRequest>,
) -> Result<HttpResponse, MatchError> {
    state.engine.decline_request(req.user_id, req.sender_id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Match request Declined successfully".to_string(),
    }))
}

/// POST /api/v1/matches/unmatch
async fn unmatch(
    state: web::Data<AppState>,
    req: web::Json<UserQuery>,
) -> Result<HttpResponse, MatchError> {
    state.engine.unmatch(req.user_id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Unmatched successfully".to_string(),
    }))
}
