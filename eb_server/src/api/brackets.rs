//! Bracket and match API handlers.
//!
//! # Examples
//!
//! Create a bracket from explicit teams:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/brackets \
//!   -H "Content-Type: application/json" \
//!   -d '{"event_id": 7, "sport_name": "Football", "bracket_type": "single_elimination", "team_ids": [11, 12, 13, 14]}'
//! ```
//!
//! Record a result:
//! ```bash
//! curl -X PUT http://localhost:8080/api/v1/matches/1/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"team1_score": 3, "team2_score": 1, "winner_team_id": 11}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use event_bracket::bracket::{
    BracketError, BracketId, BracketState, BracketSummary, BracketType, EventId, MatchId,
    RoundOutcome, TeamId, TeamStanding,
};
use event_bracket::db::BracketStore;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::request_id::RequestId;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct CreateBracketRequest {
    pub event_id: EventId,
    pub sport_name: String,
    /// `single_elimination` or `round_robin`
    pub bracket_type: String,
    /// Teams to seed; the event's confirmed roster when omitted
    #[serde(default)]
    pub team_ids: Option<Vec<TeamId>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBracketResponse {
    pub bracket_id: BracketId,
}

#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    pub team1_score: i32,
    pub team2_score: i32,
    pub winner_team_id: TeamId,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRoundRequest {
    pub current_round: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChampionResponse {
    pub champion_team_id: Option<TeamId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    #[serde(default)]
    pub match_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub venue: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Stable machine-readable code for an engine error
pub fn error_code(err: &BracketError) -> &'static str {
    match err {
        BracketError::InvalidBracketType(_) => "invalid_bracket_type",
        BracketError::InsufficientTeams { .. } => "insufficient_teams",
        BracketError::DuplicateTeam(_) => "duplicate_team",
        BracketError::BracketExists { .. } => "bracket_exists",
        BracketError::BracketNotFound(_) => "bracket_not_found",
        BracketError::MatchNotFound(_) => "match_not_found",
        BracketError::InvalidWinner { .. } => "invalid_winner",
        BracketError::InvalidScore(_) => "invalid_score",
        BracketError::MatchAlreadyCompleted(_) => "match_already_completed",
        BracketError::BracketCompleted(_) => "bracket_completed",
        BracketError::RoundNotComplete { .. } => "round_not_complete",
        BracketError::InconsistentState(_) => "inconsistent_state",
        BracketError::Timeout(_) => "timeout",
        BracketError::Database(_) => "database_error",
    }
}

/// HTTP status for an engine error
pub fn error_status(err: &BracketError) -> StatusCode {
    match err {
        BracketError::InvalidBracketType(_)
        | BracketError::InsufficientTeams { .. }
        | BracketError::DuplicateTeam(_)
        | BracketError::InvalidWinner { .. }
        | BracketError::InvalidScore(_) => StatusCode::BAD_REQUEST,
        BracketError::BracketNotFound(_) | BracketError::MatchNotFound(_) => StatusCode::NOT_FOUND,
        BracketError::BracketExists { .. }
        | BracketError::MatchAlreadyCompleted(_)
        | BracketError::BracketCompleted(_)
        | BracketError::RoundNotComplete { .. } => StatusCode::CONFLICT,
        BracketError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        BracketError::InconsistentState(_) | BracketError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn api_error(err: BracketError) -> ApiError {
    let code = error_code(&err);
    let status = error_status(&err);

    if err.is_client_error() {
        tracing::debug!(code, error = %err, "Rejected bracket request");
    } else {
        tracing::error!(code, error = %err, "Bracket request failed");
    }
    metrics::api_errors(code);

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
            code: code.to_string(),
        }),
    )
}

/// Create a bracket and its first round.
///
/// # Response
///
/// Returns `201 Created` with `{"bracket_id": 1}`.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown bracket type, fewer than 2 teams, duplicate team
/// - `409 Conflict`: The event already has a bracket for this sport
pub async fn create_bracket<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    request_id: RequestId,
    Json(req): Json<CreateBracketRequest>,
) -> Result<(StatusCode, Json<CreateBracketResponse>), ApiError> {
    let bracket_type: BracketType = req.bracket_type.parse().map_err(api_error)?;

    let bracket_id = match req.team_ids {
        Some(team_ids) => {
            state
                .manager
                .create_bracket(req.event_id, &req.sport_name, bracket_type, &team_ids)
                .await
        }
        None => {
            state
                .manager
                .create_bracket_from_roster(
                    state.roster.as_ref(),
                    req.event_id,
                    &req.sport_name,
                    bracket_type,
                )
                .await
        }
    }
    .map_err(api_error)?;

    metrics::brackets_created(bracket_type);
    tracing::info!(
        request_id = request_id.as_str(),
        bracket_id,
        event_id = req.event_id,
        "Bracket created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateBracketResponse { bracket_id }),
    ))
}

/// Bracket with progress and all matches.
pub async fn get_bracket<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<BracketState> {
    state
        .manager
        .get_bracket_state(bracket_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Points table of a bracket.
pub async fn get_standings<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<Vec<TeamStanding>> {
    state
        .manager
        .compute_standings(bracket_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Brackets of an event, newest first.
pub async fn list_event_brackets<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Vec<BracketSummary>> {
    state
        .manager
        .list_event_brackets(event_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Record a match result.
///
/// # Response
///
/// Returns `200 OK` with the round outcome, e.g.
/// `{"outcome": "advanced", "next_round": 2, "matches_created": 1}`.
///
/// # Errors
///
/// - `400 Bad Request`: Negative score, winner not in the match
/// - `404 Not Found`: Unknown match
/// - `409 Conflict`: Match or bracket already completed
pub async fn record_result<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    request_id: RequestId,
    Path(match_id): Path<MatchId>,
    Json(req): Json<RecordResultRequest>,
) -> ApiResult<RoundOutcome> {
    let outcome = state
        .manager
        .record_match_result(
            match_id,
            req.team1_score,
            req.team2_score,
            req.winner_team_id,
        )
        .await
        .map_err(api_error)?;

    metrics::match_results_recorded();
    metrics::round_outcome(&outcome);
    tracing::info!(
        request_id = request_id.as_str(),
        match_id,
        outcome = ?outcome,
        "Match result recorded"
    );

    Ok(Json(outcome))
}

/// Generate the next round by hand.
///
/// # Errors
///
/// - `409 Conflict`: Round still has unplayed matches, or the bracket is finished
pub async fn advance_round<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    Path(bracket_id): Path<BracketId>,
    Json(req): Json<AdvanceRoundRequest>,
) -> ApiResult<RoundOutcome> {
    let outcome = state
        .manager
        .manual_advance_round(bracket_id, req.current_round)
        .await
        .map_err(api_error)?;

    metrics::round_outcome(&outcome);
    Ok(Json(outcome))
}

/// Decide the champion by hand.
///
/// Returns `{"champion_team_id": null}` for a round-robin bracket with no
/// completed matches.
pub async fn set_champion<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    Path(bracket_id): Path<BracketId>,
) -> ApiResult<ChampionResponse> {
    let champion_team_id = state
        .manager
        .manual_set_champion(bracket_id)
        .await
        .map_err(api_error)?;

    if champion_team_id.is_some() {
        metrics::champions_decided(true);
    }
    Ok(Json(ChampionResponse { champion_team_id }))
}

/// Set the date and venue of a match.
///
/// Returns `204 No Content`.
pub async fn update_schedule<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
    Path(match_id): Path<MatchId>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .update_match_schedule(match_id, req.match_date, req.venue.as_deref())
        .await
        .map_err(api_error)?;

    Ok(StatusCode::NO_CONTENT)
}
