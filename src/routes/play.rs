use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        game::{AnswerSummary, QuestionPublic, RankingEntry, TeamSummary, VenueSummary},
        play::{RegisterTeamRequest, SubmitAnswerRequest},
    },
    error::AppError,
    services::{answer_service, question_service, ranking_service, venue_service},
    state::SharedState,
};

/// Routes handling the player-facing surface.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/venues", get(list_venues))
        .route("/venues/{id}", get(get_venue))
        .route("/venues/{id}/rankings", get(get_rankings))
        .route("/venues/{id}/teams", post(register_team))
        .route("/rounds/{id}/answers", post(submit_answer))
        .route("/questions/{id}", get(get_question))
}

/// List every venue.
#[utoipa::path(
    get,
    path = "/venues",
    tag = "play",
    responses(
        (status = 200, description = "All venues", body = [VenueSummary])
    )
)]
pub async fn list_venues(
    State(state): State<SharedState>,
) -> Result<Json<Vec<VenueSummary>>, AppError> {
    let venues = venue_service::list_venues(&state).await?;
    Ok(Json(venues))
}

/// Fetch one venue.
#[utoipa::path(
    get,
    path = "/venues/{id}",
    tag = "play",
    params(("id" = String, Path, description = "Venue identifier")),
    responses(
        (status = 200, description = "Venue details", body = VenueSummary),
        (status = 404, description = "Unknown venue")
    )
)]
pub async fn get_venue(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<VenueSummary>, AppError> {
    let venue = venue_service::get_venue(&state, &id).await?;
    Ok(Json(venue))
}

/// Current leaderboard of a venue.
#[utoipa::path(
    get,
    path = "/venues/{id}/rankings",
    tag = "play",
    params(("id" = String, Path, description = "Venue identifier")),
    responses(
        (status = 200, description = "Teams ordered by standing", body = [RankingEntry])
    )
)]
pub async fn get_rankings(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RankingEntry>>, AppError> {
    let rankings = ranking_service::team_rankings(&state, &id).await?;
    Ok(Json(rankings))
}

/// Register a team at a venue.
#[utoipa::path(
    post,
    path = "/venues/{id}/teams",
    tag = "play",
    params(("id" = String, Path, description = "Venue identifier")),
    request_body = RegisterTeamRequest,
    responses(
        (status = 200, description = "Team registered", body = TeamSummary),
        (status = 409, description = "Game has already ended")
    )
)]
pub async fn register_team(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<RegisterTeamRequest>>,
) -> Result<Json<TeamSummary>, AppError> {
    let team = venue_service::register_team(&state, &id, payload.name).await?;
    Ok(Json(team))
}

/// Submit (or overwrite) a team's answer for a round.
#[utoipa::path(
    post,
    path = "/rounds/{id}/answers",
    tag = "play",
    params(("id" = String, Path, description = "Round identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerSummary),
        (status = 409, description = "Team is disqualified")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<AnswerSummary>, AppError> {
    let answer = answer_service::submit_answer(&state, &id, payload).await?;
    Ok(Json(answer))
}

/// Player-safe projection of a question (never includes the expected answer).
#[utoipa::path(
    get,
    path = "/questions/{id}",
    tag = "play",
    params(("id" = String, Path, description = "Question identifier")),
    responses(
        (status = 200, description = "Question text and options", body = QuestionPublic),
        (status = 404, description = "Unknown question")
    )
)]
pub async fn get_question(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionPublic>, AppError> {
    let question = question_service::get_question_public(&state, &id).await?;
    Ok(Json(question))
}
