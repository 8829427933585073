use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::{Response, sse::Sse},
    routing::{get, post},
};
use axum_valid::Valid;
use futures::Stream;
use tracing::info;

use crate::{
    dto::{
        admin::{
            ActionResponse, AwardRequest, CreateQuestionRequest, CreateVenueRequest,
            FinalizeRollRequest, ScoreAnswerRequest,
        },
        game::{AnswerSummary, QuestionSummary, RoundSummary, VenueSummary},
    },
    error::AppError,
    services::{
        answer_service, question_service, round_service,
        sse_service::{self, StreamKind},
        venue_service,
    },
    state::SharedState,
};

/// Routes handling the admin surface, gated by the shared admin key.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/venues", post(create_venue))
        .route("/admin/questions", post(create_question).get(list_questions))
        .route("/admin/venues/{id}/roll", post(start_roll))
        .route("/admin/rounds/{id}/finalize", post(finalize_roll))
        .route("/admin/rounds/{id}/evaluate", post(begin_evaluation))
        .route("/admin/rounds/{id}/answers", get(list_answers))
        .route("/admin/answers/{id}/score", post(score_answer))
        .route("/admin/venues/{id}/award", post(award))
        .route("/admin/venues/{id}/end", post(end_game))
        .route("/admin/venues/{id}/events", get(admin_stream))
        .layer(middleware::from_fn_with_state(state, require_admin_key))
}

/// Reject requests whose `x-admin-key` header does not match the configured
/// key. With no key configured the gate is open (a warning is logged at
/// startup).
async fn require_admin_key(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config().admin_key.as_deref() {
        let provided = request
            .headers()
            .get("x-admin-key")
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            return Err(AppError::Unauthorized("missing or invalid admin key".into()));
        }
    }

    Ok(next.run(request).await)
}

/// Create a venue.
#[utoipa::path(
    post,
    path = "/admin/venues",
    tag = "admin",
    request_body = CreateVenueRequest,
    responses(
        (status = 200, description = "Venue created", body = VenueSummary)
    )
)]
pub async fn create_venue(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateVenueRequest>>,
) -> Result<Json<VenueSummary>, AppError> {
    let venue = venue_service::create_venue(&state, payload.name).await?;
    Ok(Json(venue))
}

/// Add a question to the shared question set.
#[utoipa::path(
    post,
    path = "/admin/questions",
    tag = "admin",
    request_body = CreateQuestionRequest,
    responses(
        (status = 200, description = "Question created", body = QuestionSummary)
    )
)]
pub async fn create_question(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateQuestionRequest>>,
) -> Result<Json<QuestionSummary>, AppError> {
    let question = question_service::create_question(&state, payload).await?;
    Ok(Json(question))
}

/// List the full question set, expected answers included.
#[utoipa::path(
    get,
    path = "/admin/questions",
    tag = "admin",
    responses(
        (status = 200, description = "All questions", body = [QuestionSummary])
    )
)]
pub async fn list_questions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<QuestionSummary>>, AppError> {
    let questions = question_service::list_questions(&state).await?;
    Ok(Json(questions))
}

/// Start a new round for a venue.
#[utoipa::path(
    post,
    path = "/admin/venues/{id}/roll",
    tag = "admin",
    params(("id" = String, Path, description = "Venue identifier")),
    responses(
        (status = 200, description = "Round started", body = RoundSummary),
        (status = 409, description = "Cooldown active, game ended, or a round is already in progress")
    )
)]
pub async fn start_roll(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoundSummary>, AppError> {
    let round = round_service::start_roll(&state, &id).await?;
    Ok(Json(round))
}

/// Fix the dice and question for a round and open the answering window.
#[utoipa::path(
    post,
    path = "/admin/rounds/{id}/finalize",
    tag = "admin",
    params(("id" = String, Path, description = "Round identifier")),
    request_body = FinalizeRollRequest,
    responses(
        (status = 200, description = "Answering window opened", body = RoundSummary)
    )
)]
pub async fn finalize_roll(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<FinalizeRollRequest>>,
) -> Result<Json<RoundSummary>, AppError> {
    let round = round_service::finalize_roll(&state, &id, payload).await?;
    Ok(Json(round))
}

/// Close the answering window by hand and open evaluation.
#[utoipa::path(
    post,
    path = "/admin/rounds/{id}/evaluate",
    tag = "admin",
    params(("id" = String, Path, description = "Round identifier")),
    responses(
        (status = 200, description = "Evaluation opened", body = RoundSummary)
    )
)]
pub async fn begin_evaluation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoundSummary>, AppError> {
    let round = round_service::begin_evaluation(&state, &id).await?;
    Ok(Json(round))
}

/// All submissions recorded for a round.
#[utoipa::path(
    get,
    path = "/admin/rounds/{id}/answers",
    tag = "admin",
    params(("id" = String, Path, description = "Round identifier")),
    responses(
        (status = 200, description = "Submissions for the round", body = [AnswerSummary])
    )
)]
pub async fn list_answers(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AnswerSummary>>, AppError> {
    let answers = answer_service::answers_for_round(&state, &id).await?;
    Ok(Json(answers))
}

/// Assign a score and optional feedback to one submission.
#[utoipa::path(
    post,
    path = "/admin/answers/{id}/score",
    tag = "admin",
    params(("id" = String, Path, description = "Answer identifier ({team_id}_{round_id})")),
    request_body = ScoreAnswerRequest,
    responses(
        (status = 200, description = "Score recorded", body = AnswerSummary),
        (status = 404, description = "No such submission")
    )
)]
pub async fn score_answer(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<ScoreAnswerRequest>>,
) -> Result<Json<AnswerSummary>, AppError> {
    let answer =
        round_service::score_answer(&state, &id, payload.score, payload.feedback).await?;
    Ok(Json(answer))
}

/// Resolve the current round: pay out scores, eliminate teams, start cooldown.
#[utoipa::path(
    post,
    path = "/admin/venues/{id}/award",
    tag = "admin",
    params(("id" = String, Path, description = "Venue identifier")),
    request_body = AwardRequest,
    responses(
        (status = 200, description = "Round resolved (no-op when no round is in progress)", body = ActionResponse)
    )
)]
pub async fn award(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<AwardRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    round_service::award_and_disqualify(&state, &id, &payload.disqualified_team_ids).await?;
    Ok(Json(ActionResponse {
        message: "round awarded".into(),
    }))
}

/// End the game for a venue.
#[utoipa::path(
    post,
    path = "/admin/venues/{id}/end",
    tag = "admin",
    params(("id" = String, Path, description = "Venue identifier")),
    responses(
        (status = 200, description = "Game ended", body = VenueSummary)
    )
)]
pub async fn end_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<VenueSummary>, AppError> {
    let venue = round_service::end_game(&state, &id).await?;
    Ok(Json(venue))
}

/// Admin SSE stream for one venue, including answer payloads.
#[utoipa::path(
    get,
    path = "/admin/venues/{id}/events",
    tag = "admin",
    params(("id" = String, Path, description = "Venue identifier")),
    responses((status = 200, description = "Admin SSE stream", content_type = "text/event-stream", body = String))
)]
pub async fn admin_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    info!(venue_id = %id, "new admin SSE connection");
    let stream = sse_service::venue_stream(&state, &id, StreamKind::Admin).await?;
    Ok(stream)
}
