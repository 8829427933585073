use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Dice Trivia Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::play::list_venues,
        crate::routes::play::get_venue,
        crate::routes::play::get_rankings,
        crate::routes::play::register_team,
        crate::routes::play::submit_answer,
        crate::routes::play::get_question,
        crate::routes::sse::public_stream,
        crate::routes::admin::create_venue,
        crate::routes::admin::create_question,
        crate::routes::admin::list_questions,
        crate::routes::admin::start_roll,
        crate::routes::admin::finalize_roll,
        crate::routes::admin::begin_evaluation,
        crate::routes::admin::list_answers,
        crate::routes::admin::score_answer,
        crate::routes::admin::award,
        crate::routes::admin::end_game,
        crate::routes::admin::admin_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::VenueSummary,
            crate::dto::game::TeamSummary,
            crate::dto::game::RoundSummary,
            crate::dto::game::QuestionPublic,
            crate::dto::game::QuestionSummary,
            crate::dto::game::AnswerSummary,
            crate::dto::game::RankingEntry,
            crate::dto::play::RegisterTeamRequest,
            crate::dto::play::SubmitAnswerRequest,
            crate::dto::admin::CreateVenueRequest,
            crate::dto::admin::CreateQuestionRequest,
            crate::dto::admin::FinalizeRollRequest,
            crate::dto::admin::ScoreAnswerRequest,
            crate::dto::admin::AwardRequest,
            crate::dto::admin::ActionResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::VenueChangedEvent,
            crate::dto::sse::RoundChangedEvent,
            crate::dto::sse::RankingsChangedEvent,
            crate::dto::sse::AnswersChangedEvent,
            crate::state::round::RoundState,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "play", description = "Player-facing venue, team and answer operations"),
        (name = "admin", description = "Round lifecycle and content management operations"),
    )
)]
pub struct ApiDoc;
