use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::entities::{AnswerEntity, QuestionEntity, RoundEntity, TeamEntity, VenueEntity},
    dto::format_epoch_ms,
    state::round::RoundState,
};

/// Public projection of a venue exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct VenueSummary {
    pub id: String,
    pub name: String,
    pub current_round_id: Option<String>,
    /// Epoch millis before which no new round may start.
    pub cooldown_until: Option<i64>,
    pub game_ended: bool,
    pub created_at: String,
}

/// Public projection of a team exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct TeamSummary {
    pub id: String,
    pub venue_id: String,
    pub name: String,
    pub currency: i64,
    pub total_score: i64,
    pub rounds_participated: i64,
    pub last_round_score: Option<i64>,
    pub is_disqualified: bool,
    pub disqualified_in_round: Option<i64>,
}

/// Public projection of a round. Deadlines stay as epoch millis so clients
/// can drive countdowns with plain arithmetic.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RoundSummary {
    pub id: String,
    pub venue_id: String,
    pub state: RoundState,
    pub dice: Option<u8>,
    pub question_id: Option<String>,
    pub answer_ends_at: Option<i64>,
    pub evaluate_ends_at: Option<i64>,
    pub awarded_at: Option<i64>,
    pub created_at: String,
}

/// Player-facing view of a question. The expected answer is never included.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct QuestionPublic {
    pub id: String,
    pub text: String,
    pub options: Option<Vec<String>>,
}

/// Admin-facing view of a question, expected answer included.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct QuestionSummary {
    pub id: String,
    pub text: String,
    pub options: Option<Vec<String>>,
    pub answer: Option<String>,
    pub created_at: String,
}

/// Admin-facing view of one team's submission.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AnswerSummary {
    pub id: String,
    pub round_id: String,
    pub team_id: String,
    pub content: String,
    pub selected_option_index: Option<u8>,
    pub reason: Option<String>,
    pub is_auto_submitted: bool,
    pub score: Option<i64>,
    pub feedback: Option<String>,
    pub submitted_at: i64,
}

/// One row of the venue leaderboard, ordered by the ranking comparator.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RankingEntry {
    /// 1-based position after sorting.
    pub rank: usize,
    pub team_id: String,
    pub name: String,
    pub total_score: i64,
    pub currency: i64,
    pub rounds_participated: i64,
    pub is_disqualified: bool,
}

impl From<VenueEntity> for VenueSummary {
    fn from(venue: VenueEntity) -> Self {
        Self {
            id: venue.id,
            name: venue.name,
            current_round_id: venue.current_round_id,
            cooldown_until: venue.cooldown_until,
            game_ended: venue.game_ended,
            created_at: format_epoch_ms(venue.created_at),
        }
    }
}

impl From<TeamEntity> for TeamSummary {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            venue_id: team.venue_id,
            name: team.name,
            currency: team.currency,
            total_score: team.total_score,
            rounds_participated: team.rounds_participated,
            last_round_score: team.last_round_score,
            is_disqualified: team.is_disqualified,
            disqualified_in_round: team.disqualified_in_round,
        }
    }
}

impl From<RoundEntity> for RoundSummary {
    fn from(round: RoundEntity) -> Self {
        Self {
            id: round.id,
            venue_id: round.venue_id,
            state: round.state,
            dice: round.dice,
            question_id: round.question_id,
            answer_ends_at: round.answer_ends_at,
            evaluate_ends_at: round.evaluate_ends_at,
            awarded_at: round.awarded_at,
            created_at: format_epoch_ms(round.created_at),
        }
    }
}

impl From<QuestionEntity> for QuestionPublic {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            text: question.text,
            options: question.options,
        }
    }
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            text: question.text,
            options: question.options,
            answer: question.answer,
            created_at: format_epoch_ms(question.created_at),
        }
    }
}

impl From<AnswerEntity> for AnswerSummary {
    fn from(answer: AnswerEntity) -> Self {
        Self {
            id: answer.id,
            round_id: answer.round_id,
            team_id: answer.team_id,
            content: answer.content,
            selected_option_index: answer.selected_option_index,
            reason: answer.reason,
            is_auto_submitted: answer.is_auto_submitted,
            score: answer.score,
            feedback: answer.feedback,
            submitted_at: answer.submitted_at,
        }
    }
}
