use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::state::round::RoundState;

/// One independent game instance with its own teams and round history.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VenueEntity {
    /// Store-generated identity.
    #[serde(default)]
    pub id: String,
    /// Display name of the venue.
    pub name: String,
    /// Round currently owned by the lifecycle engine, if any. At most one
    /// non-completed round is referenced at a time.
    #[serde(default)]
    pub current_round_id: Option<String>,
    /// No new round may start before this epoch-millis instant.
    #[serde(default)]
    pub cooldown_until: Option<i64>,
    /// Terminal flag set by end_game.
    #[serde(default)]
    pub game_ended: bool,
    /// Creation timestamp (epoch millis).
    #[serde(default)]
    pub created_at: i64,
}

/// A participant unit scoped to one venue. Never deleted; end_game
/// disqualifies instead.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Store-generated identity.
    #[serde(default)]
    pub id: String,
    /// Owning venue.
    pub venue_id: String,
    /// Display name chosen at registration.
    pub name: String,
    /// Accumulator clamped to [0, 1000] per award.
    #[serde(default)]
    pub currency: i64,
    /// Unbounded cumulative points across all rounds played.
    #[serde(default)]
    pub total_score: i64,
    /// Number of rounds this team was awarded for.
    #[serde(default)]
    pub rounds_participated: i64,
    /// Score received in the most recent awarded round.
    #[serde(default)]
    pub last_round_score: Option<i64>,
    /// Round-scoped exclusion flag; a disqualified team may not submit.
    #[serde(default)]
    pub is_disqualified: bool,
    /// Display ordinal of the round in which the team was eliminated.
    #[serde(default)]
    pub disqualified_in_round: Option<i64>,
    /// Idempotency token: the last round this team was awarded for. Re-running
    /// the award step skips teams already carrying the current round's id.
    #[serde(default)]
    pub last_awarded_round_id: Option<String>,
    /// Creation timestamp (epoch millis).
    #[serde(default)]
    pub created_at: i64,
}

/// Static quiz content, read-only to the engine.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Store-generated identity.
    #[serde(default)]
    pub id: String,
    /// Question text shown to teams.
    pub text: String,
    /// Optional multiple-choice options (at most four).
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Optional free-text expected answer; never exposed to players.
    #[serde(default)]
    pub answer: Option<String>,
    /// Creation timestamp (epoch millis).
    #[serde(default)]
    pub created_at: i64,
}

/// One roll → question → answer → evaluate cycle for a venue. Retained after
/// completion for history.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Store-generated identity.
    #[serde(default)]
    pub id: String,
    /// Owning venue.
    pub venue_id: String,
    /// Current lifecycle state; transitions are monotonic.
    pub state: RoundState,
    /// Dice value (1–6), set once at finalize.
    #[serde(default)]
    pub dice: Option<u8>,
    /// Question selected at finalize.
    #[serde(default)]
    pub question_id: Option<String>,
    /// When the roll began (epoch millis).
    #[serde(default)]
    pub roll_started_at: i64,
    /// Deadline of the answering window (epoch millis).
    #[serde(default)]
    pub answer_ends_at: Option<i64>,
    /// Deadline of the evaluating window (epoch millis).
    #[serde(default)]
    pub evaluate_ends_at: Option<i64>,
    /// Set when award_and_disqualify resolved this round.
    #[serde(default)]
    pub awarded_at: Option<i64>,
    /// Creation timestamp (epoch millis).
    #[serde(default)]
    pub created_at: i64,
}

/// One team's submission for one round. Identity is the deterministic
/// composite [`answer_doc_id`], so a second write overwrites rather than
/// duplicates.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Deterministic identity `{team_id}_{round_id}`.
    #[serde(default)]
    pub id: String,
    /// Round this submission belongs to.
    pub round_id: String,
    /// Submitting team.
    pub team_id: String,
    /// Free-text content (possibly empty on auto-submit).
    #[serde(default)]
    pub content: String,
    /// Index into the question's options, when multiple-choice.
    #[serde(default)]
    pub selected_option_index: Option<u8>,
    /// Optional free-text justification.
    #[serde(default)]
    pub reason: Option<String>,
    /// True when written by the deadline-triggered path.
    #[serde(default)]
    pub is_auto_submitted: bool,
    /// Admin-assigned non-negative score; absent until evaluated,
    /// overwritable afterwards.
    #[serde(default)]
    pub score: Option<i64>,
    /// Optional admin feedback shown to the team.
    #[serde(default)]
    pub feedback: Option<String>,
    /// When the submission was recorded (epoch millis).
    #[serde(default)]
    pub submitted_at: i64,
}

/// The one persisted-layout contract external tooling must respect: an
/// answer's identity is `{team_id}_{round_id}`.
pub fn answer_doc_id(team_id: &str, round_id: &str) -> String {
    format!("{team_id}_{round_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_identity_is_team_then_round() {
        assert_eq!(answer_doc_id("t1", "r9"), "t1_r9");
    }
}
