//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::validation::validate_dice;

/// Payload used to create a new venue.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateVenueRequest {
    /// Display name of the venue.
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

/// Payload used to add a question to the shared question set.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQuestionRequest {
    /// Question text shown to teams.
    pub text: String,
    /// Optional multiple-choice options, at most four.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Optional expected answer, visible to admins only.
    #[serde(default)]
    pub answer: Option<String>,
}

impl Validate for CreateQuestionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.text.trim().is_empty() {
            errors.add("text", ValidationError::new("text_empty"));
        }

        if let Some(ref options) = self.options {
            if options.len() > 4 {
                let mut err = ValidationError::new("too_many_options");
                err.message =
                    Some(format!("At most 4 options are allowed (got {})", options.len()).into());
                errors.add("options", err);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload fixing the dice and question for the current round.
///
/// Omitted fields are filled in server-side: the dice with a fair roll, the
/// question with a uniform pick from the question set.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalizeRollRequest {
    /// Dice value to pin, 1 through 6.
    #[serde(default)]
    pub dice: Option<u8>,
    /// Question to ask this round.
    #[serde(default)]
    pub question_id: Option<String>,
    /// Override of the configured answering window length.
    #[serde(default)]
    pub answer_duration_ms: Option<i64>,
}

impl Validate for FinalizeRollRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(dice) = self.dice {
            if let Err(e) = validate_dice(dice) {
                errors.add("dice", e);
            }
        }

        if let Some(duration) = self.answer_duration_ms {
            if duration <= 0 {
                errors.add("answer_duration_ms", ValidationError::new("non_positive"));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Request to assign a score and optional feedback to one submission.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScoreAnswerRequest {
    /// Non-negative points awarded to the submission.
    #[validate(range(min = 0))]
    pub score: i64,
    /// Optional feedback shown to the team.
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Request resolving the current round: apply scores, then eliminate teams.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AwardRequest {
    /// Teams to disqualify once scores have been applied.
    #[serde(default)]
    pub disqualified_team_ids: Vec<String>,
}

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_roll_rejects_out_of_range_dice() {
        let request = FinalizeRollRequest {
            dice: Some(7),
            question_id: None,
            answer_duration_ms: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn finalize_roll_accepts_omitted_fields() {
        let request = FinalizeRollRequest {
            dice: None,
            question_id: None,
            answer_duration_ms: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn question_rejects_five_options() {
        let request = CreateQuestionRequest {
            text: "Pick one".into(),
            options: Some(vec!["a".into(); 5]),
            answer: None,
        };
        assert!(request.validate().is_err());
    }
}
