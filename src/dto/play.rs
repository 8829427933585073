//! DTO definitions used by the player-facing REST API.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::validation::validate_option_index;

/// Payload used by a team to join a venue.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterTeamRequest {
    /// Display name of the team.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

/// A team's submission for the current round.
///
/// The submitting team identifies itself explicitly; there is no ambient
/// session on the wire.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Identity of the submitting team.
    pub team_id: String,
    /// Free-text content; may be empty when the countdown forced the submit.
    #[serde(default)]
    pub content: String,
    /// Index into the question's options, when multiple-choice.
    #[serde(default)]
    pub selected_option_index: Option<u8>,
    /// Optional free-text justification.
    #[serde(default)]
    pub reason: Option<String>,
    /// True when the client submitted automatically at the deadline.
    #[serde(default)]
    pub is_auto_submitted: bool,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.team_id.trim().is_empty() {
            errors.add("team_id", ValidationError::new("team_id_empty"));
        }

        if let Some(index) = self.selected_option_index {
            if let Err(e) = validate_option_index(index) {
                errors.add("selected_option_index", e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_requires_team_identity() {
        let request = SubmitAnswerRequest {
            team_id: "  ".into(),
            content: "42".into(),
            selected_option_index: None,
            reason: None,
            is_auto_submitted: false,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn submit_accepts_empty_content_on_auto_submit() {
        let request = SubmitAnswerRequest {
            team_id: "t1".into(),
            content: String::new(),
            selected_option_index: Some(2),
            reason: None,
            is_auto_submitted: true,
        };
        assert!(request.validate().is_ok());
    }
}
