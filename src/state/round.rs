use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Persisted lifecycle states of a round.
///
/// There is no persisted "waiting" state: a venue with no `current_round_id`
/// is the effective waiting state. Transitions only ever move forward through
/// this ordering; `completed` folds back into waiting by clearing the venue's
/// round reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    /// Round created, dice not yet fixed.
    Rolling,
    /// Dice and question fixed, teams may submit until `answer_ends_at`.
    Answering,
    /// Submissions are being scored by the admin.
    Evaluating,
    /// Round resolved; retained for history only.
    Completed,
}

impl RoundState {
    /// Wire representation used in equality queries against the store.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundState::Rolling => "rolling",
            RoundState::Answering => "answering",
            RoundState::Evaluating => "evaluating",
            RoundState::Completed => "completed",
        }
    }

    fn rank(self) -> u8 {
        match self {
            RoundState::Rolling => 0,
            RoundState::Answering => 1,
            RoundState::Evaluating => 2,
            RoundState::Completed => 3,
        }
    }

    /// Whether moving to `next` respects the one-directional ordering.
    pub fn can_advance_to(self, next: RoundState) -> bool {
        next.rank() > self.rank()
    }
}

impl std::fmt::Display for RoundState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_one_directional() {
        use RoundState::*;
        assert!(Rolling.can_advance_to(Answering));
        assert!(Rolling.can_advance_to(Completed));
        assert!(Answering.can_advance_to(Evaluating));
        assert!(Evaluating.can_advance_to(Completed));

        assert!(!Answering.can_advance_to(Rolling));
        assert!(!Evaluating.can_advance_to(Answering));
        assert!(!Completed.can_advance_to(Rolling));
        assert!(!Completed.can_advance_to(Completed));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&RoundState::Answering).unwrap();
        assert_eq!(json, "\"answering\"");
        let state: RoundState = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(state, RoundState::Completed);
    }
}
