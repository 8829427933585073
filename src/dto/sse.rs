use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::game::{AnswerSummary, QuestionPublic, RankingEntry, RoundSummary, VenueSummary};

#[derive(Clone, Debug)]
/// Dispatched payload carried on an SSE connection.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `admin`).
    pub stream: String,
    /// Venue this subscription is scoped to.
    pub venue_id: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Emitted whenever the venue document changes (round reference, cooldown,
/// game-ended flag).
pub struct VenueChangedEvent {
    pub venue: VenueSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Emitted whenever the current round changes state or content. The question
/// is the player-safe projection and only present once finalized.
pub struct RoundChangedEvent {
    pub round: Option<RoundSummary>,
    pub question: Option<QuestionPublic>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Emitted whenever team standings change.
pub struct RankingsChangedEvent {
    pub rankings: Vec<RankingEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Admin-only event emitted whenever submissions for the current round change.
pub struct AnswersChangedEvent {
    pub round_id: String,
    pub answers: Vec<AnswerSummary>,
}
