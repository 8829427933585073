use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    dao::{
        document_store::{DocumentStore, Fields},
        entities::{AnswerEntity, QuestionEntity, RoundEntity, TeamEntity, VenueEntity},
    },
    dao::storage::{StorageError, StorageResult},
    state::round::RoundState,
};

const VENUE_COLLECTION: &str = "venues";
const TEAM_COLLECTION: &str = "teams";
const QUESTION_COLLECTION: &str = "questions";
const ROUND_COLLECTION: &str = "rounds";
const ANSWER_COLLECTION: &str = "answers";

/// Typed accessors for the five entity kinds over the document store adapter.
#[derive(Clone)]
pub struct EntityRepository {
    store: Arc<dyn DocumentStore>,
}

impl EntityRepository {
    /// Wrap a document store handle.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // -- venues --------------------------------------------------------------

    /// Fetch a venue by id.
    pub async fn venue(&self, id: &str) -> StorageResult<Option<VenueEntity>> {
        decode_opt(VENUE_COLLECTION, self.store.get(VENUE_COLLECTION, id).await?)
    }

    /// Create a venue, returning it with its store-generated identity.
    pub async fn add_venue(&self, venue: VenueEntity) -> StorageResult<VenueEntity> {
        let id = self
            .store
            .add(VENUE_COLLECTION, encode(VENUE_COLLECTION, &venue)?)
            .await?;
        Ok(VenueEntity { id, ..venue })
    }

    /// Merge fields into a venue document.
    pub async fn update_venue(&self, id: &str, fields: Fields) -> StorageResult<()> {
        self.store.update(VENUE_COLLECTION, id, fields).await
    }

    /// Atomically claim the venue's current-round slot for `round_id`.
    ///
    /// Succeeds only when no round is currently referenced, which is what
    /// keeps two concurrent start_roll calls from both winning.
    pub async fn claim_current_round(&self, venue_id: &str, round_id: &str) -> StorageResult<bool> {
        let fields = crate::dao::document_store::to_fields(
            serde_json::json!({ "current_round_id": round_id }),
        );
        self.store
            .update_where_eq(
                VENUE_COLLECTION,
                venue_id,
                "current_round_id",
                Value::Null,
                fields,
            )
            .await
    }

    /// All venues known to the store.
    pub async fn list_venues(&self) -> StorageResult<Vec<VenueEntity>> {
        decode_all(VENUE_COLLECTION, self.store.list(VENUE_COLLECTION).await?)
    }

    // -- teams ---------------------------------------------------------------

    /// Fetch a team by id.
    pub async fn team(&self, id: &str) -> StorageResult<Option<TeamEntity>> {
        decode_opt(TEAM_COLLECTION, self.store.get(TEAM_COLLECTION, id).await?)
    }

    /// Create a team, returning it with its store-generated identity.
    pub async fn add_team(&self, team: TeamEntity) -> StorageResult<TeamEntity> {
        let id = self
            .store
            .add(TEAM_COLLECTION, encode(TEAM_COLLECTION, &team)?)
            .await?;
        Ok(TeamEntity { id, ..team })
    }

    /// Merge fields into a team document.
    pub async fn update_team(&self, id: &str, fields: Fields) -> StorageResult<()> {
        self.store.update(TEAM_COLLECTION, id, fields).await
    }

    /// Teams registered at a venue, in store-return order.
    pub async fn teams_for_venue(&self, venue_id: &str) -> StorageResult<Vec<TeamEntity>> {
        let rows = self
            .store
            .query_eq(TEAM_COLLECTION, "venue_id", Value::from(venue_id))
            .await?;
        decode_all(TEAM_COLLECTION, rows)
    }

    // -- questions -----------------------------------------------------------

    /// Fetch a question by id.
    pub async fn question(&self, id: &str) -> StorageResult<Option<QuestionEntity>> {
        decode_opt(
            QUESTION_COLLECTION,
            self.store.get(QUESTION_COLLECTION, id).await?,
        )
    }

    /// Create a question, returning it with its store-generated identity.
    pub async fn add_question(&self, question: QuestionEntity) -> StorageResult<QuestionEntity> {
        let id = self
            .store
            .add(QUESTION_COLLECTION, encode(QUESTION_COLLECTION, &question)?)
            .await?;
        Ok(QuestionEntity { id, ..question })
    }

    /// The whole question set.
    pub async fn list_questions(&self) -> StorageResult<Vec<QuestionEntity>> {
        decode_all(
            QUESTION_COLLECTION,
            self.store.list(QUESTION_COLLECTION).await?,
        )
    }

    // -- rounds --------------------------------------------------------------

    /// Fetch a round by id.
    pub async fn round(&self, id: &str) -> StorageResult<Option<RoundEntity>> {
        decode_opt(ROUND_COLLECTION, self.store.get(ROUND_COLLECTION, id).await?)
    }

    /// Create a round, returning it with its store-generated identity.
    pub async fn add_round(&self, round: RoundEntity) -> StorageResult<RoundEntity> {
        let id = self
            .store
            .add(ROUND_COLLECTION, encode(ROUND_COLLECTION, &round)?)
            .await?;
        Ok(RoundEntity { id, ..round })
    }

    /// Merge fields into a round document.
    pub async fn update_round(&self, id: &str, fields: Fields) -> StorageResult<()> {
        self.store.update(ROUND_COLLECTION, id, fields).await
    }

    /// Merge fields into a round only while it is still in `expected` state.
    ///
    /// Returns whether the write applied; the deadline scheduler uses this so
    /// an admin transition that already happened turns the timer into a no-op.
    pub async fn update_round_if_state(
        &self,
        id: &str,
        expected: RoundState,
        fields: Fields,
    ) -> StorageResult<bool> {
        self.store
            .update_where_eq(
                ROUND_COLLECTION,
                id,
                "state",
                Value::from(expected.as_str()),
                fields,
            )
            .await
    }

    /// Every round ever created for a venue (completed ones included).
    pub async fn rounds_for_venue(&self, venue_id: &str) -> StorageResult<Vec<RoundEntity>> {
        let rows = self
            .store
            .query_eq(ROUND_COLLECTION, "venue_id", Value::from(venue_id))
            .await?;
        decode_all(ROUND_COLLECTION, rows)
    }

    /// Rounds currently in the answering state, across all venues. Used to
    /// re-arm deadline timers after a storage (re)connect.
    pub async fn answering_rounds(&self) -> StorageResult<Vec<RoundEntity>> {
        let rows = self
            .store
            .query_eq(
                ROUND_COLLECTION,
                "state",
                Value::from(RoundState::Answering.as_str()),
            )
            .await?;
        decode_all(ROUND_COLLECTION, rows)
    }

    // -- answers -------------------------------------------------------------

    /// Fetch an answer by its deterministic identity.
    pub async fn answer(&self, id: &str) -> StorageResult<Option<AnswerEntity>> {
        decode_opt(
            ANSWER_COLLECTION,
            self.store.get(ANSWER_COLLECTION, id).await?,
        )
    }

    /// Create-or-overwrite an answer at its deterministic identity.
    pub async fn put_answer(&self, answer: &AnswerEntity) -> StorageResult<()> {
        self.store
            .set(ANSWER_COLLECTION, &answer.id, encode(ANSWER_COLLECTION, answer)?)
            .await
    }

    /// Merge fields into an answer document.
    pub async fn update_answer(&self, id: &str, fields: Fields) -> StorageResult<()> {
        self.store.update(ANSWER_COLLECTION, id, fields).await
    }

    /// All submissions recorded for a round.
    pub async fn answers_for_round(&self, round_id: &str) -> StorageResult<Vec<AnswerEntity>> {
        let rows = self
            .store
            .query_eq(ANSWER_COLLECTION, "round_id", Value::from(round_id))
            .await?;
        decode_all(ANSWER_COLLECTION, rows)
    }
}

fn encode<T: Serialize>(collection: &'static str, entity: &T) -> StorageResult<Fields> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StorageError::unavailable(
            format!("entity for `{collection}` did not serialize to an object"),
            serde_json::Error::io(std::io::Error::other("non-object entity")),
        )),
        Err(err) => Err(StorageError::unavailable(
            format!("failed to encode entity for `{collection}`"),
            err,
        )),
    }
}

fn decode<T: DeserializeOwned>(collection: &'static str, fields: Fields) -> StorageResult<T> {
    serde_json::from_value(Value::Object(fields)).map_err(|err| {
        StorageError::unavailable(format!("corrupt document in `{collection}`"), err)
    })
}

fn decode_opt<T: DeserializeOwned>(
    collection: &'static str,
    fields: Option<Fields>,
) -> StorageResult<Option<T>> {
    fields.map(|map| decode(collection, map)).transpose()
}

fn decode_all<T: DeserializeOwned>(
    collection: &'static str,
    rows: Vec<Fields>,
) -> StorageResult<Vec<T>> {
    rows.into_iter().map(|map| decode(collection, map)).collect()
}
