//! Per-venue Server-Sent Events streams.
//!
//! Each connection owns a forwarder task that replays the store's change
//! subscriptions: the venue document, the current round document (re-targeted
//! whenever the venue's round reference moves) and the venue's teams. The
//! admin stream additionally follows the current round's answers. Because
//! `watch_doc`/`watch_query_eq` emit the current value immediately, a client
//! has a full picture right after the handshake without a separate snapshot
//! request.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream::BoxStream};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dao::{
        document_store::{DocumentStore, Fields},
        entities::{AnswerEntity, RoundEntity, TeamEntity, VenueEntity},
        repository::EntityRepository,
    },
    dto::{
        game::QuestionPublic,
        sse::{
            AnswersChangedEvent, Handshake, RankingsChangedEvent, RoundChangedEvent, ServerEvent,
            VenueChangedEvent,
        },
    },
    error::ServiceError,
    services::ranking_service,
    state::SharedState,
};

/// Which projection of venue events a connection receives.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Player-facing events only.
    Public,
    /// Player-facing events plus the current round's submissions.
    Admin,
}

impl StreamKind {
    fn label(self) -> &'static str {
        match self {
            StreamKind::Public => "public",
            StreamKind::Admin => "admin",
        }
    }
}

type SseItem = Result<Event, Infallible>;

/// Open an SSE response scoped to one venue.
pub async fn venue_stream(
    state: &SharedState,
    venue_id: &str,
    kind: StreamKind,
) -> Result<Sse<impl Stream<Item = SseItem> + use<>>, ServiceError> {
    let store = state.require_document_store().await?;
    let repository = EntityRepository::new(store.clone());
    repository
        .venue(venue_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("venue {venue_id}")))?;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<SseItem>(8);

    let handshake = Handshake {
        stream: kind.label().into(),
        venue_id: venue_id.to_owned(),
        degraded: state.is_degraded().await,
    };

    let venue_id = venue_id.to_owned();
    tokio::spawn(async move {
        if !emit(&tx, "handshake", &handshake).await {
            return;
        }
        forward_venue_events(store, repository, venue_id.clone(), kind, tx).await;
        info!(venue_id, stream = kind.label(), "SSE stream disconnected");
    });

    // response stream reads from mpsc; when the client disconnects axum drops
    // this stream, the channel closes, and the forwarder task winds down
    let stream = ReceiverStream::new(rx);
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

async fn forward_venue_events(
    store: std::sync::Arc<dyn DocumentStore>,
    repository: EntityRepository,
    venue_id: String,
    kind: StreamKind,
    tx: mpsc::Sender<SseItem>,
) {
    let mut venue_watch = store.watch_doc("venues", &venue_id);
    let mut teams_watch = store.watch_query_eq("teams", "venue_id", Value::from(venue_id.clone()));
    let mut round_watch: Option<BoxStream<'static, Option<Fields>>> = None;
    let mut answers_watch: Option<BoxStream<'static, Vec<Fields>>> = None;

    let mut current_round_id: Option<String> = None;
    let mut cached_question: Option<(String, QuestionPublic)> = None;

    loop {
        tokio::select! {
            _ = tx.closed() => break,

            venue = venue_watch.next() => {
                let Some(venue) = venue else { break };
                // A deleted venue document ends the subscription.
                let Some(fields) = venue else { break };
                let Some(venue) = decode::<VenueEntity>(fields) else { continue };

                if venue.current_round_id != current_round_id {
                    current_round_id = venue.current_round_id.clone();
                    match current_round_id.as_deref() {
                        Some(round_id) => {
                            round_watch = Some(store.watch_doc("rounds", round_id));
                            if kind == StreamKind::Admin {
                                answers_watch = Some(store.watch_query_eq(
                                    "answers",
                                    "round_id",
                                    Value::from(round_id),
                                ));
                            }
                        }
                        None => {
                            round_watch = None;
                            answers_watch = None;
                            if !emit(&tx, "round.changed", &RoundChangedEvent { round: None, question: None }).await {
                                break;
                            }
                        }
                    }
                }

                if !emit(&tx, "venue.changed", &VenueChangedEvent { venue: venue.into() }).await {
                    break;
                }
            }

            round = next_or_pending(&mut round_watch) => {
                let round = round.and_then(decode::<RoundEntity>);
                let question = match round.as_ref().and_then(|round| round.question_id.clone()) {
                    Some(question_id) => {
                        question_for(&repository, &mut cached_question, &question_id).await
                    }
                    None => None,
                };
                let event = RoundChangedEvent {
                    round: round.map(Into::into),
                    question,
                };
                if !emit(&tx, "round.changed", &event).await {
                    break;
                }
            }

            teams = teams_watch.next() => {
                let Some(teams) = teams else { break };
                let teams: Vec<TeamEntity> = teams.into_iter().filter_map(decode).collect();
                let event = RankingsChangedEvent {
                    rankings: ranking_service::rank_teams(teams),
                };
                if !emit(&tx, "rankings.changed", &event).await {
                    break;
                }
            }

            answers = next_or_pending_vec(&mut answers_watch) => {
                let Some(round_id) = current_round_id.clone() else { continue };
                let event = AnswersChangedEvent {
                    round_id,
                    answers: answers
                        .into_iter()
                        .filter_map(decode::<AnswerEntity>)
                        .map(Into::into)
                        .collect(),
                };
                if !emit(&tx, "answers.changed", &event).await {
                    break;
                }
            }
        }
    }
}

/// Poll an optional stream, parking forever while it is absent so it never
/// wins the select.
async fn next_or_pending(
    stream: &mut Option<BoxStream<'static, Option<Fields>>>,
) -> Option<Fields> {
    match stream {
        Some(inner) => match inner.next().await {
            Some(item) => item,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

async fn next_or_pending_vec(
    stream: &mut Option<BoxStream<'static, Vec<Fields>>>,
) -> Vec<Fields> {
    match stream {
        Some(inner) => match inner.next().await {
            Some(item) => item,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

async fn question_for(
    repository: &EntityRepository,
    cache: &mut Option<(String, QuestionPublic)>,
    question_id: &str,
) -> Option<QuestionPublic> {
    if let Some((cached_id, question)) = cache {
        if cached_id == question_id {
            return Some(question.clone());
        }
    }

    match repository.question(question_id).await {
        Ok(Some(question)) => {
            let public: QuestionPublic = question.into();
            *cache = Some((question_id.to_owned(), public.clone()));
            Some(public)
        }
        Ok(None) => None,
        Err(err) => {
            warn!(question_id, error = %err, "failed to load question for SSE event");
            None
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(fields: Fields) -> Option<T> {
    serde_json::from_value(Value::Object(fields)).ok()
}

async fn emit<T: Serialize>(tx: &mpsc::Sender<SseItem>, name: &str, payload: &T) -> bool {
    let Ok(server_event) = ServerEvent::json(Some(name.to_owned()), payload) else {
        return true;
    };

    let mut event = Event::default().data(server_event.data);
    if let Some(name) = server_event.event {
        event = event.event(name);
    }
    tx.send(Ok(event)).await.is_ok()
}
