use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/venues/{id}/events",
    tag = "play",
    params(("id" = String, Path, description = "Venue identifier")),
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime venue events (venue, current round, rankings) to players.
pub async fn public_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    info!(venue_id = %id, "new public SSE connection");
    let stream = sse_service::venue_stream(&state, &id, StreamKind::Public).await?;
    Ok(stream)
}

/// Configure the public SSE endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/venues/{id}/events", get(public_stream))
}
