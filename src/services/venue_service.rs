//! Venue and team management.

use tracing::info;

use crate::{
    dao::entities::{TeamEntity, VenueEntity},
    dto::game::{TeamSummary, VenueSummary},
    error::ServiceError,
    state::{SharedState, now_epoch_ms},
};

/// Create a venue with an empty round history.
pub async fn create_venue(state: &SharedState, name: String) -> Result<VenueSummary, ServiceError> {
    let repository = state.repository().await?;
    let venue = repository
        .add_venue(VenueEntity {
            id: String::new(),
            name,
            current_round_id: None,
            cooldown_until: None,
            game_ended: false,
            created_at: now_epoch_ms(),
        })
        .await?;

    info!(venue_id = %venue.id, "venue created");
    Ok(venue.into())
}

/// All venues, for the venue selector screens.
pub async fn list_venues(state: &SharedState) -> Result<Vec<VenueSummary>, ServiceError> {
    let repository = state.repository().await?;
    let venues = repository.list_venues().await?;
    Ok(venues.into_iter().map(Into::into).collect())
}

/// One venue by id.
pub async fn get_venue(state: &SharedState, venue_id: &str) -> Result<VenueSummary, ServiceError> {
    let repository = state.repository().await?;
    let venue = repository
        .venue(venue_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("venue {venue_id}")))?;
    Ok(venue.into())
}

/// Register a new team at a venue with zeroed counters.
pub async fn register_team(
    state: &SharedState,
    venue_id: &str,
    name: String,
) -> Result<TeamSummary, ServiceError> {
    let repository = state.repository().await?;
    let venue = repository
        .venue(venue_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("venue {venue_id}")))?;
    if venue.game_ended {
        return Err(ServiceError::GameEnded);
    }

    let team = repository
        .add_team(TeamEntity {
            id: String::new(),
            venue_id: venue_id.to_owned(),
            name,
            currency: 0,
            total_score: 0,
            rounds_participated: 0,
            last_round_score: None,
            is_disqualified: false,
            disqualified_in_round: None,
            last_awarded_round_id: None,
            created_at: now_epoch_ms(),
        })
        .await?;

    info!(venue_id, team_id = %team.id, "team registered");
    Ok(team.into())
}
