//! Leaderboard aggregation.

use crate::{
    dao::entities::TeamEntity,
    dto::game::RankingEntry,
    error::ServiceError,
    state::SharedState,
};

/// Compute the leaderboard for a venue.
///
/// Order is total score, then currency, then rounds participated, all
/// descending. The sort is stable, so teams tied on all three keys keep the
/// order the store returned them in.
pub async fn team_rankings(
    state: &SharedState,
    venue_id: &str,
) -> Result<Vec<RankingEntry>, ServiceError> {
    let repository = state.repository().await?;
    repository
        .venue(venue_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("venue {venue_id}")))?;

    let teams = repository.teams_for_venue(venue_id).await?;
    Ok(rank_teams(teams))
}

/// Pure ranking step shared by the REST and SSE paths.
pub fn rank_teams(mut teams: Vec<TeamEntity>) -> Vec<RankingEntry> {
    teams.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(b.currency.cmp(&a.currency))
            .then(b.rounds_participated.cmp(&a.rounds_participated))
    });

    teams
        .into_iter()
        .enumerate()
        .map(|(index, team)| RankingEntry {
            rank: index + 1,
            team_id: team.id,
            name: team.name,
            total_score: team.total_score,
            currency: team.currency,
            rounds_participated: team.rounds_participated,
            is_disqualified: team.is_disqualified,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, total_score: i64, currency: i64, rounds: i64) -> TeamEntity {
        TeamEntity {
            id: id.into(),
            venue_id: "v1".into(),
            name: id.into(),
            currency,
            total_score,
            rounds_participated: rounds,
            last_round_score: None,
            is_disqualified: false,
            disqualified_in_round: None,
            last_awarded_round_id: None,
            created_at: 0,
        }
    }

    #[test]
    fn orders_by_score_then_currency_then_rounds() {
        let ranked = rank_teams(vec![
            team("low", 10, 900, 3),
            team("rich", 50, 700, 2),
            team("veteran", 50, 700, 4),
            team("top", 80, 100, 1),
        ]);

        let ids: Vec<&str> = ranked.iter().map(|entry| entry.team_id.as_str()).collect();
        assert_eq!(ids, vec!["top", "veteran", "rich", "low"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let ranked = rank_teams(vec![
            team("first", 10, 10, 1),
            team("second", 10, 10, 1),
            team("third", 10, 10, 1),
        ]);

        let ids: Vec<&str> = ranked.iter().map(|entry| entry.team_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }
}
