//! Round lifecycle engine: roll, finalize, evaluate, score, award, end.
//!
//! Every operation is a single pass of per-document writes; there are no
//! cross-document transactions and no retries. The two multi-writer hazards
//! (two admins rolling at once, a deadline firing during an admin transition)
//! are handled with conditional writes rather than locks.

use rand::Rng;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    dao::{
        document_store::to_fields,
        entities::{RoundEntity, TeamEntity, VenueEntity},
    },
    dto::{
        admin::FinalizeRollRequest,
        game::{AnswerSummary, RoundSummary, VenueSummary},
    },
    error::ServiceError,
    services::deadline_service,
    state::{SharedState, now_epoch_ms, round::RoundState},
};

/// Start a new round for a venue.
///
/// The venue's `current_round_id` slot is claimed with a conditional write
/// keyed on the slot being empty. When the claim loses to a concurrent roll
/// the freshly created round is marked `completed` so it never dangles, and
/// the call fails.
pub async fn start_roll(state: &SharedState, venue_id: &str) -> Result<RoundSummary, ServiceError> {
    let repository = state.repository().await?;
    let venue = require_venue(&repository, venue_id).await?;

    if venue.game_ended {
        return Err(ServiceError::GameEnded);
    }

    let now = now_epoch_ms();
    if let Some(until_ms) = venue.cooldown_until {
        if now < until_ms {
            return Err(ServiceError::CooldownActive { until_ms });
        }
    }

    let round = repository
        .add_round(RoundEntity {
            id: String::new(),
            venue_id: venue_id.to_owned(),
            state: RoundState::Rolling,
            dice: None,
            question_id: None,
            roll_started_at: now,
            answer_ends_at: None,
            evaluate_ends_at: None,
            awarded_at: None,
            created_at: now,
        })
        .await?;

    let claimed = repository.claim_current_round(venue_id, &round.id).await?;
    if !claimed {
        repository
            .update_round(
                &round.id,
                to_fields(json!({ "state": RoundState::Completed.as_str() })),
            )
            .await?;
        warn!(venue_id, round_id = %round.id, "lost the roll race; abandoning round");
        return Err(ServiceError::InvalidState(
            "a round is already in progress".into(),
        ));
    }

    info!(venue_id, round_id = %round.id, "round started");
    Ok(round.into())
}

/// Fix the dice and question for a round and open the answering window.
///
/// Dice and question default to server-side uniform picks when omitted.
/// Rejected once the round has already advanced past `rolling`.
pub async fn finalize_roll(
    state: &SharedState,
    round_id: &str,
    request: FinalizeRollRequest,
) -> Result<RoundSummary, ServiceError> {
    let repository = state.repository().await?;
    let mut round = repository
        .round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {round_id}")))?;
    if !round.state.can_advance_to(RoundState::Answering) {
        return Err(ServiceError::InvalidState(format!(
            "round is {} and cannot open answering",
            round.state
        )));
    }

    let dice = match request.dice {
        Some(dice) => dice,
        None => rand::rng().random_range(1..=6),
    };

    let question_id = match request.question_id {
        Some(question_id) => {
            repository
                .question(&question_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("question {question_id}")))?;
            question_id
        }
        None => pick_random_question(&repository).await?,
    };

    let duration_ms = request
        .answer_duration_ms
        .unwrap_or(state.config().answer_duration_ms);
    let answer_ends_at = now_epoch_ms() + duration_ms;

    repository
        .update_round(
            round_id,
            to_fields(json!({
                "state": RoundState::Answering.as_str(),
                "dice": dice,
                "question_id": question_id,
                "answer_ends_at": answer_ends_at,
            })),
        )
        .await?;

    deadline_service::arm(state, round_id, answer_ends_at);
    info!(round_id, dice, %question_id, answer_ends_at, "roll finalized; answering open");

    round.state = RoundState::Answering;
    round.dice = Some(dice);
    round.question_id = Some(question_id);
    round.answer_ends_at = Some(answer_ends_at);
    Ok(round.into())
}

/// Close the answering window by hand and open the evaluation window.
pub async fn begin_evaluation(
    state: &SharedState,
    round_id: &str,
) -> Result<RoundSummary, ServiceError> {
    let repository = state.repository().await?;
    let mut round = repository
        .round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {round_id}")))?;
    if !round.state.can_advance_to(RoundState::Evaluating) {
        return Err(ServiceError::InvalidState(format!(
            "round is {} and cannot open evaluation",
            round.state
        )));
    }

    let evaluate_ends_at = now_epoch_ms() + state.config().evaluation_window_ms;
    repository
        .update_round(
            round_id,
            to_fields(json!({
                "state": RoundState::Evaluating.as_str(),
                "evaluate_ends_at": evaluate_ends_at,
            })),
        )
        .await?;

    deadline_service::disarm(state, round_id);
    info!(round_id, evaluate_ends_at, "evaluation opened");

    round.state = RoundState::Evaluating;
    round.evaluate_ends_at = Some(evaluate_ends_at);
    Ok(round.into())
}

/// Assign a score and optional feedback to one submission. Overwritable; the
/// score only becomes binding at award time.
pub async fn score_answer(
    state: &SharedState,
    answer_id: &str,
    score: i64,
    feedback: Option<String>,
) -> Result<AnswerSummary, ServiceError> {
    if score < 0 {
        return Err(ServiceError::InvalidInput(
            "score must be non-negative".into(),
        ));
    }

    let repository = state.repository().await?;
    repository
        .update_answer(
            answer_id,
            to_fields(json!({ "score": score, "feedback": feedback })),
        )
        .await?;

    let answer = repository
        .answer(answer_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("answer {answer_id}")))?;
    Ok(answer.into())
}

/// Resolve the current round: pay out every submission from a still-qualified
/// team (an unscored submission counts as zero), then disqualify the named
/// teams, complete the round and start the cooldown.
///
/// Awarding is idempotent per team through `last_awarded_round_id`: re-running
/// after a partial failure skips teams already paid for this round. With no
/// current round the call is a no-op.
pub async fn award_and_disqualify(
    state: &SharedState,
    venue_id: &str,
    disqualified_team_ids: &[String],
) -> Result<(), ServiceError> {
    let repository = state.repository().await?;
    let venue = require_venue(&repository, venue_id).await?;

    let Some(round_id) = venue.current_round_id else {
        warn!(venue_id, "award requested with no round in progress; ignoring");
        return Ok(());
    };
    if repository.round(&round_id).await?.is_none() {
        warn!(venue_id, %round_id, "award requested for a vanished round; ignoring");
        return Ok(());
    }

    let cap = state.config().currency_cap;
    for answer in repository.answers_for_round(&round_id).await? {
        let Some(team) = repository.team(&answer.team_id).await? else {
            warn!(team_id = %answer.team_id, %round_id, "submission from an unknown team");
            continue;
        };
        if team.is_disqualified {
            continue;
        }
        if team.last_awarded_round_id.as_deref() == Some(round_id.as_str()) {
            continue;
        }

        // Unscored submissions still count as participation, at zero points.
        let score = answer.score.unwrap_or(0);
        let currency = (team.currency + score).clamp(0, cap);
        repository
            .update_team(
                &team.id,
                to_fields(json!({
                    "currency": currency,
                    "total_score": team.total_score + score,
                    "rounds_participated": team.rounds_participated + 1,
                    "last_round_score": score,
                    "last_awarded_round_id": round_id,
                })),
            )
            .await?;
    }

    // Display ordinal shown next to eliminated teams: "out in round N".
    let round_ordinal = repository.rounds_for_venue(venue_id).await?.len() as i64;
    for team_id in disqualified_team_ids {
        let Some(team) = repository.team(team_id).await? else {
            warn!(%team_id, venue_id, "disqualification requested for an unknown team");
            continue;
        };
        if team.is_disqualified {
            continue;
        }
        repository
            .update_team(
                team_id,
                to_fields(json!({
                    "is_disqualified": true,
                    "disqualified_in_round": round_ordinal,
                })),
            )
            .await?;
    }

    let now = now_epoch_ms();
    repository
        .update_round(
            &round_id,
            to_fields(json!({
                "state": RoundState::Completed.as_str(),
                "awarded_at": now,
            })),
        )
        .await?;
    repository
        .update_venue(
            venue_id,
            to_fields(json!({
                "current_round_id": null,
                "cooldown_until": now + state.config().cooldown_ms,
            })),
        )
        .await?;

    deadline_service::disarm(state, &round_id);
    info!(venue_id, %round_id, eliminated = disqualified_team_ids.len(), "round awarded");
    Ok(())
}

/// End the game for a venue: every team is disqualified and stamped with the
/// final round ordinal unless it already carries an earlier one, any current
/// round is completed, and the venue refuses further rolls.
pub async fn end_game(state: &SharedState, venue_id: &str) -> Result<VenueSummary, ServiceError> {
    let repository = state.repository().await?;
    let venue = require_venue(&repository, venue_id).await?;

    let round_ordinal = repository.rounds_for_venue(venue_id).await?.len() as i64;
    for team in repository.teams_for_venue(venue_id).await? {
        if team.is_disqualified && team.disqualified_in_round.is_some() {
            continue;
        }
        mark_disqualified(&repository, &team, round_ordinal).await?;
    }

    if let Some(round_id) = venue.current_round_id.as_deref() {
        repository
            .update_round(
                round_id,
                to_fields(json!({ "state": RoundState::Completed.as_str() })),
            )
            .await?;
        deadline_service::disarm(state, round_id);
    }

    repository
        .update_venue(
            venue_id,
            to_fields(json!({ "game_ended": true, "current_round_id": null })),
        )
        .await?;

    info!(venue_id, "game ended");
    let venue = require_venue(&repository, venue_id).await?;
    Ok(venue.into())
}

async fn mark_disqualified(
    repository: &crate::dao::repository::EntityRepository,
    team: &TeamEntity,
    round_ordinal: i64,
) -> Result<(), ServiceError> {
    let ordinal = team.disqualified_in_round.unwrap_or(round_ordinal);
    repository
        .update_team(
            &team.id,
            to_fields(json!({
                "is_disqualified": true,
                "disqualified_in_round": ordinal,
            })),
        )
        .await?;
    Ok(())
}

async fn require_venue(
    repository: &crate::dao::repository::EntityRepository,
    venue_id: &str,
) -> Result<VenueEntity, ServiceError> {
    repository
        .venue(venue_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("venue {venue_id}")))
}

async fn pick_random_question(
    repository: &crate::dao::repository::EntityRepository,
) -> Result<String, ServiceError> {
    let questions = repository.list_questions().await?;
    if questions.is_empty() {
        return Err(ServiceError::InvalidState("question set is empty".into()));
    }
    let index = rand::rng().random_range(0..questions.len());
    Ok(questions[index].id.clone())
}
