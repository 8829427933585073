//! Answer submission path.

use tracing::info;

use crate::{
    dao::entities::{AnswerEntity, answer_doc_id},
    dto::{game::AnswerSummary, play::SubmitAnswerRequest},
    error::ServiceError,
    state::{SharedState, now_epoch_ms},
};

/// Record a team's submission for a round.
///
/// The document identity is `{team_id}_{round_id}`, so a team that submits
/// twice overwrites its previous answer rather than duplicating it. Last write
/// wins; an automatic submit racing a manual one is resolved by whichever
/// write lands second.
pub async fn submit_answer(
    state: &SharedState,
    round_id: &str,
    request: SubmitAnswerRequest,
) -> Result<AnswerSummary, ServiceError> {
    let repository = state.repository().await?;

    let team = repository
        .team(&request.team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team {}", request.team_id)))?;
    if team.is_disqualified {
        return Err(ServiceError::TeamDisqualified);
    }

    repository
        .round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {round_id}")))?;

    let answer = AnswerEntity {
        id: answer_doc_id(&team.id, round_id),
        round_id: round_id.to_owned(),
        team_id: team.id.clone(),
        content: request.content,
        selected_option_index: request.selected_option_index,
        reason: request.reason,
        is_auto_submitted: request.is_auto_submitted,
        score: None,
        feedback: None,
        submitted_at: now_epoch_ms(),
    };
    repository.put_answer(&answer).await?;

    info!(
        round_id,
        team_id = %team.id,
        auto = answer.is_auto_submitted,
        "answer recorded"
    );
    Ok(answer.into())
}

/// All submissions recorded for a round, for the admin evaluation screen.
pub async fn answers_for_round(
    state: &SharedState,
    round_id: &str,
) -> Result<Vec<AnswerSummary>, ServiceError> {
    let repository = state.repository().await?;
    let answers = repository.answers_for_round(round_id).await?;
    Ok(answers.into_iter().map(Into::into).collect())
}
