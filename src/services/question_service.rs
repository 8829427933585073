//! Question set management.

use tracing::info;

use crate::{
    dao::entities::QuestionEntity,
    dto::{
        admin::CreateQuestionRequest,
        game::{QuestionPublic, QuestionSummary},
    },
    error::ServiceError,
    state::{SharedState, now_epoch_ms},
};

/// Add a question to the shared question set.
pub async fn create_question(
    state: &SharedState,
    request: CreateQuestionRequest,
) -> Result<QuestionSummary, ServiceError> {
    let repository = state.repository().await?;
    let question = repository
        .add_question(QuestionEntity {
            id: String::new(),
            text: request.text,
            options: request.options,
            answer: request.answer,
            created_at: now_epoch_ms(),
        })
        .await?;

    info!(question_id = %question.id, "question created");
    Ok(question.into())
}

/// The full question set, expected answers included.
pub async fn list_questions(state: &SharedState) -> Result<Vec<QuestionSummary>, ServiceError> {
    let repository = state.repository().await?;
    let questions = repository.list_questions().await?;
    Ok(questions.into_iter().map(Into::into).collect())
}

/// Player-safe projection of one question; the expected answer never leaves
/// the admin surface.
pub async fn get_question_public(
    state: &SharedState,
    question_id: &str,
) -> Result<QuestionPublic, ServiceError> {
    let repository = state.repository().await?;
    let question = repository
        .question(question_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question {question_id}")))?;
    Ok(question.into())
}
