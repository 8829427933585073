//! Authoritative closing of answering windows.
//!
//! One task per answering round sleeps until `answer_ends_at` and then moves
//! the round to `evaluating` through a conditional write, so an admin who
//! already advanced the round turns the timer into a no-op. Timers live only
//! in process memory; [`rearm_pending`] rebuilds them from the store whenever
//! a storage backend is (re)installed.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    dao::document_store::to_fields,
    state::{SharedState, now_epoch_ms, round::RoundState},
};

/// Arm (or re-arm) the deadline timer for a round ending at `answer_ends_at`.
pub fn arm(state: &SharedState, round_id: &str, answer_ends_at: i64) {
    let state_for_task = state.clone();
    let task_round_id = round_id.to_owned();

    let handle = tokio::spawn(async move {
        let wait_ms = (answer_ends_at - now_epoch_ms()).max(0) as u64;
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        close_answering_window(&state_for_task, &task_round_id).await;
        state_for_task.deadlines().remove(&task_round_id);
    });

    if let Some(previous) = state.deadlines().insert(round_id.to_owned(), handle) {
        previous.abort();
    }
}

/// Cancel the timer for a round, if one is armed.
pub fn disarm(state: &SharedState, round_id: &str) {
    if let Some((_, handle)) = state.deadlines().remove(round_id) {
        handle.abort();
    }
}

/// Re-arm timers for every round still in the answering state. Rounds whose
/// deadline already passed are closed immediately by their freshly armed task.
pub async fn rearm_pending(state: &SharedState) {
    let repository = match state.repository().await {
        Ok(repository) => repository,
        Err(_) => return,
    };

    let rounds = match repository.answering_rounds().await {
        Ok(rounds) => rounds,
        Err(err) => {
            warn!(error = %err, "failed to enumerate answering rounds for re-arming");
            return;
        }
    };

    for round in rounds {
        let Some(answer_ends_at) = round.answer_ends_at else {
            continue;
        };
        info!(round_id = %round.id, answer_ends_at, "re-arming answering deadline");
        arm(state, &round.id, answer_ends_at);
    }
}

async fn close_answering_window(state: &SharedState, round_id: &str) {
    let repository = match state.repository().await {
        Ok(repository) => repository,
        Err(_) => {
            warn!(round_id, "storage degraded at answering deadline; leaving round untouched");
            return;
        }
    };

    let evaluate_ends_at = now_epoch_ms() + state.config().evaluation_window_ms;
    let fields = to_fields(json!({
        "state": RoundState::Evaluating.as_str(),
        "evaluate_ends_at": evaluate_ends_at,
    }));

    match repository
        .update_round_if_state(round_id, RoundState::Answering, fields)
        .await
    {
        Ok(true) => info!(round_id, "answering window closed by deadline"),
        Ok(false) => debug!(round_id, "round already advanced before its deadline"),
        Err(err) => warn!(round_id, error = %err, "failed to close answering window"),
    }
}
