//! End-to-end round lifecycle tests running the engine against the in-memory
//! document store.

use std::{sync::Arc, time::Duration};

use serde_json::json;

use dice_trivia_back::{
    config::AppConfig,
    dao::{
        document_store::{memory::MemoryDocumentStore, to_fields},
        repository::EntityRepository,
    },
    dto::{admin::FinalizeRollRequest, play::SubmitAnswerRequest},
    error::ServiceError,
    services::{
        answer_service, question_service, ranking_service, round_service, sse_service,
        venue_service,
    },
    state::{AppState, SharedState, now_epoch_ms, round::RoundState},
};

async fn test_state(config: AppConfig) -> SharedState {
    let state = AppState::new(config);
    state
        .install_document_store(Arc::new(MemoryDocumentStore::new()))
        .await;
    state
}

async fn repository(state: &SharedState) -> EntityRepository {
    state.repository().await.expect("store installed")
}

async fn seed_venue_with_question(state: &SharedState) -> (String, String) {
    let venue = venue_service::create_venue(state, "Main Hall".into())
        .await
        .unwrap();
    let question = question_service::create_question(
        state,
        dice_trivia_back::dto::admin::CreateQuestionRequest {
            text: "Capital of France?".into(),
            options: Some(vec!["Paris".into(), "Lyon".into()]),
            answer: Some("Paris".into()),
        },
    )
    .await
    .unwrap();
    (venue.id, question.id)
}

fn submit(team_id: &str, content: &str) -> SubmitAnswerRequest {
    SubmitAnswerRequest {
        team_id: team_id.into(),
        content: content.into(),
        selected_option_index: None,
        reason: None,
        is_auto_submitted: false,
    }
}

fn finalize(dice: u8, question_id: &str, duration_ms: i64) -> FinalizeRollRequest {
    FinalizeRollRequest {
        dice: Some(dice),
        question_id: Some(question_id.into()),
        answer_duration_ms: Some(duration_ms),
    }
}

#[tokio::test]
async fn full_round_flow_awards_and_cools_down() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;

    let winner = venue_service::register_team(&state, &venue_id, "Sharks".into())
        .await
        .unwrap();
    let loser = venue_service::register_team(&state, &venue_id, "Jets".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    assert_eq!(round.state, RoundState::Rolling);

    let before_finalize = now_epoch_ms();
    let round = round_service::finalize_roll(&state, &round.id, finalize(4, &question_id, 60_000))
        .await
        .unwrap();
    assert_eq!(round.state, RoundState::Answering);
    assert_eq!(round.dice, Some(4));
    let ends = round.answer_ends_at.unwrap();
    assert!(ends >= before_finalize + 60_000);

    answer_service::submit_answer(&state, &round.id, submit(&winner.id, "Paris"))
        .await
        .unwrap();
    answer_service::submit_answer(&state, &round.id, submit(&loser.id, "Lyon"))
        .await
        .unwrap();

    round_service::begin_evaluation(&state, &round.id)
        .await
        .unwrap();
    let answer_id = format!("{}_{}", winner.id, round.id);
    round_service::score_answer(&state, &answer_id, 80, Some("correct".into()))
        .await
        .unwrap();

    let before_award = now_epoch_ms();
    round_service::award_and_disqualify(&state, &venue_id, &[loser.id.clone()])
        .await
        .unwrap();

    let repo = repository(&state).await;
    let winner = repo.team(&winner.id).await.unwrap().unwrap();
    assert_eq!(winner.currency, 80);
    assert_eq!(winner.total_score, 80);
    assert_eq!(winner.rounds_participated, 1);
    assert_eq!(winner.last_round_score, Some(80));
    assert!(!winner.is_disqualified);

    // The loser's unscored submission was paid out at zero before elimination.
    let loser = repo.team(&loser.id).await.unwrap().unwrap();
    assert!(loser.is_disqualified);
    assert_eq!(loser.disqualified_in_round, Some(1));
    assert_eq!(loser.rounds_participated, 1);
    assert_eq!(loser.last_round_score, Some(0));

    let venue = repo.venue(&venue_id).await.unwrap().unwrap();
    assert_eq!(venue.current_round_id, None);
    let cooldown = venue.cooldown_until.unwrap();
    assert!(cooldown >= before_award + 30_000);

    let stored_round = repo.round(&round.id).await.unwrap().unwrap();
    assert_eq!(stored_round.state, RoundState::Completed);
    assert!(stored_round.awarded_at.is_some());

    let rankings = ranking_service::team_rankings(&state, &venue_id)
        .await
        .unwrap();
    assert_eq!(rankings[0].team_id, winner.id);
    assert_eq!(rankings[0].rank, 1);
}

#[tokio::test]
async fn currency_clamps_to_the_cap_but_total_score_does_not() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Rich".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(6, &question_id, 60_000))
        .await
        .unwrap();
    answer_service::submit_answer(&state, &round.id, submit(&team.id, "Paris"))
        .await
        .unwrap();
    round_service::score_answer(&state, &format!("{}_{}", team.id, round.id), 5_000, None)
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    let repo = repository(&state).await;
    let team = repo.team(&team.id).await.unwrap().unwrap();
    assert_eq!(team.currency, 1_000);
    assert_eq!(team.total_score, 5_000);
}

#[tokio::test]
async fn resubmission_overwrites_instead_of_duplicating() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Fickle".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(2, &question_id, 60_000))
        .await
        .unwrap();

    answer_service::submit_answer(&state, &round.id, submit(&team.id, "Lyon"))
        .await
        .unwrap();
    answer_service::submit_answer(&state, &round.id, submit(&team.id, "Paris"))
        .await
        .unwrap();

    let answers = answer_service::answers_for_round(&state, &round.id)
        .await
        .unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].content, "Paris");
}

#[tokio::test]
async fn disqualified_team_cannot_submit() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Out".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(1, &question_id, 60_000))
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[team.id.clone()])
        .await
        .unwrap();

    // Eliminated in the round that just closed; the next round rejects them.
    let round = {
        // Clear the cooldown so a new roll is allowed immediately.
        let repo = repository(&state).await;
        repo.update_venue(&venue_id, to_fields(json!({ "cooldown_until": null })))
            .await
            .unwrap();
        round_service::start_roll(&state, &venue_id).await.unwrap()
    };

    let err = answer_service::submit_answer(&state, &round.id, submit(&team.id, "late"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TeamDisqualified));

    let answers = answer_service::answers_for_round(&state, &round.id)
        .await
        .unwrap();
    assert!(answers.is_empty());
}

#[tokio::test]
async fn cooldown_blocks_then_allows_the_next_roll() {
    let config = AppConfig {
        cooldown_ms: 100,
        ..AppConfig::default()
    };
    let state = test_state(config).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(3, &question_id, 60_000))
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    let err = round_service::start_roll(&state, &venue_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::CooldownActive { .. }));

    tokio::time::sleep(Duration::from_millis(150)).await;
    round_service::start_roll(&state, &venue_id).await.unwrap();
}

#[tokio::test]
async fn second_roll_fails_and_abandons_its_round() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, _) = seed_venue_with_question(&state).await;

    let first = round_service::start_roll(&state, &venue_id).await.unwrap();
    let err = round_service::start_roll(&state, &venue_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    let repo = repository(&state).await;
    let venue = repo.venue(&venue_id).await.unwrap().unwrap();
    assert_eq!(venue.current_round_id.as_deref(), Some(first.id.as_str()));

    let rounds = repo.rounds_for_venue(&venue_id).await.unwrap();
    assert_eq!(rounds.len(), 2);
    let live: Vec<_> = rounds
        .iter()
        .filter(|round| round.state != RoundState::Completed)
        .collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, first.id);
}

#[tokio::test]
async fn award_rerun_never_double_pays() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Once".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(5, &question_id, 60_000))
        .await
        .unwrap();
    answer_service::submit_answer(&state, &round.id, submit(&team.id, "Paris"))
        .await
        .unwrap();
    round_service::score_answer(&state, &format!("{}_{}", team.id, round.id), 40, None)
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    // A crash between the team payout and the venue cleanup would leave the
    // round current; re-running the award must then skip the paid team.
    let repo = repository(&state).await;
    repo.update_venue(&venue_id, to_fields(json!({ "current_round_id": round.id })))
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    let team = repo.team(&team.id).await.unwrap().unwrap();
    assert_eq!(team.currency, 40);
    assert_eq!(team.total_score, 40);
    assert_eq!(team.rounds_participated, 1);
}

#[tokio::test]
async fn award_without_a_current_round_is_a_noop() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, _) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Idle".into())
        .await
        .unwrap();

    round_service::award_and_disqualify(&state, &venue_id, &[team.id.clone()])
        .await
        .unwrap();

    let repo = repository(&state).await;
    let team = repo.team(&team.id).await.unwrap().unwrap();
    assert!(!team.is_disqualified);
    let venue = repo.venue(&venue_id).await.unwrap().unwrap();
    assert_eq!(venue.cooldown_until, None);
}

#[tokio::test]
async fn team_without_answer_can_still_be_disqualified() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let silent = venue_service::register_team(&state, &venue_id, "Silent".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(2, &question_id, 60_000))
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[silent.id.clone()])
        .await
        .unwrap();

    let repo = repository(&state).await;
    let silent = repo.team(&silent.id).await.unwrap().unwrap();
    assert!(silent.is_disqualified);
    assert_eq!(silent.rounds_participated, 0);
    assert_eq!(silent.last_round_score, None);
}

#[tokio::test]
async fn ended_game_refuses_new_rolls() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, _) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Last".into())
        .await
        .unwrap();

    round_service::end_game(&state, &venue_id).await.unwrap();

    let err = round_service::start_roll(&state, &venue_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::GameEnded));

    let err = venue_service::register_team(&state, &venue_id, "Too Late".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::GameEnded));

    let repo = repository(&state).await;
    let team = repo.team(&team.id).await.unwrap().unwrap();
    assert!(team.is_disqualified);
}

#[tokio::test]
async fn deadline_closes_the_answering_window() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(4, &question_id, 50))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let repo = repository(&state).await;
    let round = repo.round(&round.id).await.unwrap().unwrap();
    assert_eq!(round.state, RoundState::Evaluating);
    assert!(round.evaluate_ends_at.is_some());
}

#[tokio::test]
async fn deadline_is_a_noop_after_manual_evaluation() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(4, &question_id, 100))
        .await
        .unwrap();

    let manual = round_service::begin_evaluation(&state, &round.id)
        .await
        .unwrap();
    let manual_deadline = manual.evaluate_ends_at.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;

    let repo = repository(&state).await;
    let round = repo.round(&round.id).await.unwrap().unwrap();
    assert_eq!(round.state, RoundState::Evaluating);
    assert_eq!(round.evaluate_ends_at, Some(manual_deadline));
}

#[tokio::test]
async fn unscored_submission_still_awards_zero() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Quiet".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(2, &question_id, 60_000))
        .await
        .unwrap();
    answer_service::submit_answer(&state, &round.id, submit(&team.id, "Paris"))
        .await
        .unwrap();

    // The admin never scores the submission before resolving the round.
    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    let repo = repository(&state).await;
    let team = repo.team(&team.id).await.unwrap().unwrap();
    assert_eq!(team.rounds_participated, 1);
    assert_eq!(team.last_round_score, Some(0));
    assert_eq!(team.currency, 0);
    assert_eq!(team.total_score, 0);
    assert_eq!(team.last_awarded_round_id.as_deref(), Some(round.id.as_str()));
}

#[tokio::test]
async fn award_rerun_skips_eliminated_teams() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Gone".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(5, &question_id, 60_000))
        .await
        .unwrap();
    answer_service::submit_answer(&state, &round.id, submit(&team.id, "Paris"))
        .await
        .unwrap();
    round_service::score_answer(&state, &format!("{}_{}", team.id, round.id), 30, None)
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[team.id.clone()])
        .await
        .unwrap();

    // Worst-case re-run: the round is still current and the idempotency token
    // was lost; elimination alone must keep the team out of the payout.
    let repo = repository(&state).await;
    repo.update_venue(&venue_id, to_fields(json!({ "current_round_id": round.id })))
        .await
        .unwrap();
    repo.update_team(&team.id, to_fields(json!({ "last_awarded_round_id": null })))
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    let team = repo.team(&team.id).await.unwrap().unwrap();
    assert_eq!(team.currency, 30);
    assert_eq!(team.total_score, 30);
    assert_eq!(team.rounds_participated, 1);
}

#[tokio::test]
async fn end_game_records_the_elimination_ordinal() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let early = venue_service::register_team(&state, &venue_id, "Early".into())
        .await
        .unwrap();
    let survivor = venue_service::register_team(&state, &venue_id, "Survivor".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(1, &question_id, 60_000))
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[early.id.clone()])
        .await
        .unwrap();

    let repo = repository(&state).await;
    repo.update_venue(&venue_id, to_fields(json!({ "cooldown_until": null })))
        .await
        .unwrap();
    round_service::start_roll(&state, &venue_id).await.unwrap();

    round_service::end_game(&state, &venue_id).await.unwrap();

    // The survivor goes out in the final (second) round; the team eliminated
    // in round one keeps its earlier ordinal.
    let survivor = repo.team(&survivor.id).await.unwrap().unwrap();
    assert!(survivor.is_disqualified);
    assert_eq!(survivor.disqualified_in_round, Some(2));

    let early = repo.team(&early.id).await.unwrap().unwrap();
    assert_eq!(early.disqualified_in_round, Some(1));
}

#[tokio::test]
async fn completed_rounds_refuse_lifecycle_backtracking() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(6, &question_id, 60_000))
        .await
        .unwrap();

    // A second finalize may not reopen an answering round.
    let err = round_service::finalize_roll(&state, &round.id, finalize(1, &question_id, 60_000))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    round_service::begin_evaluation(&state, &round.id)
        .await
        .unwrap();
    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    let err = round_service::begin_evaluation(&state, &round.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn venue_event_stream_opens_for_known_venues_only() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, _) = seed_venue_with_question(&state).await;

    let opened = sse_service::venue_stream(&state, &venue_id, sse_service::StreamKind::Public)
        .await;
    assert!(opened.is_ok());

    let missing = sse_service::venue_stream(&state, "nowhere", sse_service::StreamKind::Admin)
        .await
        .err();
    assert!(matches!(missing, Some(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn scores_are_overwritable_until_award() {
    let state = test_state(AppConfig::default()).await;
    let (venue_id, question_id) = seed_venue_with_question(&state).await;
    let team = venue_service::register_team(&state, &venue_id, "Revised".into())
        .await
        .unwrap();

    let round = round_service::start_roll(&state, &venue_id).await.unwrap();
    round_service::finalize_roll(&state, &round.id, finalize(3, &question_id, 60_000))
        .await
        .unwrap();
    answer_service::submit_answer(&state, &round.id, submit(&team.id, "Paris"))
        .await
        .unwrap();

    let answer_id = format!("{}_{}", team.id, round.id);
    round_service::score_answer(&state, &answer_id, 10, None)
        .await
        .unwrap();
    let revised = round_service::score_answer(&state, &answer_id, 60, Some("rechecked".into()))
        .await
        .unwrap();
    assert_eq!(revised.score, Some(60));

    round_service::award_and_disqualify(&state, &venue_id, &[])
        .await
        .unwrap();

    let repo = repository(&state).await;
    let team = repo.team(&team.id).await.unwrap().unwrap();
    assert_eq!(team.currency, 60);
}
