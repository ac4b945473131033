use std::time::Duration;

use coach_core::model::{AssessmentId, UserId};
use coach_core::time::fixed_clock;
use coach_core::{Advance, SessionStatus, TickOutcome};
use services::{AppServices, AssessmentService, AttemptSettings};
use storage::repository::{AssessmentResultRepository, InMemoryRepository};

#[tokio::test(start_paused = true)]
async fn attempt_flow_records_result_and_updates_progress() {
    let app = AppServices::in_memory(fixed_clock()).unwrap();
    let user = UserId::new(3);
    let id = AssessmentId::new("behavioral-interview").unwrap();

    let mut attempt = app.assessments().begin(&id, user).unwrap();
    attempt.start().unwrap();

    // Key is [1, 2, 1]; go back once and change the second answer.
    attempt.select_answer(1).unwrap();
    attempt.advance().unwrap();
    attempt.select_answer(0).unwrap();
    attempt.advance().unwrap();
    assert_eq!(attempt.retreat(), Ok(1));
    assert_eq!(attempt.session().pending_selection(), Some(0));
    attempt.select_answer(2).unwrap();
    attempt.advance().unwrap();
    attempt.select_answer(0).unwrap();
    assert_eq!(attempt.advance(), Ok(Advance::Completed));

    let result = attempt.session().result().unwrap().clone();
    assert_eq!(result.correct_count(), 2);
    assert_eq!(result.percentage(), 67);

    attempt.wait_for_recording().await.unwrap().unwrap();

    let recent = app.progress().recent_results(user, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].percentage, 67);

    let overview = app
        .progress()
        .overview(user, &app.catalog())
        .await
        .unwrap();
    assert_eq!(overview.attempts, 1);
    assert_eq!(overview.completion_percentage, 25);
}

#[tokio::test(start_paused = true)]
async fn expired_attempt_scores_recorded_answers_only() {
    let repo = std::sync::Arc::new(InMemoryRepository::new());
    let catalog = std::sync::Arc::new(coach_core::Catalog::builtin().unwrap());
    let service = AssessmentService::new(fixed_clock(), catalog, repo.clone())
        .with_settings(AttemptSettings::default().with_tick_period(Duration::from_millis(10)));
    let id = AssessmentId::new("resume-fundamentals").unwrap();

    let mut attempt = service.begin(&id, UserId::new(1)).unwrap();
    attempt.start().unwrap();
    attempt.select_answer(1).unwrap();
    attempt.advance().unwrap();

    let start = tokio::time::Instant::now();
    let mut ticks = 0_u32;
    let mut last = None;
    while let Some(outcome) = attempt.pump_tick().await {
        ticks += 1;
        last = Some(outcome);
    }

    assert_eq!(last, Some(TickOutcome::Expired));
    assert_eq!(ticks, 180);
    assert!(start.elapsed() >= Duration::from_millis(1_800));
    assert_eq!(attempt.session().status(), SessionStatus::Completed);

    let result = attempt.session().result().unwrap();
    assert_eq!(result.correct_count(), 1);
    assert_eq!(result.unanswered_count(), 1);
    assert_eq!(result.percentage(), 50);

    attempt.wait_for_recording().await.unwrap().unwrap();
    let rows = repo.list_results(UserId::new(1), Some(&id), 10).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_a_controller_mid_attempt_records_nothing() {
    let repo = std::sync::Arc::new(InMemoryRepository::new());
    let catalog = std::sync::Arc::new(coach_core::Catalog::builtin().unwrap());
    let service = AssessmentService::new(fixed_clock(), catalog, repo.clone());
    let id = AssessmentId::new("product-sense").unwrap();

    let mut attempt = service.begin(&id, UserId::new(1)).unwrap();
    attempt.start().unwrap();
    attempt.pump_tick().await;
    drop(attempt);

    tokio::time::sleep(Duration::from_secs(600)).await;
    let rows = repo.list_results(UserId::new(1), None, 10).await.unwrap();
    assert!(rows.is_empty());
}
