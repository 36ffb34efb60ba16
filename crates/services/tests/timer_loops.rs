//! Timer-loop tests for `SessionRunner`, driven by tokio's paused clock so
//! the countdown and autosave intervals fire deterministically.

mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration as StdDuration;

use chrono::Duration;

use quiz_core::model::{AnswerSheet, AttemptId, QuestionId, SessionSnapshot};
use quiz_core::time::{fixed_clock, fixed_now};
use services::{SessionError, SessionRunner, SessionState};

use support::{quiz_id, stack, timed_quiz, untimed_quiz};

#[tokio::test(start_paused = true)]
async fn expiry_submits_exactly_once() {
    let stack = stack(fixed_clock(), timed_quiz(1));

    // Deadline already due at the fixed "now": the first countdown tick
    // must auto-submit, and only once.
    let snapshot = SessionSnapshot::new(
        AttemptId::new(31),
        AnswerSheet::new(),
        Some(fixed_now()),
    );
    stack.snapshots.save(quiz_id(), &snapshot).await.unwrap();

    let session = stack.service.load(quiz_id()).await.unwrap();
    let service = Arc::new(stack.service.clone());
    let mut runner = SessionRunner::spawn(service, session);

    tokio::time::sleep(StdDuration::from_secs(3)).await;

    assert_eq!(runner.state().await, SessionState::Submitted);
    assert_eq!(stack.quizzes.submit_calls.load(Ordering::SeqCst), 1);
    assert!(stack.snapshots.load(quiz_id()).await.unwrap().is_none());

    // A manual submit racing in after expiry is refused, not duplicated.
    let err = runner.submit().await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadySubmitted));
    assert_eq!(stack.quizzes.submit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_publishes_remaining_seconds() {
    let stack = stack(fixed_clock(), timed_quiz(5));
    let snapshot = SessionSnapshot::new(
        AttemptId::new(32),
        AnswerSheet::new(),
        Some(fixed_now() + Duration::seconds(300)),
    );
    stack.snapshots.save(quiz_id(), &snapshot).await.unwrap();

    let session = stack.service.load(quiz_id()).await.unwrap();
    let service = Arc::new(stack.service.clone());
    let runner = SessionRunner::spawn(service, session);
    let remaining = runner.remaining();

    tokio::time::sleep(StdDuration::from_secs(2)).await;

    assert_eq!(*remaining.borrow(), Some(300));
    assert_eq!(runner.state().await, SessionState::InProgress);
}

#[tokio::test(start_paused = true)]
async fn untimed_runner_never_counts_down() {
    let stack = stack(fixed_clock(), untimed_quiz());
    let snapshot = SessionSnapshot::new(AttemptId::new(33), AnswerSheet::new(), None);
    stack.snapshots.save(quiz_id(), &snapshot).await.unwrap();

    let session = stack.service.load(quiz_id()).await.unwrap();
    let service = Arc::new(stack.service.clone());
    let runner = SessionRunner::spawn(service, session);
    let remaining = runner.remaining();

    tokio::time::sleep(StdDuration::from_secs(120)).await;

    assert_eq!(*remaining.borrow(), None);
    assert_eq!(runner.state().await, SessionState::InProgress);
    assert_eq!(stack.quizzes.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn autosave_repersists_answers_while_idle() {
    let stack = stack(fixed_clock(), timed_quiz(30));
    let snapshot = SessionSnapshot::new(
        AttemptId::new(34),
        AnswerSheet::new(),
        Some(fixed_now() + Duration::seconds(1_800)),
    );
    stack.snapshots.save(quiz_id(), &snapshot).await.unwrap();

    let session = stack.service.load(quiz_id()).await.unwrap();
    let service = Arc::new(stack.service.clone());
    let runner = SessionRunner::spawn(service, session);

    runner.answer(QuestionId::new(1), "B").await.unwrap();

    // Drop the persisted copy, then go idle: the 15-second safety net must
    // put it back without any further user input.
    stack.snapshots.clear(quiz_id()).await.unwrap();
    tokio::time::sleep(StdDuration::from_secs(16)).await;

    let stored = stack.snapshots.load(quiz_id()).await.unwrap().unwrap();
    assert_eq!(stored.answers().selected(QuestionId::new(1)), Some("B"));
    assert_eq!(stored.attempt_id(), AttemptId::new(34));
}

#[tokio::test(start_paused = true)]
async fn manual_submit_stops_the_loops() {
    let stack = stack(fixed_clock(), timed_quiz(5));
    let snapshot = SessionSnapshot::new(
        AttemptId::new(35),
        AnswerSheet::new(),
        Some(fixed_now() + Duration::seconds(300)),
    );
    stack.snapshots.save(quiz_id(), &snapshot).await.unwrap();

    let session = stack.service.load(quiz_id()).await.unwrap();
    let service = Arc::new(stack.service.clone());
    let mut runner = SessionRunner::spawn(service, session);

    runner.submit().await.unwrap();
    assert_eq!(runner.state().await, SessionState::Submitted);

    // Long after shutdown nothing fires against the finished attempt.
    tokio::time::sleep(StdDuration::from_secs(60)).await;
    assert_eq!(stack.quizzes.submit_calls.load(Ordering::SeqCst), 1);
    assert!(stack.snapshots.load(quiz_id()).await.unwrap().is_none());
}
