use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown;
use crate::model::{AnswerSheet, AttemptId, QuizId};

/// Key namespace for persisted sessions; the quiz id keeps concurrent
/// attempts on different quizzes from colliding.
const KEY_PREFIX: &str = "quiz-session/v1";

/// Client-persisted record of an in-progress attempt.
///
/// A snapshot exists in durable storage exactly while an attempt has been
/// started and not yet submitted; it is the sole resume mechanism after a
/// reload and is removed as soon as submission succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    attempt_id: AttemptId,
    answers: AnswerSheet,
    deadline: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn new(
        attempt_id: AttemptId,
        answers: AnswerSheet,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            attempt_id,
            answers,
            deadline,
        }
    }

    /// Storage key for the snapshot of the given quiz.
    #[must_use]
    pub fn storage_key(quiz_id: QuizId) -> String {
        format!("{KEY_PREFIX}/{quiz_id}")
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    #[must_use]
    pub fn into_answers(self) -> AnswerSheet {
        self.answers
    }

    /// Copy of this snapshot carrying `answers` but the persisted attempt id
    /// and deadline unchanged. Answer writes go through this so a stale
    /// in-memory deadline can never overwrite the stored one.
    #[must_use]
    pub fn with_answers(&self, answers: AnswerSheet) -> Self {
        Self {
            attempt_id: self.attempt_id,
            answers,
            deadline: self.deadline,
        }
    }

    /// Whole seconds left on the stored deadline; `None` for untimed quizzes.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        self.deadline
            .map(|deadline| countdown::remaining_seconds(deadline, now))
    }

    /// True iff a deadline exists and has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}
