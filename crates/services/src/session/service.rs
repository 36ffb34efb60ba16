use std::sync::Arc;

use tracing::{debug, warn};

use quiz_core::Clock;
use quiz_core::model::{QuestionId, QuizId};
use storage::{SnapshotRepository, StorageError};

use crate::client::QuizService;
use crate::error::SessionError;
use crate::navigation::NavigationHost;

use super::machine::{AttemptSession, SessionState};

/// Route the host navigates to after a successful submission.
#[must_use]
pub fn results_route(quiz_id: QuizId) -> String {
    format!("/quizzes/{quiz_id}/results")
}

/// Orchestrates one attempt: machine + durable snapshots + quiz service +
/// navigation guard.
///
/// All quiz service failures come back as values; nothing in here panics on
/// a bad response. Snapshot writes on the hot paths are best-effort: the
/// in-memory answer sheet stays authoritative when storage misbehaves.
#[derive(Clone)]
pub struct AttemptSessionService {
    clock: Clock,
    quizzes: Arc<dyn QuizService>,
    snapshots: SnapshotRepository,
    navigation: Arc<dyn NavigationHost>,
}

impl AttemptSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizService>,
        snapshots: SnapshotRepository,
        navigation: Arc<dyn NavigationHost>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            snapshots,
            navigation,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Fetch quiz and questions, then resume a stored attempt if one exists.
    ///
    /// Resume runs before any explicit start, so a reload lands back in
    /// `InProgress` with the persisted answers and deadline instead of
    /// creating a second attempt. An unreadable snapshot is logged and
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Service` if quiz or questions cannot be
    /// fetched.
    pub async fn load(&self, quiz_id: QuizId) -> Result<AttemptSession, SessionError> {
        let quiz = self.quizzes.fetch_quiz(quiz_id).await?;
        let questions = self.quizzes.fetch_questions(quiz_id).await?;

        let mut session = AttemptSession::new(quiz, questions);
        self.try_resume(&mut session).await?;
        Ok(session)
    }

    /// Start a new attempt for a `NotStarted` session.
    ///
    /// Re-checks storage first: an existing snapshot wins over starting a
    /// second attempt, which makes start idempotent under double
    /// invocation. The snapshot is written only after the service confirms
    /// the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` if the session left
    /// `NotStarted`, or `SessionError::Service` if the start call fails (in
    /// which case no snapshot is written).
    pub async fn start(&self, session: &mut AttemptSession) -> Result<(), SessionError> {
        if session.state() != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        if self.try_resume(session).await? {
            return Ok(());
        }

        let quiz_id = session.quiz().id();
        let attempt_id = self.quizzes.start_attempt(quiz_id).await?;
        session.begin(attempt_id, self.clock.now())?;
        self.persist_best_effort(session).await;
        self.activate_guard();
        debug!(%quiz_id, %attempt_id, "attempt started");
        Ok(())
    }

    /// Record an answer and persist it immediately, so a reload never loses
    /// more than the latest change.
    ///
    /// # Errors
    ///
    /// Returns the machine's state/validation errors. Storage failures are
    /// logged, not surfaced: the in-memory sheet remains authoritative.
    pub async fn answer(
        &self,
        session: &mut AttemptSession,
        question: QuestionId,
        option: impl Into<String> + Send,
    ) -> Result<(), SessionError> {
        session.set_answer(question, option)?;
        self.persist_best_effort(session).await;
        Ok(())
    }

    /// Explicit user-visible draft save, bypassing the autosave timer.
    ///
    /// Unlike the hot paths this surfaces storage failures, because the
    /// user asked for a confirmed save. Never contacts the quiz service.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `InProgress` and
    /// `SessionError::Storage` if the write fails.
    pub async fn save_draft(&self, session: &AttemptSession) -> Result<(), SessionError> {
        if session.state() != SessionState::InProgress {
            return Err(SessionError::NotActive);
        }
        self.persist_merged(session).await?;
        Ok(())
    }

    /// Periodic idle-safety re-persist of the answer sheet.
    ///
    /// Redundant with per-answer persistence in the normal case, but covers
    /// a missed write when the user goes idle. No-op outside `InProgress`.
    pub async fn autosave_tick(&self, session: &AttemptSession) {
        if session.state() != SessionState::InProgress {
            return;
        }
        self.persist_best_effort(session).await;
    }

    /// Submit the attempt, manually or at expiry.
    ///
    /// Single-flight: a concurrent submit sees `SubmissionInFlight`. On
    /// success the snapshot is cleared, the exit guard unregistered, and
    /// the host navigated to the results route. On failure the session
    /// returns to `InProgress` with snapshot and answers untouched, so the
    /// user can retry.
    ///
    /// # Errors
    ///
    /// Returns the machine's state errors or `SessionError::Service` for a
    /// failed submission.
    pub async fn submit(&self, session: &mut AttemptSession) -> Result<(), SessionError> {
        session.begin_submit()?;
        let quiz_id = session.quiz().id();
        let attempt_id = session.attempt_id().ok_or(SessionError::NotActive)?;

        match self
            .quizzes
            .submit_attempt(attempt_id, session.answers())
            .await
        {
            Ok(()) => {
                session.complete_submit()?;
                if let Err(err) = self.snapshots.clear(quiz_id).await {
                    warn!(%quiz_id, error = %err, "failed to clear session snapshot after submit");
                }
                self.navigation.unregister_exit_guard();
                self.navigation.navigate_to(&results_route(quiz_id));
                debug!(%quiz_id, %attempt_id, "attempt submitted");
                Ok(())
            }
            Err(err) => {
                session.fail_submit()?;
                Err(SessionError::Service(err))
            }
        }
    }

    /// Auto-submit when the deadline has passed; hard expiry, no grace
    /// period.
    ///
    /// No-op for untimed sessions, before the deadline, and once the
    /// session is `Submitting` or `Submitted` — so a racing manual submit
    /// and expiry produce exactly one submission.
    ///
    /// # Errors
    ///
    /// Propagates submit errors; the session is back in `InProgress` and
    /// the user may retry manually.
    pub async fn expire_if_due(&self, session: &mut AttemptSession) -> Result<bool, SessionError> {
        if session.state() != SessionState::InProgress || !session.is_expired(self.clock.now()) {
            return Ok(false);
        }
        debug!(quiz_id = %session.quiz().id(), "time limit reached, auto-submitting");
        self.submit(session).await?;
        Ok(true)
    }

    async fn try_resume(&self, session: &mut AttemptSession) -> Result<bool, SessionError> {
        let quiz_id = session.quiz().id();
        let stored = match self.snapshots.load(quiz_id).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%quiz_id, error = %err, "discarding unreadable session snapshot");
                return Ok(false);
            }
        };
        let Some(snapshot) = stored else {
            return Ok(false);
        };

        session.resume(snapshot)?;
        self.activate_guard();
        debug!(%quiz_id, "resumed attempt from stored snapshot");
        Ok(true)
    }

    fn activate_guard(&self) {
        self.navigation.push_checkpoint();
        self.navigation.register_exit_guard();
    }

    /// Read-merge-write: the stored attempt id and deadline win over the
    /// in-memory copies, so a stale caller can never revert them. Only the
    /// answers are replaced.
    async fn persist_merged(&self, session: &AttemptSession) -> Result<(), StorageError> {
        let Some(current) = session.snapshot() else {
            return Ok(());
        };
        let quiz_id = session.quiz().id();
        let merged = match self.snapshots.load(quiz_id).await {
            Ok(Some(stored)) => stored.with_answers(current.answers().clone()),
            Ok(None) => current,
            Err(err) => {
                warn!(%quiz_id, error = %err, "stored snapshot unreadable during merge, overwriting");
                current
            }
        };
        self.snapshots.save(quiz_id, &merged).await
    }

    async fn persist_best_effort(&self, session: &AttemptSession) {
        if let Err(err) = self.persist_merged(session).await {
            warn!(
                quiz_id = %session.quiz().id(),
                error = %err,
                "session snapshot write failed, keeping in-memory answers"
            );
        }
    }
}
