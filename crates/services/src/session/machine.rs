use chrono::{DateTime, Utc};

use quiz_core::countdown;
use quiz_core::model::{AnswerSheet, AttemptId, Question, QuestionId, Quiz, SessionSnapshot};

use crate::error::SessionError;

/// Lifecycle of one attempt.
///
/// `Submitted` is terminal; `Submitting` enforces the single-flight rule
/// for submission requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitting,
    Submitted,
}

/// In-memory state machine for one timed quiz attempt.
///
/// Pure and synchronous: time is passed in, persistence and the quiz
/// service live in [`super::service::AttemptSessionService`]. Quiz and
/// questions are read-only once loaded.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    quiz: Quiz,
    questions: Vec<Question>,
    state: SessionState,
    attempt_id: Option<AttemptId>,
    answers: AnswerSheet,
    deadline: Option<DateTime<Utc>>,
}

impl AttemptSession {
    #[must_use]
    pub fn new(quiz: Quiz, questions: Vec<Question>) -> Self {
        Self {
            quiz,
            questions,
            state: SessionState::NotStarted,
            attempt_id: None,
            answers: AnswerSheet::new(),
            deadline: None,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
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
    pub fn is_in_progress(&self) -> bool {
        self.state == SessionState::InProgress
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.state == SessionState::Submitted
    }

    /// Enter `InProgress` with a freshly created attempt.
    ///
    /// Computes the deadline from the quiz time limit; untimed quizzes get
    /// no deadline and never expire.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is
    /// `NotStarted`.
    pub fn begin(&mut self, attempt_id: AttemptId, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        self.attempt_id = Some(attempt_id);
        self.deadline = self.quiz.time_limit().map(|limit| now + limit);
        self.state = SessionState::InProgress;
        Ok(())
    }

    /// Enter `InProgress` from a persisted snapshot, without a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is
    /// `NotStarted`.
    pub fn resume(&mut self, snapshot: SessionSnapshot) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        self.attempt_id = Some(snapshot.attempt_id());
        self.deadline = snapshot.deadline();
        self.answers = snapshot.into_answers();
        self.state = SessionState::InProgress;
        Ok(())
    }

    /// Record the selected option for a question.
    ///
    /// # Errors
    ///
    /// Returns a state error outside `InProgress`, `UnknownQuestion` for an
    /// id the quiz does not contain, and `UnknownOption` for a choice the
    /// question does not offer.
    pub fn set_answer(
        &mut self,
        question: QuestionId,
        option: impl Into<String>,
    ) -> Result<(), SessionError> {
        match self.state {
            SessionState::InProgress => {}
            SessionState::NotStarted => return Err(SessionError::NotActive),
            SessionState::Submitting => return Err(SessionError::SubmissionInFlight),
            SessionState::Submitted => return Err(SessionError::AlreadySubmitted),
        }

        let Some(target) = self.questions.iter().find(|q| q.id() == question) else {
            return Err(SessionError::UnknownQuestion(question));
        };
        let option = option.into();
        if !target.has_option(&option) {
            return Err(SessionError::UnknownOption { question, option });
        }

        self.answers.set(question, option);
        Ok(())
    }

    /// Current `{attempt_id, answers, deadline}` once an attempt exists.
    #[must_use]
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.attempt_id
            .map(|id| SessionSnapshot::new(id, self.answers.clone(), self.deadline))
    }

    /// Whole seconds left on the deadline; `None` for untimed sessions.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        self.deadline
            .map(|deadline| countdown::remaining_seconds(deadline, now))
    }

    /// True iff a deadline exists and has passed. Untimed sessions never
    /// expire.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// `InProgress -> Submitting`. Enforces single-flight: a second caller
    /// sees `SubmissionInFlight` (or `AlreadySubmitted` after completion)
    /// instead of issuing a duplicate request.
    ///
    /// # Errors
    ///
    /// Returns the state error matching the current state.
    pub fn begin_submit(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::InProgress => {
                self.state = SessionState::Submitting;
                Ok(())
            }
            SessionState::NotStarted => Err(SessionError::NotActive),
            SessionState::Submitting => Err(SessionError::SubmissionInFlight),
            SessionState::Submitted => Err(SessionError::AlreadySubmitted),
        }
    }

    /// `Submitting -> Submitted` after the service confirmed the submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` if no submission is in flight.
    pub fn complete_submit(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::NotActive);
        }
        self.state = SessionState::Submitted;
        Ok(())
    }

    /// `Submitting -> InProgress` after a failed submission; answers and
    /// deadline are untouched so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` if no submission is in flight.
    pub fn fail_submit(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::NotActive);
        }
        self.state = SessionState::InProgress;
        Ok(())
    }
}
