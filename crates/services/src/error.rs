//! Shared error types for the services crate.

use reqwest::StatusCode;
use thiserror::Error;

use quiz_core::model::{QuestionError, QuestionId, QuizError};
use storage::StorageError;

/// Errors emitted by the quiz service boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz service returned status {0}")]
    HttpStatus(StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Errors emitted by the attempt session machine and service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no attempt is in progress")]
    NotActive,
    #[error("an attempt is already in progress")]
    AlreadyStarted,
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("attempt has already been submitted")]
    AlreadySubmitted,
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),
    #[error("question {question} has no option {option:?}")]
    UnknownOption {
        question: QuestionId,
        option: String,
    },
    #[error(transparent)]
    Service(#[from] QuizServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
