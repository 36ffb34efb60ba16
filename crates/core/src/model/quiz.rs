use chrono::Duration;
use thiserror::Error;

use crate::model::QuizId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("time limit must be greater than zero minutes")]
    InvalidTimeLimit,

    #[error("max attempts must be at least 1")]
    InvalidMaxAttempts,
}

/// Quiz metadata as the attempt controller sees it: read-only.
///
/// An absent time limit means the quiz is untimed and no countdown ever runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    time_limit_minutes: Option<u32>,
    max_attempts: u32,
}

impl Quiz {
    /// Validates and builds quiz metadata.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the title is empty, a present time limit is
    /// zero, or `max_attempts` is zero.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        time_limit_minutes: Option<u32>,
        max_attempts: u32,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if time_limit_minutes == Some(0) {
            return Err(QuizError::InvalidTimeLimit);
        }
        if max_attempts == 0 {
            return Err(QuizError::InvalidMaxAttempts);
        }

        Ok(Self {
            id,
            title,
            time_limit_minutes,
            max_attempts,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.time_limit_minutes.is_some()
    }

    /// Time budget as a duration, if the quiz is timed.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_minutes
            .map(|minutes| Duration::seconds(i64::from(minutes) * 60))
    }
}
