use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use quiz_core::model::{AnswerSheet, AttemptId, Question, QuestionId, Quiz, QuizId};

use crate::error::QuizServiceError;

/// Remote quiz service boundary.
///
/// The controller needs exactly four calls; everything else about the REST
/// API stays on the other side of this trait.
#[async_trait]
pub trait QuizService: Send + Sync {
    /// Fetch quiz metadata by id.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the request fails or the payload is
    /// not a valid quiz.
    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, QuizServiceError>;

    /// Fetch the ordered question list for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the request fails or a question is
    /// malformed.
    async fn fetch_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, QuizServiceError>;

    /// Create a new attempt for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the service refuses or the request fails.
    async fn start_attempt(&self, quiz_id: QuizId) -> Result<AttemptId, QuizServiceError>;

    /// Submit the final answers for an attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the service refuses or the request fails.
    async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        answers: &AnswerSheet,
    ) -> Result<(), QuizServiceError>;
}

#[derive(Clone, Debug)]
pub struct QuizApiConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
}

impl QuizApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("QUIZ_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api".into());
        let bearer_token = env::var("QUIZ_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Self {
            base_url,
            bearer_token,
        }
    }
}

/// HTTP implementation of [`QuizService`].
#[derive(Clone)]
pub struct HttpQuizService {
    client: Client,
    config: QuizApiConfig,
}

impl HttpQuizService {
    #[must_use]
    pub fn new(config: QuizApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(QuizApiConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl QuizService for HttpQuizService {
    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, QuizServiceError> {
        let request = self.client.get(self.url(&format!("quizzes/{quiz_id}")));
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(QuizServiceError::HttpStatus(response.status()));
        }

        let body: QuizDto = response.json().await?;
        body.into_quiz()
    }

    async fn fetch_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, QuizServiceError> {
        let request = self
            .client
            .get(self.url(&format!("quizzes/{quiz_id}/questions")));
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(QuizServiceError::HttpStatus(response.status()));
        }

        let body: Vec<QuestionDto> = response.json().await?;
        body.into_iter().map(QuestionDto::into_question).collect()
    }

    async fn start_attempt(&self, quiz_id: QuizId) -> Result<AttemptId, QuizServiceError> {
        let request = self
            .client
            .post(self.url(&format!("quizzes/{quiz_id}/attempts")));
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(QuizServiceError::HttpStatus(response.status()));
        }

        let body: StartAttemptDto = response.json().await?;
        Ok(AttemptId::new(body.attempt_id))
    }

    async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        answers: &AnswerSheet,
    ) -> Result<(), QuizServiceError> {
        let payload = SubmitAttemptDto { answers };
        let request = self
            .client
            .post(self.url(&format!("attempts/{attempt_id}/submit")))
            .json(&payload);
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(QuizServiceError::HttpStatus(response.status()));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizDto {
    id: u64,
    title: String,
    time_limit_minutes: Option<u32>,
    max_attempts: u32,
}

impl QuizDto {
    fn into_quiz(self) -> Result<Quiz, QuizServiceError> {
        Quiz::new(
            QuizId::new(self.id),
            self.title,
            self.time_limit_minutes,
            self.max_attempts,
        )
        .map_err(QuizServiceError::from)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDto {
    id: u64,
    prompt: String,
    options: Vec<String>,
}

impl QuestionDto {
    fn into_question(self) -> Result<Question, QuizServiceError> {
        Question::new(QuestionId::new(self.id), self.prompt, self.options)
            .map_err(QuizServiceError::from)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartAttemptDto {
    attempt_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAttemptDto<'a> {
    answers: &'a AnswerSheet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_tolerated() {
        let service = HttpQuizService::new(QuizApiConfig::new("http://host/api/", None));
        assert_eq!(service.url("quizzes/1"), "http://host/api/quizzes/1");
    }

    #[test]
    fn quiz_dto_maps_camel_case_payloads() {
        let raw = r#"{"id":3,"title":"Algebra Basics","timeLimitMinutes":1,"maxAttempts":2}"#;
        let dto: QuizDto = serde_json::from_str(raw).unwrap();
        let quiz = dto.into_quiz().unwrap();
        assert_eq!(quiz.id(), QuizId::new(3));
        assert_eq!(quiz.time_limit_minutes(), Some(1));
    }

    #[test]
    fn question_dto_validates_options() {
        let raw = r#"{"id":1,"prompt":"2+2?","options":["4"]}"#;
        let dto: QuestionDto = serde_json::from_str(raw).unwrap();
        assert!(dto.into_question().is_err());
    }
}
