use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::warn;

use quiz_core::model::{BookId, Quiz, QuizId, QuizListPage};

/// Errors emitted by the quiz catalog client.
///
/// Absence of a quiz is not an error; `fetch_quiz` reports it as `None`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizClientError {
    #[error("quiz catalog request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Read-only source of quiz content, addressed by quiz identifier.
///
/// Implementations must return questions in stable index order matching how
/// sessions will reference them by index thereafter.
#[async_trait]
pub trait QuizProvider: Send + Sync {
    /// Fetch one quiz. `None` when the catalog has no such quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizClientError` when the catalog is unreachable or errors.
    async fn fetch_quiz(&self, quiz_id: &QuizId) -> Result<Option<Quiz>, QuizClientError>;

    /// List quizzes, optionally filtered by source book.
    ///
    /// # Errors
    ///
    /// Returns `QuizClientError` when the catalog is unreachable or errors.
    async fn list_quizzes(
        &self,
        book_id: Option<&BookId>,
        limit: u32,
        offset: u32,
    ) -> Result<QuizListPage, QuizClientError>;

    /// Non-failing reachability probe for health reporting.
    async fn health_check(&self) -> bool;
}

#[derive(Clone, Debug)]
pub struct QuizProviderConfig {
    pub base_url: String,
}

impl QuizProviderConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("QUIZ_GENERATOR_URL")
            .unwrap_or_else(|_| "http://quiz-generator:8002".into());
        Self { base_url }
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation of `QuizProvider` against the quiz generator service.
#[derive(Clone)]
pub struct HttpQuizProvider {
    client: Client,
    config: QuizProviderConfig,
}

impl HttpQuizProvider {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(QuizProviderConfig::from_env())
    }

    #[must_use]
    pub fn new(config: QuizProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl QuizProvider for HttpQuizProvider {
    async fn fetch_quiz(&self, quiz_id: &QuizId) -> Result<Option<Quiz>, QuizClientError> {
        let response = self
            .client
            .get(self.url(&format!("/quizzes/{quiz_id}")))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            warn!(%quiz_id, "quiz not found in catalog");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(QuizClientError::HttpStatus(response.status()));
        }

        let quiz: Quiz = response.json().await?;
        Ok(Some(quiz))
    }

    async fn list_quizzes(
        &self,
        book_id: Option<&BookId>,
        limit: u32,
        offset: u32,
    ) -> Result<QuizListPage, QuizClientError> {
        let mut request = self
            .client
            .get(self.url("/quizzes"))
            .timeout(REQUEST_TIMEOUT)
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())]);
        if let Some(book_id) = book_id {
            request = request.query(&[("book_id", book_id.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(QuizClientError::HttpStatus(response.status()));
        }

        let page: QuizListPage = response.json().await?;
        Ok(page)
    }

    async fn health_check(&self) -> bool {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                warn!(error = %err, "quiz catalog health check failed");
                false
            }
        }
    }
}
